use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::events::{RouteResult, RunEvent};
use super::generation::{GenerationToken, RunGeneration};
use super::route::{RouteObserver, RoutePlan, RouteRunner, RouteUpdate};
use crate::domain::{Endpoint, RunConfig};
use crate::error::{AppResult, RunError};
use crate::probe::{Transport, build_request_body};

/// Final state of one run as seen by the task that drove it.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub generation: u64,
    /// Routes that ran, in configured order.
    pub results: Vec<RouteResult>,
    /// True when a newer run or `cancel` superseded this one.
    pub cancelled: bool,
}

#[derive(Debug, Default)]
struct VisibleResults {
    routes: BTreeMap<usize, RouteResult>,
}

/// Publication side shared by every task of every run. All writes go
/// through the visible-results lock, and the generation is checked while
/// holding it, so a stale update can never land after a reset.
#[derive(Debug)]
struct Publisher {
    visible: Mutex<VisibleResults>,
    events: mpsc::UnboundedSender<RunEvent>,
}

impl Publisher {
    fn lock(&self) -> MutexGuard<'_, VisibleResults> {
        self.visible.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reset(&self, generation: &RunGeneration) -> GenerationToken {
        let mut visible = self.lock();
        let token = generation.advance();
        visible.routes.clear();
        token
    }

    fn publish(&self, token: &GenerationToken, event: RunEvent) {
        let mut visible = self.lock();
        if !token.is_current() {
            return;
        }
        match &event {
            RunEvent::RouteUpdated { index, result, .. }
            | RunEvent::RouteFinished { index, result, .. } => {
                visible.routes.insert(*index, result.clone());
            }
            RunEvent::Started { .. }
            | RunEvent::Progress { .. }
            | RunEvent::Aborted { .. }
            | RunEvent::Finished { .. } => {}
        }
        drop(visible);
        self.send(event);
    }

    fn send(&self, event: RunEvent) {
        if self.events.send(event).is_err() {
            debug!("Run event receiver dropped.");
        }
    }
}

/// Owns the run generation and fans a run out over a bounded pool of
/// route runners.
#[derive(Debug)]
pub struct TestOrchestrator<T: ?Sized> {
    transport: Arc<T>,
    generation: RunGeneration,
    publisher: Arc<Publisher>,
}

impl<T> TestOrchestrator<T>
where
    T: Transport + ?Sized + 'static,
{
    #[must_use]
    pub fn new(transport: Arc<T>) -> (Self, mpsc::UnboundedReceiver<RunEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let orchestrator = Self {
            transport,
            generation: RunGeneration::new(),
            publisher: Arc::new(Publisher {
                visible: Mutex::new(VisibleResults::default()),
                events,
            }),
        };
        (orchestrator, receiver)
    }

    /// Starts a run, superseding any run still in progress. The previous
    /// run's results are cleared before this returns.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn start_run(&self, config: Arc<RunConfig>) -> JoinHandle<Result<RunReport, RunError>> {
        let token = self.publisher.reset(&self.generation);
        let transport = Arc::clone(&self.transport);
        let publisher = Arc::clone(&self.publisher);
        tokio::spawn(drive_run(transport, publisher, token, config))
    }

    /// Starts a run and waits for it.
    ///
    /// # Errors
    ///
    /// Returns the configuration failure that aborted the run before any
    /// probe was sent, or the join error if the run task panicked.
    pub async fn run(&self, config: Arc<RunConfig>) -> AppResult<RunReport> {
        let report = self.start_run(config).await??;
        Ok(report)
    }

    /// Stales the active run without starting another. In-flight probes
    /// finish but nothing further is published; visible results are kept.
    pub fn cancel(&self) {
        let superseded = {
            let _visible = self.publisher.lock();
            self.generation.advance().id().saturating_sub(1)
        };
        info!(generation = superseded, "Run cancelled.");
    }

    #[must_use]
    pub fn current_generation(&self) -> u64 {
        self.generation.current()
    }

    /// Snapshot of the visible per-endpoint results, in configured order.
    #[must_use]
    pub fn results(&self) -> Vec<RouteResult> {
        self.publisher.lock().routes.values().cloned().collect()
    }
}

async fn drive_run<T>(
    transport: Arc<T>,
    publisher: Arc<Publisher>,
    token: GenerationToken,
    config: Arc<RunConfig>,
) -> Result<RunReport, RunError>
where
    T: Transport + ?Sized + 'static,
{
    let generation = token.id();
    let endpoints: Vec<Arc<Endpoint>> = config
        .enabled_endpoints()
        .into_iter()
        .map(|endpoint| Arc::new(endpoint.clone()))
        .collect();

    let check = if endpoints.is_empty() {
        Err(RunError::NoEnabledEndpoints)
    } else if !config.has_credential() {
        Err(RunError::NoCredential)
    } else {
        Ok(())
    };
    if let Err(error) = check {
        warn!(generation, "Run aborted: {}", error);
        publisher.publish(&token, RunEvent::Aborted { generation, error });
        return Err(error);
    }

    info!(
        generation,
        endpoints = endpoints.len(),
        probes = config.probes_per_endpoint,
        "Starting run."
    );
    publisher.publish(
        &token,
        RunEvent::Started {
            generation,
            endpoints: endpoints.len(),
            probes_per_endpoint: config.probes_per_endpoint,
        },
    );

    let body = build_request_body(&config.model, config.max_tokens, &config.content);
    let plans: Arc<Vec<Arc<RoutePlan>>> = Arc::new(
        endpoints
            .iter()
            .map(|endpoint| {
                Arc::new(RoutePlan {
                    credential: endpoint.credential(&config.api_key),
                    endpoint: Arc::clone(endpoint),
                    body: body.clone(),
                    timeout: config.timeout,
                    count: config.probes_per_endpoint,
                    concurrency: config.max_concurrent_per_route,
                    delay: config.delay_between_probes,
                })
            })
            .collect(),
    );

    let cursor = Arc::new(AtomicUsize::new(0));
    let finished: Arc<Mutex<Vec<(usize, RouteResult)>>> =
        Arc::new(Mutex::new(Vec::with_capacity(plans.len())));
    let workers = config.max_concurrent_routes.min(plans.len()).max(1);
    let mut handles = Vec::with_capacity(workers);
    for _ in 0..workers {
        handles.push(tokio::spawn(endpoint_worker(
            RouteRunner::new(Arc::clone(&transport)),
            Arc::clone(&plans),
            Arc::clone(&cursor),
            Arc::clone(&finished),
            Arc::clone(&publisher),
            token.clone(),
        )));
    }
    for handle in handles {
        if let Err(err) = handle.await {
            warn!(generation, "Endpoint worker failed: {}", err);
        }
    }

    let cancelled = !token.is_current();
    let mut results = std::mem::take(
        &mut *finished
            .lock()
            .unwrap_or_else(PoisonError::into_inner),
    );
    results.sort_by_key(|(index, _)| *index);

    info!(generation, cancelled, "Run finished.");
    publisher.send(RunEvent::Finished {
        generation,
        cancelled,
    });

    Ok(RunReport {
        generation,
        results: results.into_iter().map(|(_, result)| result).collect(),
        cancelled,
    })
}

async fn endpoint_worker<T>(
    runner: RouteRunner<T>,
    plans: Arc<Vec<Arc<RoutePlan>>>,
    cursor: Arc<AtomicUsize>,
    finished: Arc<Mutex<Vec<(usize, RouteResult)>>>,
    publisher: Arc<Publisher>,
    token: GenerationToken,
) where
    T: Transport + ?Sized + 'static,
{
    loop {
        if !token.is_current() {
            break;
        }
        let index = cursor.fetch_add(1, Ordering::SeqCst);
        let Some(plan) = plans.get(index) else {
            break;
        };

        let observer = Arc::new(PublishingObserver {
            index,
            endpoint: Arc::clone(&plan.endpoint),
            publisher: Arc::clone(&publisher),
            token: token.clone(),
        });
        let outcomes = runner.run(Arc::clone(plan), token.clone(), observer).await;

        let result = RouteResult {
            endpoint: Arc::clone(&plan.endpoint),
            outcomes,
        };
        publisher.publish(
            &token,
            RunEvent::RouteFinished {
                generation: token.id(),
                index,
                result: result.clone(),
            },
        );
        finished
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((index, result));
    }
}

/// Republishes route updates under the run's generation.
struct PublishingObserver {
    index: usize,
    endpoint: Arc<Endpoint>,
    publisher: Arc<Publisher>,
    token: GenerationToken,
}

impl RouteObserver for PublishingObserver {
    fn on_outcome(&self, update: RouteUpdate) {
        let generation = self.token.id();
        self.publisher.publish(
            &self.token,
            RunEvent::RouteUpdated {
                generation,
                index: self.index,
                result: RouteResult {
                    endpoint: Arc::clone(&self.endpoint),
                    outcomes: update.outcomes,
                },
            },
        );
        self.publisher.publish(
            &self.token,
            RunEvent::Progress {
                generation,
                index: self.index,
                progress: update.progress,
            },
        );
    }
}
