use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use tokio::time::sleep;
use tracing::{trace, warn};

use super::events::Progress;
use super::generation::GenerationToken;
use crate::domain::Endpoint;
use crate::probe::{ProbeOutcome, ProbeRequestSpec, Transport, execute};

/// Snapshot handed to the observer after each completed probe.
#[derive(Debug, Clone)]
pub struct RouteUpdate {
    pub outcomes: Vec<ProbeOutcome>,
    pub progress: Progress,
}

/// Receives route updates. Called from worker tasks, so it must not block.
pub trait RouteObserver: Send + Sync {
    fn on_outcome(&self, update: RouteUpdate);
}

impl<F> RouteObserver for F
where
    F: Fn(RouteUpdate) + Send + Sync,
{
    fn on_outcome(&self, update: RouteUpdate) {
        self(update);
    }
}

/// Fixed parameters for probing one endpoint.
#[derive(Debug, Clone)]
pub struct RoutePlan {
    pub endpoint: Arc<Endpoint>,
    pub body: Bytes,
    pub credential: String,
    pub timeout: Duration,
    pub count: usize,
    pub concurrency: usize,
    pub delay: Duration,
}

impl RoutePlan {
    /// Workers to start: `max(1, min(concurrency, count))`.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.concurrency.min(self.count).max(1)
    }

    fn probe_spec(&self) -> ProbeRequestSpec {
        ProbeRequestSpec {
            url: self.endpoint.url.clone(),
            body: self.body.clone(),
            credential: self.credential.clone(),
            timeout: self.timeout,
        }
    }
}

struct RouteState {
    next_index: AtomicUsize,
    history: Mutex<Vec<ProbeOutcome>>,
}

/// Runs `count` probes against one endpoint with bounded concurrency.
#[derive(Debug)]
pub struct RouteRunner<T: ?Sized> {
    transport: Arc<T>,
}

impl<T> RouteRunner<T>
where
    T: Transport + ?Sized + 'static,
{
    #[must_use]
    pub const fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    /// Probes the endpoint until every index is claimed or `token` goes
    /// stale, then returns the history in completion order. A stale run
    /// still finishes the probes already in flight.
    pub async fn run<O>(
        &self,
        plan: Arc<RoutePlan>,
        token: GenerationToken,
        observer: Arc<O>,
    ) -> Vec<ProbeOutcome>
    where
        O: RouteObserver + ?Sized + 'static,
    {
        let state = Arc::new(RouteState {
            next_index: AtomicUsize::new(0),
            history: Mutex::new(Vec::with_capacity(plan.count)),
        });

        let workers = plan.worker_count();
        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            handles.push(tokio::spawn(route_worker(
                Arc::clone(&self.transport),
                Arc::clone(&plan),
                Arc::clone(&state),
                token.clone(),
                Arc::clone(&observer),
            )));
        }

        for handle in handles {
            if let Err(err) = handle.await {
                warn!(endpoint = %plan.endpoint.id, "Probe worker failed: {}", err);
            }
        }

        let mut history = state
            .history
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *history)
    }
}

async fn route_worker<T, O>(
    transport: Arc<T>,
    plan: Arc<RoutePlan>,
    state: Arc<RouteState>,
    token: GenerationToken,
    observer: Arc<O>,
) where
    T: Transport + ?Sized,
    O: RouteObserver + ?Sized,
{
    loop {
        if !token.is_current() {
            break;
        }
        let index = state.next_index.fetch_add(1, Ordering::SeqCst);
        if index >= plan.count {
            break;
        }

        let outcome = execute(&plan.probe_spec(), transport.as_ref()).await;
        trace!(
            endpoint = %plan.endpoint.id,
            index,
            success = outcome.success,
            "Probe completed."
        );

        // Count and snapshot are taken under one lock so they always agree.
        let update = {
            let mut history = state
                .history
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            history.push(outcome);
            RouteUpdate {
                progress: Progress {
                    completed: history.len(),
                    total: plan.count,
                },
                outcomes: history.clone(),
            }
        };
        let progress = update.progress;
        observer.on_outcome(update);

        if !plan.delay.is_zero() && !progress.is_done() {
            sleep(plan.delay).await;
        }
    }
}
