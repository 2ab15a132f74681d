use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::args::OutputFormat;
use crate::domain::RunConfig;
use crate::error::{AppError, AppResult};
use crate::probe::{ReqwestTransport, Transport};
use crate::run::{RunReport, TestOrchestrator};

use super::progress::ProgressTracker;
use super::summary::{build_run_summary, render_summary, write_summary};

/// Everything a single local run needs beyond the orchestrator's config.
pub(crate) struct RunSettings {
    pub(crate) run: RunConfig,
    pub(crate) connect_timeout: Duration,
    pub(crate) output_format: OutputFormat,
    pub(crate) output: Option<String>,
    pub(crate) no_progress: bool,
    pub(crate) no_color: bool,
}

pub(crate) async fn run_probes(settings: RunSettings) -> AppResult<()> {
    let transport = Arc::new(ReqwestTransport::new(settings.connect_timeout)?);
    let progress_enabled = !settings.no_progress && std::io::stderr().is_terminal();
    if !settings.no_progress && !progress_enabled {
        info!("Progress disabled because stderr is not a TTY.");
    }
    let progress = ProgressTracker::new(progress_enabled, settings.no_color);

    let report = drive(transport, Arc::new(settings.run), progress).await?;
    if report.cancelled {
        warn!("Run cancelled; summarising partial results.");
    }

    let summary = build_run_summary(&report);
    let rendered = render_summary(&summary, settings.output_format)?;
    write_summary(&rendered, settings.output.as_deref())
}

async fn drive<T>(
    transport: Arc<T>,
    config: Arc<RunConfig>,
    mut progress: ProgressTracker,
) -> AppResult<RunReport>
where
    T: Transport + ?Sized + 'static,
{
    let (orchestrator, mut events) = TestOrchestrator::new(transport);
    let mut handle = orchestrator.start_run(config);
    let generation = orchestrator.current_generation();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut listening = true;

    // Events are queued before the run task returns, so polling them first
    // renders every update before the join completes.
    let joined = loop {
        tokio::select! {
            biased;
            Some(event) = events.recv() => {
                if event.generation() == generation {
                    progress.handle(&event);
                }
            }
            joined = &mut handle => break joined,
            signal = &mut ctrl_c, if listening => {
                listening = false;
                match signal {
                    Ok(()) => {
                        warn!("Interrupted; cancelling run {}.", generation);
                        orchestrator.cancel();
                    }
                    Err(err) => warn!("Failed to listen for Ctrl-C: {}", err),
                }
            }
        }
    };

    joined?.map_err(AppError::run)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::domain::Endpoint;
    use crate::error::RunError;
    use crate::probe::test_support::{ScriptedReply, ScriptedTransport, text_frame};

    fn config(endpoints: Vec<Endpoint>) -> Arc<RunConfig> {
        Arc::new(RunConfig {
            api_key: "key".to_owned(),
            probes_per_endpoint: 2,
            delay_between_probes: Duration::ZERO,
            endpoints,
            ..RunConfig::default()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn drive_returns_completed_report() -> AppResult<()> {
        let transport = Arc::new(ScriptedTransport::new(ScriptedReply::ok(
            Duration::from_millis(10),
            &[&text_frame("hi")],
        )));
        let report = drive(
            transport,
            config(vec![Endpoint::new("a", "https://a.test")]),
            ProgressTracker::new(false, true),
        )
        .await?;

        let outcomes = report
            .results
            .first()
            .map(|route| route.outcomes.len())
            .unwrap_or_default();
        if report.cancelled || outcomes != 2 {
            return Err(AppError::validation("Expected a complete report"));
        }
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn drive_surfaces_run_errors() -> AppResult<()> {
        let transport = Arc::new(ScriptedTransport::new(ScriptedReply::ok(
            Duration::from_millis(10),
            &[&text_frame("hi")],
        )));
        let result = drive(transport, config(Vec::new()), ProgressTracker::new(false, true)).await;
        if !matches!(result, Err(AppError::Run(RunError::NoEnabledEndpoints))) {
            return Err(AppError::validation("Expected a run error"));
        }
        Ok(())
    }
}
