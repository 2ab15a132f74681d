use clap::ArgMatches;
use tracing::info;

use crate::app::{RunSettings, run_probes};
use crate::args::ProbeArgs;
use crate::config::{apply_config, load_config, resolve_endpoints};
use crate::domain::RunConfig;
use crate::error::AppResult;

/// Merges config file values under the command line and resolves endpoints.
pub(super) fn build_plan(mut args: ProbeArgs, matches: &ArgMatches) -> AppResult<RunSettings> {
    let config = load_config(args.config.as_deref())?;
    if let Some(config) = config.as_ref() {
        apply_config(&mut args, matches, config)?;
    }
    let endpoints = resolve_endpoints(&args, config.as_ref())?;

    let run = RunConfig {
        api_key: args.api_key,
        model: args.model,
        max_tokens: args.max_tokens,
        content: args.prompt,
        timeout: args.timeout,
        probes_per_endpoint: args.count.get(),
        delay_between_probes: args.delay,
        max_concurrent_routes: args.max_concurrent_routes.get(),
        max_concurrent_per_route: args.max_concurrent_per_route.get(),
        endpoints,
    };

    Ok(RunSettings {
        run,
        connect_timeout: args.connect_timeout,
        output_format: args.output_format,
        output: args.output,
        no_progress: args.no_progress,
        no_color: args.no_color,
    })
}

pub(super) async fn execute_plan(settings: RunSettings) -> AppResult<()> {
    info!(
        "Probing {} enabled endpoint(s), {} probe(s) each, model {}.",
        settings.run.enabled_endpoints().len(),
        settings.run.probes_per_endpoint,
        settings.run.model
    );
    run_probes(settings).await
}
