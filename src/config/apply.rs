use std::collections::HashSet;

use clap::ArgMatches;
use clap::parser::ValueSource;

use crate::args::{EndpointArg, PositiveUsize, ProbeArgs, validate_endpoint_url};
use crate::domain::Endpoint;
use crate::error::{AppError, AppResult, ConfigError, ValidationError};

use super::types::{ConfigFile, DurationValue, EndpointConfig};

/// Applies configuration values to CLI arguments that were not given on
/// the command line (or, for env-backed flags, through the environment).
///
/// # Errors
///
/// Returns an error when a config value is out of range or malformed.
pub fn apply_config(
    args: &mut ProbeArgs,
    matches: &ArgMatches,
    config: &ConfigFile,
) -> AppResult<()> {
    if !is_explicit(matches, "api_key")
        && let Some(api_key) = config.api_key.clone()
    {
        args.api_key = api_key;
    }

    if !is_cli(matches, "model")
        && let Some(model) = config.model.clone()
    {
        args.model = model;
    }

    if !is_cli(matches, "max_tokens")
        && let Some(max_tokens) = config.max_tokens
    {
        args.max_tokens = max_tokens;
    }

    if !is_cli(matches, "prompt")
        && let Some(content) = config.content.clone()
    {
        args.prompt = content;
    }

    if !is_cli(matches, "timeout")
        && let Some(timeout) = config.timeout.as_ref()
    {
        args.timeout = to_duration(timeout, "timeout", false)?;
    }

    if !is_cli(matches, "count")
        && let Some(count) = config.count
    {
        args.count = ensure_positive_usize(count, "count")?;
    }

    if !is_cli(matches, "delay")
        && let Some(delay) = config.delay.as_ref()
    {
        args.delay = to_duration(delay, "delay", true)?;
    }

    if !is_cli(matches, "max_concurrent_routes")
        && let Some(routes) = config.max_concurrent_routes
    {
        args.max_concurrent_routes = ensure_positive_usize(routes, "max_concurrent_routes")?;
    }

    if !is_cli(matches, "max_concurrent_per_route")
        && let Some(per_route) = config.max_concurrent_per_route
    {
        args.max_concurrent_per_route =
            ensure_positive_usize(per_route, "max_concurrent_per_route")?;
    }

    if !is_cli(matches, "connect_timeout")
        && let Some(connect_timeout) = config.connect_timeout.as_ref()
    {
        args.connect_timeout = to_duration(connect_timeout, "connect_timeout", false)?;
    }

    if !is_cli(matches, "output")
        && let Some(output) = config.output.clone()
    {
        args.output = Some(output);
    }

    if !is_cli(matches, "output_format")
        && let Some(format) = config.output_format
    {
        args.output_format = format;
    }

    if !is_cli(matches, "no_progress")
        && let Some(no_progress) = config.no_progress
    {
        args.no_progress = no_progress;
    }

    if !is_explicit(matches, "no_color")
        && let Some(no_color) = config.no_color
    {
        args.no_color = no_color;
    }

    Ok(())
}

/// Endpoints for the run: `--endpoint` flags replace the config list.
///
/// # Errors
///
/// Returns an error when a config endpoint has a duplicate id or an
/// invalid URL.
pub fn resolve_endpoints(
    args: &ProbeArgs,
    config: Option<&ConfigFile>,
) -> AppResult<Vec<Endpoint>> {
    if !args.endpoints.is_empty() {
        return Ok(endpoints_from_args(&args.endpoints));
    }
    config
        .and_then(|config| config.endpoints.as_deref())
        .map_or_else(|| Ok(Vec::new()), normalize_endpoints)
}

fn endpoints_from_args(entries: &[EndpointArg]) -> Vec<Endpoint> {
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| Endpoint {
            id: default_id(index),
            name: entry.name.clone().unwrap_or_else(|| default_name(index)),
            url: entry.url.clone(),
            description: None,
            enabled: true,
            auth_header: None,
        })
        .collect()
}

/// Fills in missing ids and names, defaults `enabled` to true and validates
/// the URLs of enabled endpoints.
pub(crate) fn normalize_endpoints(entries: &[EndpointConfig]) -> AppResult<Vec<Endpoint>> {
    let mut seen = HashSet::with_capacity(entries.len());
    let mut endpoints = Vec::with_capacity(entries.len());

    for (index, entry) in entries.iter().enumerate() {
        let invalid = |source| AppError::config(ConfigError::InvalidEndpoint { index, source });
        let id = non_blank(entry.id.as_deref()).unwrap_or_else(|| default_id(index));
        let url = entry.url.as_deref().map(str::trim).unwrap_or_default().to_owned();
        let enabled = entry.enabled.unwrap_or(true);

        if !seen.insert(id.clone()) {
            return Err(invalid(ValidationError::DuplicateEndpointId { id }));
        }
        if enabled {
            if url.is_empty() {
                return Err(invalid(ValidationError::EndpointUrlEmpty { id }));
            }
            validate_endpoint_url(&url).map_err(invalid)?;
        }

        endpoints.push(Endpoint {
            name: non_blank(entry.name.as_deref()).unwrap_or_else(|| default_name(index)),
            id,
            url,
            description: non_blank(entry.description.as_deref()),
            enabled,
            auth_header: non_blank(entry.auth_header.as_deref()),
        });
    }

    Ok(endpoints)
}

fn default_id(index: usize) -> String {
    format!("route-{}", index)
}

fn default_name(index: usize) -> String {
    format!("Route {}", index.saturating_add(1))
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

fn is_cli(matches: &ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(ValueSource::CommandLine)
}

fn is_explicit(matches: &ArgMatches, name: &str) -> bool {
    matches!(
        matches.value_source(name),
        Some(ValueSource::CommandLine | ValueSource::EnvVariable)
    )
}

fn ensure_positive_usize(value: usize, field: &str) -> AppResult<PositiveUsize> {
    PositiveUsize::try_from(value).map_err(|err| {
        AppError::config(ConfigError::FieldMustBePositive {
            field: field.to_owned(),
            source: err,
        })
    })
}

fn to_duration(
    value: &DurationValue,
    field: &'static str,
    allow_zero: bool,
) -> AppResult<std::time::Duration> {
    value
        .to_duration(allow_zero)
        .map_err(|err| AppError::config(ConfigError::InvalidDuration { field, source: err }))
}
