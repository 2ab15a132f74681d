use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::args::OutputFormat;
use crate::error::AppResult;
use crate::metrics::first_byte_histogram;
use crate::probe::ProbeOutcome;
use crate::run::{RouteResult, RunReport};

const PREVIEW_CHARS: usize = 80;

/// Serializable end-of-run report.
#[derive(Debug, Serialize)]
pub(crate) struct RunSummary {
    pub(crate) generation: u64,
    pub(crate) cancelled: bool,
    pub(crate) endpoints: Vec<EndpointSummary>,
    pub(crate) overall: OverallSummary,
}

#[derive(Debug, Serialize)]
pub(crate) struct EndpointSummary {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) url: String,
    pub(crate) probes: usize,
    pub(crate) successes: usize,
    pub(crate) failures: usize,
    pub(crate) success_rate_x100: u64,
    pub(crate) avg_first_byte_ms: u64,
    pub(crate) min_first_byte_ms: u64,
    pub(crate) max_first_byte_ms: u64,
    pub(crate) avg_total_ms: u64,
    pub(crate) first_byte_p50_ms: u64,
    pub(crate) first_byte_p90_ms: u64,
    pub(crate) first_byte_p99_ms: u64,
    pub(crate) discarded_bytes: usize,
    pub(crate) last_message: Option<String>,
    pub(crate) last_error: Option<String>,
    pub(crate) outcomes: Vec<ProbeOutcome>,
}

#[derive(Debug, Default, Serialize)]
pub(crate) struct OverallSummary {
    pub(crate) probes: usize,
    pub(crate) successes: usize,
    pub(crate) success_rate_x100: u64,
    pub(crate) first_byte_p50_ms: u64,
    pub(crate) first_byte_p90_ms: u64,
    pub(crate) first_byte_p99_ms: u64,
}

pub(crate) fn build_run_summary(report: &RunReport) -> RunSummary {
    let endpoints: Vec<EndpointSummary> = report.results.iter().map(endpoint_summary).collect();

    let probes = endpoints
        .iter()
        .fold(0usize, |acc, endpoint| acc.saturating_add(endpoint.probes));
    let successes = endpoints
        .iter()
        .fold(0usize, |acc, endpoint| acc.saturating_add(endpoint.successes));
    let (first_byte_p50_ms, first_byte_p90_ms, first_byte_p99_ms) = match first_byte_histogram(
        report
            .results
            .iter()
            .map(|route| route.outcomes.as_slice()),
    ) {
        Ok(histogram) => histogram.percentiles(),
        Err(err) => {
            debug!("Failed to merge first-byte histograms: {}", err);
            (0, 0, 0)
        }
    };

    RunSummary {
        generation: report.generation,
        cancelled: report.cancelled,
        endpoints,
        overall: OverallSummary {
            probes,
            successes,
            success_rate_x100: rate_x100(successes, probes),
            first_byte_p50_ms,
            first_byte_p90_ms,
            first_byte_p99_ms,
        },
    }
}

fn endpoint_summary(route: &RouteResult) -> EndpointSummary {
    let stats = route.stats();
    let discarded_bytes = route.outcomes.iter().fold(0usize, |acc, outcome| {
        acc.saturating_add(outcome.stream.discarded_bytes)
    });
    EndpointSummary {
        id: route.endpoint.id.clone(),
        name: route.endpoint.name.clone(),
        url: route.endpoint.url.clone(),
        probes: stats.total,
        successes: stats.successes,
        failures: stats.failures,
        success_rate_x100: stats.success_rate_x100,
        avg_first_byte_ms: millis(stats.avg_first_byte),
        min_first_byte_ms: millis(stats.min_first_byte),
        max_first_byte_ms: millis(stats.max_first_byte),
        avg_total_ms: millis(stats.avg_total),
        first_byte_p50_ms: stats.first_byte_p50_ms,
        first_byte_p90_ms: stats.first_byte_p90_ms,
        first_byte_p99_ms: stats.first_byte_p99_ms,
        discarded_bytes,
        last_message: stats.last_message,
        last_error: stats.last_error,
        outcomes: route.outcomes.clone(),
    }
}

fn rate_x100(part: usize, whole: usize) -> u64 {
    u128::try_from(part)
        .unwrap_or(u128::MAX)
        .saturating_mul(10_000)
        .checked_div(u128::try_from(whole).unwrap_or(u128::MAX))
        .map_or(0, |rate| u64::try_from(rate).unwrap_or(u64::MAX))
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        return flat;
    }
    let mut cut: String = flat.chars().take(PREVIEW_CHARS).collect();
    cut.push_str("...");
    cut
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.cancelled {
            writeln!(f, "Run {} (cancelled, partial results)", self.generation)?;
        } else {
            writeln!(f, "Run {}", self.generation)?;
        }
        for endpoint in &self.endpoints {
            writeln!(f)?;
            write!(f, "{}", endpoint)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "Overall: {} probes, {} successful ({}.{:02}%)",
            self.overall.probes,
            self.overall.successes,
            self.overall.success_rate_x100 / 100,
            self.overall.success_rate_x100 % 100
        )?;
        writeln!(
            f,
            "Overall P50/P90/P99 First Byte: {}ms / {}ms / {}ms",
            self.overall.first_byte_p50_ms,
            self.overall.first_byte_p90_ms,
            self.overall.first_byte_p99_ms
        )
    }
}

impl fmt::Display for EndpointSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} [{}] {}", self.name, self.id, self.url)?;
        writeln!(f, "  Probes: {}", self.probes)?;
        writeln!(
            f,
            "  Successful: {} ({}.{:02}%)",
            self.successes,
            self.success_rate_x100 / 100,
            self.success_rate_x100 % 100
        )?;
        writeln!(f, "  Failed: {}", self.failures)?;
        writeln!(
            f,
            "  Avg/Min/Max First Byte: {}ms / {}ms / {}ms",
            self.avg_first_byte_ms, self.min_first_byte_ms, self.max_first_byte_ms
        )?;
        writeln!(
            f,
            "  P50/P90/P99 First Byte: {}ms / {}ms / {}ms",
            self.first_byte_p50_ms, self.first_byte_p90_ms, self.first_byte_p99_ms
        )?;
        writeln!(f, "  Avg Total: {}ms", self.avg_total_ms)?;
        if self.discarded_bytes > 0 {
            writeln!(f, "  Discarded Stream Bytes: {}", self.discarded_bytes)?;
        }
        if let Some(message) = self.last_message.as_deref() {
            writeln!(f, "  Last Message: {}", preview(message))?;
        }
        if let Some(error) = self.last_error.as_deref() {
            writeln!(f, "  Last Error: {}", preview(error))?;
        }
        Ok(())
    }
}

pub(crate) fn render_summary(summary: &RunSummary, format: OutputFormat) -> AppResult<String> {
    match format {
        OutputFormat::Text => Ok(summary.to_string()),
        OutputFormat::Json => {
            let mut rendered = serde_json::to_string_pretty(summary)?;
            rendered.push('\n');
            Ok(rendered)
        }
    }
}

/// Writes to `output` when given, otherwise to stdout.
pub(crate) fn write_summary(rendered: &str, output: Option<&str>) -> AppResult<()> {
    match output {
        Some(path) => {
            std::fs::write(path, rendered)?;
            info!("Summary written to {}", path);
        }
        None => print!("{}", rendered),
    }
    Ok(())
}
