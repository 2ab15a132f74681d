use std::time::Duration;

use tracing::debug;

use super::histogram::LatencyHistogram;
use crate::probe::ProbeOutcome;

/// Display-ready summary of one endpoint's history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteStats {
    pub total: usize,
    pub successes: usize,
    pub failures: usize,
    /// Success rate in basis points (10000 = 100%).
    pub success_rate_x100: u64,
    pub avg_first_byte: Duration,
    pub min_first_byte: Duration,
    pub max_first_byte: Duration,
    pub avg_total: Duration,
    pub first_byte_p50_ms: u64,
    pub first_byte_p90_ms: u64,
    pub first_byte_p99_ms: u64,
    /// Text of the most recently completed success.
    pub last_message: Option<String>,
    /// Error of the most recently completed failure.
    pub last_error: Option<String>,
}

/// Summarises a history. Timing figures cover successful probes only and
/// are zero when there are none.
#[must_use]
pub fn summarize(history: &[ProbeOutcome]) -> RouteStats {
    let successes: Vec<&ProbeOutcome> = history.iter().filter(|outcome| outcome.success).collect();
    let total = history.len();
    let failures = total.saturating_sub(successes.len());

    let success_rate_x100 = u128::try_from(successes.len())
        .unwrap_or(u128::MAX)
        .saturating_mul(10_000)
        .checked_div(u128::try_from(total).unwrap_or(u128::MAX))
        .map_or(0, |rate| u64::try_from(rate).unwrap_or(u64::MAX));

    let first_bytes: Vec<Duration> = successes
        .iter()
        .map(|outcome| outcome.first_byte_time)
        .collect();
    let totals: Vec<Duration> = successes.iter().map(|outcome| outcome.total_time).collect();
    let (first_byte_p50_ms, first_byte_p90_ms, first_byte_p99_ms) =
        first_byte_percentiles(&first_bytes);

    RouteStats {
        total,
        successes: successes.len(),
        failures,
        success_rate_x100,
        avg_first_byte: average(&first_bytes),
        min_first_byte: first_bytes.iter().min().copied().unwrap_or_default(),
        max_first_byte: first_bytes.iter().max().copied().unwrap_or_default(),
        avg_total: average(&totals),
        first_byte_p50_ms,
        first_byte_p90_ms,
        first_byte_p99_ms,
        last_message: successes.last().map(|outcome| outcome.text.clone()),
        last_error: history
            .iter()
            .rev()
            .find(|outcome| !outcome.success)
            .and_then(ProbeOutcome::error_message),
    }
}

fn average(values: &[Duration]) -> Duration {
    let sum = values
        .iter()
        .fold(0u128, |acc, value| acc.saturating_add(value.as_nanos()));
    sum.checked_div(u128::try_from(values.len()).unwrap_or(u128::MAX))
        .map_or(Duration::ZERO, |nanos| {
            Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
        })
}

fn first_byte_percentiles(values: &[Duration]) -> (u64, u64, u64) {
    let mut histogram = match LatencyHistogram::new() {
        Ok(histogram) => histogram,
        Err(err) => {
            debug!("{}", err);
            return (0, 0, 0);
        }
    };
    for value in values {
        if let Err(err) = histogram.record(*value) {
            debug!("{}", err);
        }
    }
    histogram.percentiles()
}

/// Histogram of successful first-byte times across several routes.
///
/// # Errors
///
/// Returns an error if the histogram cannot be created or merged.
pub fn first_byte_histogram<'history, I>(histories: I) -> Result<LatencyHistogram, String>
where
    I: IntoIterator<Item = &'history [ProbeOutcome]>,
{
    let mut merged = LatencyHistogram::new()?;
    for history in histories {
        let mut route = LatencyHistogram::new()?;
        for outcome in history.iter().filter(|outcome| outcome.success) {
            route.record(outcome.first_byte_time)?;
        }
        merged.merge(&route)?;
    }
    Ok(merged)
}
