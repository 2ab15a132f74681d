use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::error::ProbeError;

/// Body accounting collected while a stream was read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreamStats {
    pub bytes_received: u64,
    /// Unparsed tail dropped when the stream ended.
    pub discarded_bytes: usize,
}

/// Result of one completed probe attempt. Failures are values, not errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeOutcome {
    pub success: bool,
    #[serde(rename = "total_ms", serialize_with = "as_millis")]
    pub total_time: Duration,
    #[serde(rename = "first_byte_ms", serialize_with = "as_millis")]
    pub first_byte_time: Duration,
    pub text: String,
    pub first_chunk: String,
    pub error: Option<ProbeError>,
    #[serde(flatten)]
    pub stream: StreamStats,
    pub timestamp: DateTime<Utc>,
}

impl ProbeOutcome {
    #[must_use]
    pub fn success(total_time: Duration, first_byte_time: Duration, text: String) -> Self {
        Self {
            success: true,
            total_time,
            first_byte_time,
            text,
            first_chunk: String::new(),
            error: None,
            stream: StreamStats::default(),
            timestamp: Utc::now(),
        }
    }

    /// A failure with zero timings.
    #[must_use]
    pub fn failure(error: ProbeError) -> Self {
        Self {
            success: false,
            total_time: Duration::ZERO,
            first_byte_time: Duration::ZERO,
            text: String::new(),
            first_chunk: String::new(),
            error: Some(error),
            stream: StreamStats::default(),
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub const fn with_timings(mut self, total_time: Duration, first_byte_time: Duration) -> Self {
        self.total_time = total_time;
        self.first_byte_time = first_byte_time;
        self
    }

    #[must_use]
    pub fn with_body(mut self, first_chunk: String, stream: StreamStats) -> Self {
        self.first_chunk = first_chunk;
        self.stream = stream;
        self
    }

    /// Display message for a failed probe.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }
}

fn as_millis<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
}
