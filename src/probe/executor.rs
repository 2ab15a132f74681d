use futures_util::StreamExt;
use serde_json::Value;
use tokio::time::{Instant, timeout};
use tracing::debug;

use super::outcome::{ProbeOutcome, StreamStats};
use super::request::ProbeRequestSpec;
use super::transport::{BodyStream, Transport, TransportRequest};
use crate::error::{ProbeError, TransportError};
use crate::stream::{StreamFrameParser, Utf8ChunkDecoder};

const MAX_ERROR_DETAIL_CHARS: usize = 512;

/// Runs one probe. Never fails: every fault is folded into the outcome.
///
/// The deadline covers the request, the status check and the whole body.
/// When it fires the in-flight request is dropped.
pub async fn execute<T>(spec: &ProbeRequestSpec, transport: &T) -> ProbeOutcome
where
    T: Transport + ?Sized,
{
    let request = spec.transport_request();
    let started = Instant::now();
    let outcome = match timeout(spec.timeout, exchange(&request, transport, started)).await {
        Ok(outcome) => outcome,
        Err(_elapsed) => ProbeOutcome::failure(ProbeError::Timeout),
    };

    if let Some(error) = &outcome.error {
        debug!(url = %spec.url, error = %error, "Probe failed.");
    }
    outcome
}

async fn exchange<T>(request: &TransportRequest, transport: &T, started: Instant) -> ProbeOutcome
where
    T: Transport + ?Sized,
{
    let response = match transport.send(request).await {
        Ok(response) => response,
        Err(err) => return ProbeOutcome::failure(probe_error(&err)),
    };

    if !response.is_success() {
        let status = response.status;
        let body = response.text().await.unwrap_or_default();
        return ProbeOutcome::failure(ProbeError::HttpStatus {
            status,
            detail: error_detail(&body, status),
        });
    }

    read_stream(response.body, started).await
}

async fn read_stream(mut body: BodyStream, started: Instant) -> ProbeOutcome {
    let mut decoder = Utf8ChunkDecoder::new();
    let mut parser = StreamFrameParser::new();
    let mut text = String::new();
    let mut raw = String::new();
    let mut first_chunk: Option<String> = None;
    let mut first_byte_time = None;
    let mut stats = StreamStats::default();

    while let Some(next) = body.next().await {
        let chunk = match next {
            Ok(chunk) => chunk,
            Err(err) => return ProbeOutcome::failure(probe_error(&err)),
        };
        if chunk.is_empty() {
            continue;
        }
        if first_byte_time.is_none() {
            first_byte_time = Some(started.elapsed());
        }
        stats.bytes_received = stats
            .bytes_received
            .saturating_add(u64::try_from(chunk.len()).unwrap_or(u64::MAX));

        let decoded = decoder.decode(&chunk);
        if first_chunk.is_none() {
            first_chunk = Some(decoded.clone());
        }
        raw.push_str(&decoded);
        parser.push(&decoded, |fragment| text.push_str(fragment));
    }

    let Some(first_byte_time) = first_byte_time else {
        return ProbeOutcome::failure(ProbeError::EmptyResponse);
    };

    let tail = decoder.finish();
    if !tail.is_empty() {
        raw.push_str(&tail);
        parser.push(&tail, |fragment| text.push_str(fragment));
    }
    let flush = parser.finish(|fragment| text.push_str(fragment));
    stats.discarded_bytes = flush.discarded_bytes;

    if text.trim().is_empty() {
        text = raw.trim().to_owned();
    }
    let total_time = started.elapsed();
    let first_chunk = first_chunk.unwrap_or_default();

    if text.is_empty() {
        return ProbeOutcome::failure(ProbeError::NoText)
            .with_timings(total_time, first_byte_time)
            .with_body(first_chunk, stats);
    }
    ProbeOutcome::success(total_time, first_byte_time, text).with_body(first_chunk, stats)
}

fn probe_error(err: &TransportError) -> ProbeError {
    match err {
        TransportError::Timeout => ProbeError::Timeout,
        TransportError::Request { .. } | TransportError::Body { .. } => ProbeError::Transport {
            message: err.to_string(),
        },
    }
}

/// Message for a non-2xx reply: `error.message`, else `message`, else the
/// raw body, else `HTTP <status>`.
fn error_detail(body: &str, status: u16) -> String {
    let trimmed = body.trim();
    let structured = serde_json::from_str::<Value>(trimmed).ok().and_then(|value| {
        value
            .get("error")
            .and_then(|error| error.get("message"))
            .and_then(Value::as_str)
            .filter(|message| !message.is_empty())
            .or_else(|| {
                value
                    .get("message")
                    .and_then(Value::as_str)
                    .filter(|message| !message.is_empty())
            })
            .map(str::to_owned)
    });

    structured.unwrap_or_else(|| {
        if trimmed.is_empty() {
            format!("HTTP {}", status)
        } else {
            trimmed.chars().take(MAX_ERROR_DETAIL_CHARS).collect()
        }
    })
}
