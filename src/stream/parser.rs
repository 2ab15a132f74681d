//! Parser for `data:`-framed streaming completions.
//!
//! Chunks arrive at arbitrary boundaries, so a frame can be split across
//! reads. Whatever cannot be interpreted yet is returned as an explicit
//! remainder and replayed in front of the next chunk.

use serde_json::Value;
use tracing::debug;

const FRAME_MARKER: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";
const TEXT_DELTA_EVENTS: [&str; 2] = ["content_block_delta", "message_delta"];

/// Parses `buffer`, calling `emit` for every text delta, and returns the
/// unparsed remainder that must be prepended to the next chunk.
///
/// A trailing line without a frame marker is carried as the remainder. A
/// frame whose JSON payload does not parse stops the pass: that line and
/// every line after it are returned unchanged so they can be retried once
/// more bytes arrive.
pub fn consume<F>(buffer: &str, mut emit: F) -> String
where
    F: FnMut(&str),
{
    let lines: Vec<&str> = buffer.split('\n').collect();
    let last_index = lines.len().saturating_sub(1);
    let mut remainder = String::new();

    for (index, raw_line) in lines.iter().enumerate() {
        let line = raw_line.trim();
        let Some(marked) = line.strip_prefix(FRAME_MARKER) else {
            if index == last_index {
                remainder = line.to_owned();
            }
            continue;
        };

        let payload = marked.trim_start();
        if payload == DONE_SENTINEL {
            continue;
        }

        match serde_json::from_str::<Value>(payload) {
            Ok(frame) => {
                if let Some(text) = delta_text(&frame) {
                    emit(text);
                }
            }
            Err(_) => {
                remainder = lines
                    .get(index..)
                    .map(|rest| rest.join("\n"))
                    .unwrap_or_default();
                break;
            }
        }
    }

    remainder
}

fn delta_text(frame: &Value) -> Option<&str> {
    let kind = frame.get("type")?.as_str()?;
    if !TEXT_DELTA_EVENTS.contains(&kind) {
        return None;
    }
    let text = frame.get("delta")?.get("text")?.as_str()?;
    (!text.is_empty()).then_some(text)
}

/// What was left over when the stream ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Bytes of remainder that still did not parse after the final retry.
    pub discarded_bytes: usize,
}

/// Stateful wrapper around [`consume`] that owns the carried remainder.
#[derive(Debug, Default)]
pub struct StreamFrameParser {
    remainder: String,
}

impl StreamFrameParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the next decoded chunk.
    pub fn push<F>(&mut self, chunk: &str, emit: F)
    where
        F: FnMut(&str),
    {
        let mut buffer = std::mem::take(&mut self.remainder);
        buffer.push_str(chunk);
        self.remainder = consume(&buffer, emit);
    }

    #[must_use]
    pub fn remainder(&self) -> &str {
        &self.remainder
    }

    /// Ends the stream: a non-blank remainder gets one last pass, anything
    /// still unparsed after that is dropped.
    pub fn finish<F>(self, emit: F) -> FlushReport
    where
        F: FnMut(&str),
    {
        if self.remainder.trim().is_empty() {
            return FlushReport::default();
        }

        let leftover = consume(&self.remainder, emit);
        let discarded_bytes = leftover.trim().len();
        if discarded_bytes > 0 {
            debug!(discarded_bytes, "Dropping unparsed stream tail.");
        }
        FlushReport { discarded_bytes }
    }
}
