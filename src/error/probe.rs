use serde::Serialize;
use thiserror::Error;

/// Failure of a single probe. Probe failures are recorded as data on the
/// outcome and never abort a run.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbeError {
    #[error("{message}")]
    Transport { message: String },
    #[error("Timeout")]
    Timeout,
    #[error("{detail}")]
    HttpStatus { status: u16, detail: String },
    #[error("No response data")]
    EmptyResponse,
    #[error("No text content")]
    NoText,
}
