use thiserror::Error;

/// Run-level configuration failure, surfaced once before any probe is sent.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RunError {
    #[error("Enable at least one endpoint.")]
    NoEnabledEndpoints,
    #[error("Set a global API key or an auth header on an enabled endpoint.")]
    NoCredential,
}
