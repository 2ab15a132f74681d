//! One timed probe against one streaming endpoint.
mod executor;
mod outcome;
mod request;
mod transport;

#[cfg(test)]
pub(crate) mod test_support;

pub use executor::execute;
pub use outcome::{ProbeOutcome, StreamStats};
pub use request::{
    ANTHROPIC_VERSION, ProbeRequestSpec, build_request_body, ensure_bearer, resolve_credential,
};
pub use transport::{BodyStream, ReqwestTransport, Transport, TransportRequest, TransportResponse};
