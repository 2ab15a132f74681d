use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt, TryStreamExt};
use http::HeaderName;

use crate::error::{AppResult, TransportError};

const USER_AGENT: &str = concat!("streamprobe/", env!("CARGO_PKG_VERSION"));

pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// A fully built POST request.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub url: String,
    pub headers: Vec<(HeaderName, String)>,
    pub body: Bytes,
}

impl TransportRequest {
    #[must_use]
    pub fn header(&self, name: &HeaderName) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Status line plus a lazily read body.
pub struct TransportResponse {
    pub status: u16,
    pub body: BodyStream,
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl TransportResponse {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.status, 200..=299)
    }

    /// Reads the remaining body into a string, replacing invalid UTF-8.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by the body stream.
    pub async fn text(self) -> Result<String, TransportError> {
        let chunks: Vec<Bytes> = self.body.try_collect().await?;
        let mut raw = Vec::with_capacity(chunks.iter().map(Bytes::len).sum());
        for chunk in &chunks {
            raw.extend_from_slice(chunk);
        }
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }
}

/// Sends probe requests. The production implementation is
/// [`ReqwestTransport`]; tests substitute in-memory transports.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &TransportRequest) -> Result<TransportResponse, TransportError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a client with a connect timeout. The whole-request deadline
    /// is owned by the probe executor.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be constructed.
    pub fn new(connect_timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &TransportRequest) -> Result<TransportResponse, TransportError> {
        let mut builder = self.client.post(&request.url).body(request.body.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name, value.as_str());
        }
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response
            .bytes_stream()
            .map_err(TransportError::from)
            .boxed();
        Ok(TransportResponse { status, body })
    }
}
