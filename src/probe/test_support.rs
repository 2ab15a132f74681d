use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{StreamExt, stream};

use super::transport::{Transport, TransportRequest, TransportResponse};
use crate::error::TransportError;

#[derive(Debug, Clone)]
pub(crate) enum BodyStep {
    Data(Bytes),
    Pause(Duration),
    Fail(&'static str),
}

/// Canned reply for one URL.
#[derive(Debug, Clone)]
pub(crate) struct ScriptedReply {
    pub(crate) latency: Duration,
    pub(crate) status: u16,
    pub(crate) steps: Vec<BodyStep>,
    pub(crate) connect_error: Option<&'static str>,
}

impl ScriptedReply {
    pub(crate) fn ok(latency: Duration, chunks: &[&str]) -> Self {
        Self {
            latency,
            status: 200,
            steps: chunks
                .iter()
                .map(|chunk| BodyStep::Data(Bytes::from(chunk.as_bytes().to_vec())))
                .collect(),
            connect_error: None,
        }
    }

    pub(crate) fn status(status: u16, body: &str) -> Self {
        Self {
            latency: Duration::ZERO,
            status,
            steps: vec![BodyStep::Data(Bytes::from(body.as_bytes().to_vec()))],
            connect_error: None,
        }
    }

    pub(crate) fn steps(latency: Duration, steps: Vec<BodyStep>) -> Self {
        Self {
            latency,
            status: 200,
            steps,
            connect_error: None,
        }
    }

    pub(crate) fn refused(message: &'static str) -> Self {
        Self {
            latency: Duration::ZERO,
            status: 0,
            steps: Vec::new(),
            connect_error: Some(message),
        }
    }
}

/// `data:` frame carrying one text delta.
pub(crate) fn text_frame(text: &str) -> String {
    format!(
        "data: {{\"type\":\"content_block_delta\",\"index\":0,\"delta\":{{\"type\":\"text_delta\",\"text\":{}}}}}\n\n",
        serde_json::Value::String(text.to_owned())
    )
}

/// In-memory transport replaying scripted replies and recording traffic.
#[derive(Debug)]
pub(crate) struct ScriptedTransport {
    default_reply: ScriptedReply,
    replies: HashMap<String, ScriptedReply>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    requests: Mutex<Vec<TransportRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new(default_reply: ScriptedReply) -> Self {
        Self {
            default_reply,
            replies: HashMap::new(),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_reply(mut self, url: &str, reply: ScriptedReply) -> Self {
        self.replies.insert(url.to_owned(), reply);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of `send` calls that were waiting at the same time.
    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn requests(&self) -> Vec<TransportRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &TransportRequest) -> Result<TransportResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        let reply = self
            .replies
            .get(&request.url)
            .unwrap_or(&self.default_reply)
            .clone();

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(reply.latency).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(message) = reply.connect_error {
            return Err(TransportError::Request {
                message: message.to_owned(),
            });
        }

        let body = stream::unfold(reply.steps.into_iter(), |mut steps| async move {
            loop {
                let Some(step) = steps.next() else {
                    return None;
                };
                match step {
                    BodyStep::Pause(duration) => tokio::time::sleep(duration).await,
                    BodyStep::Data(bytes) => return Some((Ok(bytes), steps)),
                    BodyStep::Fail(message) => {
                        return Some((
                            Err(TransportError::Body {
                                message: message.to_owned(),
                            }),
                            steps,
                        ));
                    }
                }
            }
        })
        .boxed();

        Ok(TransportResponse {
            status: reply.status,
            body,
        })
    }
}
