use std::time::Duration;

use bytes::Bytes;
use http::HeaderName;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::json;

use super::transport::TransportRequest;
use crate::domain::{DEFAULT_CONTENT, DEFAULT_MAX_TOKENS};

pub const ANTHROPIC_VERSION: &str = "2023-06-01";
const BEARER_PREFIX: &str = "Bearer ";

/// Everything needed to issue one probe.
#[derive(Debug, Clone)]
pub struct ProbeRequestSpec {
    pub url: String,
    pub body: Bytes,
    /// Full `Authorization` value; empty means the header is omitted.
    pub credential: String,
    pub timeout: Duration,
}

impl ProbeRequestSpec {
    #[must_use]
    pub fn transport_request(&self) -> TransportRequest {
        let mut headers = vec![
            (CONTENT_TYPE, "application/json".to_owned()),
            (
                HeaderName::from_static("anthropic-version"),
                ANTHROPIC_VERSION.to_owned(),
            ),
        ];
        if !self.credential.is_empty() {
            headers.push((AUTHORIZATION, self.credential.clone()));
        }
        TransportRequest {
            url: self.url.clone(),
            headers,
            body: self.body.clone(),
        }
    }
}

/// Serialises the streaming completion request shared by every probe of a
/// run. Zero tokens and blank content fall back to the defaults.
#[must_use]
pub fn build_request_body(model: &str, max_tokens: u32, content: &str) -> Bytes {
    let max_tokens = if max_tokens == 0 {
        DEFAULT_MAX_TOKENS
    } else {
        max_tokens
    };
    let content = if content.trim().is_empty() {
        DEFAULT_CONTENT
    } else {
        content
    };
    let body = json!({
        "model": model,
        "max_tokens": max_tokens,
        "stream": true,
        "messages": [{ "role": "user", "content": content }],
    });
    Bytes::from(body.to_string())
}

/// Picks the endpoint override when it is non-blank, else the global key,
/// and normalises the result with [`ensure_bearer`].
#[must_use]
pub fn resolve_credential(endpoint_override: Option<&str>, global: &str) -> String {
    let chosen = endpoint_override
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| global.trim());
    ensure_bearer(chosen)
}

/// Prefixes `Bearer ` unless the value already carries the scheme.
#[must_use]
pub fn ensure_bearer(value: &str) -> String {
    let token = value.trim();
    if token.is_empty() {
        return String::new();
    }
    let has_scheme = token
        .get(..6)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("bearer"))
        && token
            .get(6..)
            .is_some_and(|rest| rest.starts_with(char::is_whitespace));
    if has_scheme {
        token.to_owned()
    } else {
        format!("{}{}", BEARER_PREFIX, token)
    }
}
