use std::time::Duration;

use serde::Serialize;

use crate::probe::resolve_credential;

pub const DEFAULT_MODEL: &str = "claude-3-5-haiku-20241022";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;
pub const DEFAULT_CONTENT: &str = "Hello";

/// A streaming completion endpoint under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub enabled: bool,
    /// Credential used instead of the global key when set.
    #[serde(skip)]
    pub auth_header: Option<String>,
}

impl Endpoint {
    #[must_use]
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            url: url.into(),
            description: None,
            enabled: true,
            auth_header: None,
        }
    }

    /// Credential for this endpoint, normalised to an `Authorization` value.
    /// Empty when neither an override nor `global` carries a token.
    #[must_use]
    pub fn credential(&self, global: &str) -> String {
        resolve_credential(self.auth_header.as_deref(), global)
    }
}

/// Read-only snapshot of everything one run needs.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub content: String,
    pub timeout: Duration,
    pub probes_per_endpoint: usize,
    pub delay_between_probes: Duration,
    pub max_concurrent_routes: usize,
    pub max_concurrent_per_route: usize,
    pub endpoints: Vec<Endpoint>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_owned(),
            max_tokens: DEFAULT_MAX_TOKENS,
            content: DEFAULT_CONTENT.to_owned(),
            timeout: Duration::from_secs(30),
            probes_per_endpoint: 10,
            delay_between_probes: Duration::from_millis(200),
            max_concurrent_routes: 5,
            max_concurrent_per_route: 10,
            endpoints: Vec::new(),
        }
    }
}

impl RunConfig {
    #[must_use]
    pub fn enabled_endpoints(&self) -> Vec<&Endpoint> {
        self.endpoints
            .iter()
            .filter(|endpoint| endpoint.enabled)
            .collect()
    }

    /// True when at least one enabled endpoint resolves to a non-empty
    /// credential.
    #[must_use]
    pub fn has_credential(&self) -> bool {
        self.endpoints
            .iter()
            .filter(|endpoint| endpoint.enabled)
            .any(|endpoint| !endpoint.credential(&self.api_key).is_empty())
    }
}
