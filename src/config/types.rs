use std::time::Duration;

use serde::Deserialize;

use crate::args::{OutputFormat, parse_duration_text};
use crate::error::ValidationError;

/// On-disk configuration. Every field is optional; CLI flags given on the
/// command line win over file values. camelCase aliases accept exported
/// browser-extension settings.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(alias = "apiKey")]
    pub api_key: Option<String>,
    pub model: Option<String>,
    #[serde(alias = "maxTokens")]
    pub max_tokens: Option<u32>,
    #[serde(alias = "prompt")]
    pub content: Option<String>,
    pub timeout: Option<DurationValue>,
    #[serde(alias = "testCount")]
    pub count: Option<usize>,
    #[serde(alias = "delayBetweenTests")]
    pub delay: Option<DurationValue>,
    #[serde(alias = "maxConcurrentRoutes")]
    pub max_concurrent_routes: Option<usize>,
    #[serde(alias = "maxConcurrentPerRoute")]
    pub max_concurrent_per_route: Option<usize>,
    #[serde(alias = "connectTimeout")]
    pub connect_timeout: Option<DurationValue>,
    pub output: Option<String>,
    pub output_format: Option<OutputFormat>,
    pub no_progress: Option<bool>,
    pub no_color: Option<bool>,
    #[serde(alias = "routes")]
    pub endpoints: Option<Vec<EndpointConfig>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EndpointConfig {
    pub id: Option<String>,
    pub name: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub enabled: Option<bool>,
    #[serde(alias = "authHeader")]
    pub auth_header: Option<String>,
}

/// Integer seconds, fractional seconds, or a `ms/s/m/h` string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(u64),
    Fractional(f64),
    Text(String),
}

impl DurationValue {
    pub(crate) fn to_duration(&self, allow_zero: bool) -> Result<Duration, ValidationError> {
        let duration = match self {
            DurationValue::Seconds(secs) => Duration::from_secs(*secs),
            DurationValue::Fractional(secs) => Duration::try_from_secs_f64(*secs).map_err(|_err| {
                ValidationError::InvalidFractionalSeconds {
                    value: secs.to_string(),
                }
            })?,
            DurationValue::Text(text) => return parse_duration_text(text, allow_zero),
        };
        if !allow_zero && duration.is_zero() {
            return Err(ValidationError::DurationZero);
        }
        Ok(duration)
    }
}
