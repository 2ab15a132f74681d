//! CLI argument types and parsing helpers.
mod cli;
pub(crate) mod parsers;
mod types;

#[cfg(test)]
mod test_support;

pub use cli::ProbeArgs;
pub use types::{EndpointArg, OutputFormat, PositiveUsize};

pub(crate) use parsers::{parse_duration_text, validate_endpoint_url};
