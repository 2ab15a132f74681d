use clap::Parser;
use std::time::Duration;

use super::parsers::{
    parse_bool_env, parse_delay_arg, parse_duration_arg, parse_endpoint, parse_positive_usize,
};
use super::types::{EndpointArg, OutputFormat, PositiveUsize};
use crate::domain::{DEFAULT_CONTENT, DEFAULT_MODEL};

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "Measure time-to-first-byte and total latency of streaming completion endpoints under bounded concurrency."
)]
pub struct ProbeArgs {
    /// Path to config file (TOML or JSON)
    #[arg(long, short)]
    pub config: Option<String>,

    /// Global API key or full Authorization value; endpoint auth headers take precedence
    #[arg(
        long = "api-key",
        short = 'k',
        env = "STREAMPROBE_API_KEY",
        hide_env_values = true,
        default_value = ""
    )]
    pub api_key: String,

    /// Model name sent with every probe
    #[arg(long, short = 'm', default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Maximum output tokens requested per probe (0 uses 1024)
    #[arg(long = "max-tokens", default_value = "1024")]
    pub max_tokens: u32,

    /// Prompt content sent as the single user message
    #[arg(long, short = 'p', default_value = DEFAULT_CONTENT)]
    pub prompt: String,

    /// Per-probe timeout covering the request and the whole body (supports ms/s/m/h)
    #[arg(long, short = 't', default_value = "30s", value_parser = parse_duration_arg)]
    pub timeout: Duration,

    /// Probes per endpoint
    #[arg(long, short = 'n', default_value = "10", value_parser = parse_positive_usize)]
    pub count: PositiveUsize,

    /// Pause between consecutive probes of one worker (supports ms/s/m/h, 0 disables)
    #[arg(long, short = 'd', default_value = "200ms", value_parser = parse_delay_arg)]
    pub delay: Duration,

    /// Endpoints probed at the same time
    #[arg(
        long = "max-concurrent-routes",
        short = 'r',
        default_value = "5",
        value_parser = parse_positive_usize
    )]
    pub max_concurrent_routes: PositiveUsize,

    /// Probes in flight per endpoint
    #[arg(
        long = "max-concurrent-per-route",
        short = 'P',
        default_value = "10",
        value_parser = parse_positive_usize
    )]
    pub max_concurrent_per_route: PositiveUsize,

    /// Endpoint to probe as 'URL' or 'NAME=URL' (repeatable; replaces config endpoints)
    #[arg(long = "endpoint", short = 'e', value_parser = parse_endpoint)]
    pub endpoints: Vec<EndpointArg>,

    /// TCP connect timeout (supports ms/s/m/h)
    #[arg(long = "connect-timeout", default_value = "10s", value_parser = parse_duration_arg)]
    pub connect_timeout: Duration,

    /// Output format for the final summary
    #[arg(long = "output-format", value_enum, default_value_t = OutputFormat::Text)]
    pub output_format: OutputFormat,

    /// Write the summary to this file instead of stdout
    #[arg(long = "output", short = 'o')]
    pub output: Option<String>,

    /// Disable the live progress line
    #[arg(long = "no-progress")]
    pub no_progress: bool,

    /// Enable verbose logging (debug level unless STREAMPROBE_LOG or RUST_LOG is set)
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Disable color output
    #[arg(long = "no-color", env = "NO_COLOR", value_parser = parse_bool_env)]
    pub no_color: bool,
}
