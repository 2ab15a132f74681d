//! Core library for the `streamprobe` CLI.
//!
//! Probes streaming chat-completion endpoints and measures time-to-first-byte
//! and total latency per endpoint. The building blocks are the incremental
//! event-stream parser (`stream`), single-probe execution over a pluggable
//! transport (`probe`), the bounded two-level run orchestration with
//! generation-based cancellation (`run`), and summary statistics
//! (`metrics`). The primary user-facing interface is the `streamprobe`
//! command-line application; library APIs may evolve as the CLI grows.
pub mod args;
pub mod config;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod probe;
pub mod run;
pub mod stream;
