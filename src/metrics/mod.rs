//! Per-endpoint statistics and latency histograms.
mod histogram;
mod stats;


pub use histogram::LatencyHistogram;
pub use stats::{RouteStats, first_byte_histogram, summarize};
