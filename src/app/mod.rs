mod progress;
mod runner;
mod summary;

pub(crate) use runner::{RunSettings, run_probes};
