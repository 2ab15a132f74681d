mod app;
mod config;
mod probe;
mod run;
mod transport;
mod validation;

#[cfg(test)]
mod test_support;

pub use app::{AppError, AppResult};
pub use config::ConfigError;
pub use probe::ProbeError;
pub use run::RunError;
pub use transport::TransportError;
pub use validation::ValidationError;
