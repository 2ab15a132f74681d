//! Configuration loading and application.
mod apply;
mod loader;
pub mod types;


pub use apply::{apply_config, resolve_endpoints};
pub use loader::{DEFAULT_CONFIG_FILES, load_config};
