//! Two-level bounded scheduling of probes across endpoints.
mod events;
mod generation;
mod orchestrator;
mod route;


pub use events::{Progress, RouteResult, RunEvent};
pub use generation::{GenerationToken, RunGeneration};
pub use orchestrator::{RunReport, TestOrchestrator};
pub use route::{RouteObserver, RoutePlan, RouteRunner, RouteUpdate};
