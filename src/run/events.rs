use std::sync::Arc;

use crate::domain::Endpoint;
use crate::error::RunError;
use crate::metrics::{RouteStats, summarize};
use crate::probe::ProbeOutcome;

/// One endpoint and its outcomes so far, in completion order.
#[derive(Debug, Clone)]
pub struct RouteResult {
    pub endpoint: Arc<Endpoint>,
    pub outcomes: Vec<ProbeOutcome>,
}

impl RouteResult {
    #[must_use]
    pub const fn new(endpoint: Arc<Endpoint>) -> Self {
        Self {
            endpoint,
            outcomes: Vec::new(),
        }
    }

    #[must_use]
    pub fn stats(&self) -> RouteStats {
        summarize(&self.outcomes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    #[must_use]
    pub const fn is_done(self) -> bool {
        self.completed >= self.total
    }
}

/// Everything the presentation layer gets to see of a run. `index` is the
/// endpoint's position among the enabled endpoints.
#[derive(Debug, Clone)]
pub enum RunEvent {
    Started {
        generation: u64,
        endpoints: usize,
        probes_per_endpoint: usize,
    },
    RouteUpdated {
        generation: u64,
        index: usize,
        result: RouteResult,
    },
    Progress {
        generation: u64,
        index: usize,
        progress: Progress,
    },
    RouteFinished {
        generation: u64,
        index: usize,
        result: RouteResult,
    },
    Aborted {
        generation: u64,
        error: RunError,
    },
    Finished {
        generation: u64,
        cancelled: bool,
    },
}

impl RunEvent {
    #[must_use]
    pub const fn generation(&self) -> u64 {
        match self {
            RunEvent::Started { generation, .. }
            | RunEvent::RouteUpdated { generation, .. }
            | RunEvent::Progress { generation, .. }
            | RunEvent::RouteFinished { generation, .. }
            | RunEvent::Aborted { generation, .. }
            | RunEvent::Finished { generation, .. } => *generation,
        }
    }
}
