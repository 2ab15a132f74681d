use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live run counter shared by the orchestrator and every task it spawns.
#[derive(Debug, Clone, Default)]
pub struct RunGeneration {
    live: Arc<AtomicU64>,
}

impl RunGeneration {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new generation. Every token handed out earlier goes stale.
    #[must_use]
    pub fn advance(&self) -> GenerationToken {
        let id = self.live.fetch_add(1, Ordering::SeqCst).wrapping_add(1);
        GenerationToken {
            id,
            live: Arc::clone(&self.live),
        }
    }

    #[must_use]
    pub fn current(&self) -> u64 {
        self.live.load(Ordering::SeqCst)
    }
}

/// Generation captured by one run.
#[derive(Debug, Clone)]
pub struct GenerationToken {
    id: u64,
    live: Arc<AtomicU64>,
}

impl GenerationToken {
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn is_current(&self) -> bool {
        self.live.load(Ordering::SeqCst) == self.id
    }
}
