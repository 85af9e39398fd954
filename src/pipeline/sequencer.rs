use std::sync::atomic::{AtomicU64, Ordering};

/// Sequence number captured when a load starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LoadToken(u64);

impl LoadToken {
    pub fn sequence(&self) -> u64 {
        self.0
    }
}

/// Hands out increasing load tokens; only the most recent one may commit.
#[derive(Debug, Default)]
pub struct LoadSequencer {
    latest: AtomicU64,
}

impl LoadSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new load, superseding every earlier token.
    pub fn begin(&self) -> LoadToken {
        LoadToken(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_latest(&self, token: LoadToken) -> bool {
        self.latest.load(Ordering::SeqCst) == token.0
    }
}
