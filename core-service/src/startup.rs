//! Results of the startup and resume flows.

use core_playback::LoadOutcome;

/// What the host should do after [`CoreService::initialize`](crate::CoreService::initialize).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupDecision {
    /// The cache has never been fully populated; offer a sync.
    SyncRequired,
    /// The cache is ready and the last session was resumed.
    Resumed(ResumeOutcome),
    /// The offline cache is unusable; work against the network only.
    OnlineOnly,
}

/// How the last session was restored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeOutcome {
    /// The last song was loaded from the offline cache.
    Cached(LoadOutcome),
    /// The last song was not cached and was handed to the network loader.
    Network { song_id: String },
    /// There was no previous session; the default selection was used.
    Default,
    /// Resuming failed. The error has already been logged.
    Failed(String),
}

impl ResumeOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, ResumeOutcome::Failed(_))
    }
}
