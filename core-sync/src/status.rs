//! # Sync State Machine
//!
//! Tracks where the orchestrator is in its lifecycle and the persisted
//! summary of the last completed run.
//!
//! ## State Machine
//!
//! ```text
//! Uninitialized → Initializing → SyncPending ─┐
//!                      │              ↑       ↓
//!                      └─────→ SyncComplete ← Syncing
//!                                     │         │
//!                                     └─────────┘ (force resync)
//! ```
//!
//! A failed `Syncing` run falls back to `SyncPending`. A forced resync wipes
//! the cache, which moves `SyncComplete` back to `SyncPending` first.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Result, SyncError};

// ============================================================================
// Sync State
// ============================================================================

/// Lifecycle state of the sync orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// `init` has not been called yet
    Uninitialized,
    /// Reading the persisted sync status
    Initializing,
    /// The cache has never been fully populated
    SyncPending,
    /// The last run finished
    SyncComplete,
    /// A run is in flight
    Syncing,
}

impl SyncState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::Uninitialized => "uninitialized",
            SyncState::Initializing => "initializing",
            SyncState::SyncPending => "sync_pending",
            SyncState::SyncComplete => "sync_complete",
            SyncState::Syncing => "syncing",
        }
    }

    /// Whether moving from `self` to `next` is allowed
    pub fn can_transition_to(&self, next: SyncState) -> bool {
        use SyncState::*;
        matches!(
            (self, next),
            (Uninitialized, Initializing)
                | (Initializing, SyncPending)
                | (Initializing, SyncComplete)
                | (SyncPending, Syncing)
                | (SyncPending, Initializing)
                | (SyncComplete, Syncing)
                | (SyncComplete, SyncPending)
                | (SyncComplete, Initializing)
                | (Syncing, SyncComplete)
                | (Syncing, SyncPending)
        )
    }

    /// Move to `next`, rejecting transitions the machine does not allow.
    ///
    /// # Errors
    ///
    /// - [`SyncError::SyncInProgress`] when a run is in flight and another
    ///   run or a re-initialisation is requested
    /// - [`SyncError::InvalidStateTransition`] for any other illegal move
    pub fn transition(&mut self, next: SyncState) -> Result<()> {
        if *self == SyncState::Syncing
            && matches!(next, SyncState::Syncing | SyncState::Initializing)
        {
            return Err(SyncError::SyncInProgress);
        }

        if !self.can_transition_to(next) {
            return Err(SyncError::InvalidStateTransition {
                from: self.to_string(),
                to: next.to_string(),
                reason: match self {
                    SyncState::Uninitialized => "orchestrator is not initialized".to_string(),
                    _ => "transition not allowed".to_string(),
                },
            });
        }

        *self = next;
        Ok(())
    }

    pub fn is_syncing(&self) -> bool {
        *self == SyncState::Syncing
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SyncState {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "uninitialized" => Ok(SyncState::Uninitialized),
            "initializing" => Ok(SyncState::Initializing),
            "sync_pending" => Ok(SyncState::SyncPending),
            "sync_complete" => Ok(SyncState::SyncComplete),
            "syncing" => Ok(SyncState::Syncing),
            other => Err(SyncError::InvalidStateTransition {
                from: other.to_string(),
                to: other.to_string(),
                reason: "unknown state".to_string(),
            }),
        }
    }
}

// ============================================================================
// Persisted Status
// ============================================================================

/// Summary of the last sync, stored under the `syncStatus` app-state key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub is_initial_sync_complete: bool,
    #[serde(default)]
    pub last_sync_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_songs: u64,
    #[serde(default)]
    pub total_audio_files: u64,
    #[serde(default)]
    pub total_setlists: u64,
    #[serde(default)]
    pub sync_progress: u8,
}

impl SyncStatus {
    /// State the orchestrator should settle in after loading this status
    pub fn resting_state(&self) -> SyncState {
        if self.is_initial_sync_complete {
            SyncState::SyncComplete
        } else {
            SyncState::SyncPending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let mut state = SyncState::Uninitialized;
        state.transition(SyncState::Initializing).unwrap();
        state.transition(SyncState::SyncPending).unwrap();
        state.transition(SyncState::Syncing).unwrap();
        state.transition(SyncState::SyncComplete).unwrap();
        state.transition(SyncState::SyncPending).unwrap();
        assert_eq!(state, SyncState::SyncPending);
    }

    #[test]
    fn test_sync_before_init_is_rejected() {
        let mut state = SyncState::Uninitialized;
        let err = state.transition(SyncState::Syncing).unwrap_err();
        assert!(matches!(err, SyncError::InvalidStateTransition { .. }));
        assert_eq!(state, SyncState::Uninitialized);
    }

    #[test]
    fn test_second_run_reports_in_progress() {
        let mut state = SyncState::Syncing;
        assert!(matches!(
            state.transition(SyncState::Syncing),
            Err(SyncError::SyncInProgress)
        ));
        assert!(matches!(
            state.transition(SyncState::Initializing),
            Err(SyncError::SyncInProgress)
        ));
        assert!(state.is_syncing());
    }

    #[test]
    fn test_failed_run_returns_to_pending() {
        let mut state = SyncState::Syncing;
        state.transition(SyncState::SyncPending).unwrap();
        assert_eq!(state, SyncState::SyncPending);
    }

    #[test]
    fn test_pending_cannot_jump_to_complete() {
        assert!(!SyncState::SyncPending.can_transition_to(SyncState::SyncComplete));
    }

    #[test]
    fn test_state_string_roundtrip() {
        for state in [
            SyncState::Uninitialized,
            SyncState::Initializing,
            SyncState::SyncPending,
            SyncState::SyncComplete,
            SyncState::Syncing,
        ] {
            assert_eq!(state.as_str().parse::<SyncState>().unwrap(), state);
        }
        assert!("paused".parse::<SyncState>().is_err());
    }

    #[test]
    fn test_status_defaults_and_wire_names() {
        let status = SyncStatus::default();
        assert_eq!(status.resting_state(), SyncState::SyncPending);

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["isInitialSyncComplete"], false);
        assert_eq!(json["syncProgress"], 0);
        assert!(json["lastSyncDate"].is_null());

        let parsed: SyncStatus =
            serde_json::from_value(serde_json::json!({ "isInitialSyncComplete": true })).unwrap();
        assert_eq!(parsed.resting_state(), SyncState::SyncComplete);
        assert_eq!(parsed.total_songs, 0);
    }
}
