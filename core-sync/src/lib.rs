//! # Offline Sync Module
//!
//! Populates the offline cache from the remote catalog and keeps track of
//! where the user left off.
//!
//! ## Components
//!
//! - **Sync State Machine** (`status`): orchestrator lifecycle and the persisted `SyncStatus`
//! - **Catalog Parsing** (`catalog`): song and setlist documents into cache records
//! - **Progress** (`progress`): monotonic progress reporting across concurrent downloads
//! - **Report** (`report`): per-track results of a run
//! - **App-State Tracker** (`app_state`): last opened setlist and song
//! - **Sync Orchestrator** (`coordinator`): runs the sync phases

pub mod app_state;
pub mod catalog;
pub mod coordinator;
pub mod error;
pub mod progress;
pub mod report;
pub mod status;

pub use app_state::{AppStateTracker, LastAppState};
pub use coordinator::{SyncConfig, SyncOrchestrator};
pub use error::{Result, SyncError};
pub use progress::ProgressCallback;
pub use report::{SyncOutcome, SyncReport, TrackFailure};
pub use status::{SyncState, SyncStatus};
