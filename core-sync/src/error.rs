use core_library::LibraryError;
use core_playback::PlaybackError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Sync already in progress")]
    SyncInProgress,

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        from: String,
        to: String,
        reason: String,
    },

    /// Listing catalog documents failed; the whole run is abandoned.
    #[error("Failed to fetch {collection} metadata: {message}")]
    MetadataFetch { collection: String, message: String },

    #[error("Failed to download {track_id}: {message}")]
    AssetFetch { track_id: String, message: String },

    #[error("Failed to decode {track_id}: {message}")]
    Decode { track_id: String, message: String },

    #[error("Failed to cache {track_id}: asset was not written")]
    AssetWrite { track_id: String },

    #[error("Invalid {collection} document {id}: {message}")]
    InvalidDocument {
        collection: String,
        id: String,
        message: String,
    },

    #[error("Store error: {0}")]
    Store(#[from] LibraryError),

    #[error("Cache error: {0}")]
    Cache(#[from] PlaybackError),
}

impl SyncError {
    /// Whether retrying the run later may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SyncError::SyncInProgress | SyncError::MetadataFetch { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
