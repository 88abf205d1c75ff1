use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    // ========================================================================
    // Store Errors
    // ========================================================================
    #[error("Local store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Write to {collection} failed for key {key}: {message}")]
    WriteError {
        collection: &'static str,
        key: String,
        message: String,
    },

    #[error("Read from {collection} failed: {message}")]
    ReadError {
        collection: &'static str,
        message: String,
    },

    #[error("Invalid record in {collection}: {message}")]
    InvalidRecord {
        collection: &'static str,
        message: String,
    },

    #[error("Migration failed: {0}")]
    Migration(String),

    // ========================================================================
    // Wrapped Errors
    // ========================================================================
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

pub type Result<T> = std::result::Result<T, LibraryError>;
