//! # Playback Error Types
//!
//! Error types for decoding, cache access and track loading.

use core_library::LibraryError;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Format/Codec Errors
    // ========================================================================
    /// Audio format is not recognized or cannot be parsed.
    #[error("Unsupported or invalid audio format: {0}")]
    InvalidFormat(String),

    /// Codec is not supported by the decoder.
    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(String),

    // ========================================================================
    // Decoding Errors
    // ========================================================================
    /// Error occurred during audio decoding.
    #[error("Decoding error: {0}")]
    DecodingError(String),

    /// Audio stream is corrupted or contains invalid data.
    #[error("Corrupted audio stream: {0}")]
    CorruptedStream(String),

    /// Decoded output has an impossible shape (no channels, ragged planes).
    #[error("Invalid audio buffer: {0}")]
    InvalidBuffer(String),

    // ========================================================================
    // Cache Errors
    // ========================================================================
    /// Offline cache operation failed.
    #[error("Cache error: {0}")]
    CacheError(String),

    /// Library error from core-library.
    #[error("Library error: {0}")]
    Library(#[from] LibraryError),

    // ========================================================================
    // Generic Errors
    // ========================================================================
    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Returns `true` if this error is related to audio format/codec issues.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::InvalidFormat(_) | PlaybackError::UnsupportedCodec(_)
        )
    }

    /// Returns `true` if the bytes could not be turned into PCM.
    pub fn is_decode_error(&self) -> bool {
        self.is_format_error()
            || matches!(
                self,
                PlaybackError::DecodingError(_)
                    | PlaybackError::CorruptedStream(_)
                    | PlaybackError::InvalidBuffer(_)
            )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_classification() {
        assert!(PlaybackError::UnsupportedCodec("ape".into()).is_decode_error());
        assert!(PlaybackError::CorruptedStream("x".into()).is_decode_error());
        assert!(!PlaybackError::CacheError("x".into()).is_decode_error());
        assert!(!PlaybackError::DecodingError("x".into()).is_format_error());
    }
}
