//! Error types for the Firestore provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Firestore provider errors
#[derive(Error, Debug)]
pub enum FirestoreError {
    /// API request returned an error
    #[error("Firestore API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// A typed value could not be decoded
    #[error("Invalid value for field `{field}`: {message}")]
    InvalidValue { field: String, message: String },

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for Firestore operations
pub type Result<T> = std::result::Result<T, FirestoreError>;

impl From<FirestoreError> for BridgeError {
    fn from(error: FirestoreError) -> Self {
        match error {
            FirestoreError::BridgeError(e) => e,
            other => BridgeError::CatalogError(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = FirestoreError::ApiError {
            status_code: 403,
            message: "Missing or insufficient permissions.".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "Firestore API error (status 403): Missing or insufficient permissions."
        );
    }

    #[test]
    fn test_error_conversion() {
        let bridge_error: BridgeError = FirestoreError::ParseError("bad json".to_string()).into();
        assert!(matches!(bridge_error, BridgeError::CatalogError(_)));

        let passthrough: BridgeError =
            FirestoreError::BridgeError(BridgeError::OperationFailed("offline".to_string())).into();
        assert!(matches!(passthrough, BridgeError::OperationFailed(_)));
    }
}
