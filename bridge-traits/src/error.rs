use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Remote catalog error: {0}")]
    CatalogError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Whether the failure came from a uniqueness or key constraint.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, BridgeError::ConstraintViolation(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
