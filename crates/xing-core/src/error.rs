//! Common error types for crossing control

use thiserror::Error;

use crate::models::CrossingState;

/// Result type for crossing operations
pub type CrossingResult<T> = Result<T, CrossingError>;

/// Errors that can occur while commanding or advancing a crossing
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CrossingError {
    /// Crossing id outside the registry
    #[error("Invalid crossing ID: {0}")]
    InvalidCrossing(usize),

    /// Requested state is not reachable from the current one
    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition {
        from: CrossingState,
        to: CrossingState,
    },

    /// Command name not recognised
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Malformed or unsupported command parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Unexpected failure inside command processing
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CrossingError {
    /// Short machine-readable tag for this error
    pub fn kind(&self) -> &'static str {
        match self {
            CrossingError::InvalidCrossing(_) => "invalid_crossing",
            CrossingError::InvalidTransition { .. } => "invalid_transition",
            CrossingError::UnknownCommand(_) => "unknown_command",
            CrossingError::InvalidParameter(_) => "invalid_parameter",
            CrossingError::Internal(_) => "internal_error",
        }
    }

    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            CrossingError::InvalidCrossing(_) => 404,
            CrossingError::InvalidTransition { .. } => 409,
            CrossingError::UnknownCommand(_) => 400,
            CrossingError::InvalidParameter(_) => 400,
            CrossingError::Internal(_) => 500,
        }
    }
}
