//! Unified error hierarchy for LiftRS
//!
//! Provides a structured error type with severity classification and
//! user-facing messages, integrated with the tracing system.

use thiserror::Error;

use crate::database::DatabaseError;

/// Top-level error type for all LiftRS operations
#[derive(Debug, Error)]
pub enum LiftRsError {
    /// Repository operation errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Input validation errors (missing identifier, malformed range)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Authentication/authorization errors
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for LiftRS operations
pub type Result<T> = std::result::Result<T, LiftRsError>;

impl LiftRsError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            LiftRsError::Validation(_) => ErrorSeverity::Warning,
            LiftRsError::Database(DatabaseError::NotFound(_)) => ErrorSeverity::Warning,
            LiftRsError::Database(_) => ErrorSeverity::Error,
            LiftRsError::Auth(_) => ErrorSeverity::Error,
            LiftRsError::Configuration(_) => ErrorSeverity::Error,
            LiftRsError::Io(_) => ErrorSeverity::Error,
            LiftRsError::Internal(_) => ErrorSeverity::Critical,
        }
    }

    /// Get user-friendly error message for CLI presentation
    pub fn user_message(&self) -> String {
        match self {
            LiftRsError::Database(DatabaseError::NotFound(what)) => {
                format!("Not found: {}", what)
            }
            LiftRsError::Database(_) => {
                "Unable to read workout data. Please check your configuration.".to_string()
            }
            LiftRsError::Validation(msg) => format!("Invalid input: {}", msg),
            LiftRsError::Auth(_) => "Not authorized for the requested data.".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical system error requiring immediate attention
    Critical,
    /// Error that prevents operation but system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
        }
    }
}
