//! # Pipeline Error Types
//!
//! Error taxonomy shared by the order ingestion and kitchen services. The web layer maps
//! each variant onto an HTTP status in [`crate::web::errors`].

use crate::messaging::MessagingError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Missing or malformed input, correctable by the caller
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// Illegal state transition
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Guarded dependency could not be reached; normally absorbed into a fallback
    #[error("Dependency unavailable: {0}")]
    DependencyUnavailable(String),

    /// Local transactional failure; the transaction was rolled back
    #[error("Store error: {0}")]
    Store(String),

    /// Input the store rejects on its own terms (value too long, invalid text); never retried
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Event bus failure after the local commit succeeded
    #[error("Publish error: {0}")]
    Publish(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl PipelineError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    /// True for errors the caller caused (4xx family)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::InvalidData(_) | Self::NotFound { .. } | Self::Conflict(_)
        )
    }
}

/// SQLSTATE codes that fail the same way on every retry: class 22 (data exception),
/// NOT NULL and CHECK violations
pub fn is_data_exception(sqlstate: &str) -> bool {
    sqlstate.starts_with("22") || matches!(sqlstate, "23502" | "23514")
}

impl From<sqlx::Error> for PipelineError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.code().as_deref().is_some_and(is_data_exception) {
                return PipelineError::InvalidData(db_err.message().to_string());
            }
        }
        PipelineError::Store(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Store(format!("failed to serialize event: {err}"))
    }
}

impl From<MessagingError> for PipelineError {
    fn from(err: MessagingError) -> Self {
        PipelineError::Publish(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PipelineError::not_found("Order", 999);
        assert_eq!(err.to_string(), "Order 999 not found");

        let err = PipelineError::conflict("PLACED -> DELIVERED is not allowed");
        assert!(err.to_string().starts_with("Conflict:"));
    }

    #[test]
    fn test_data_exception_sqlstates() {
        // string_data_right_truncation, untranslatable_character, not_null, check
        for code in ["22001", "22P05", "23502", "23514"] {
            assert!(is_data_exception(code), "{code}");
        }
        // serialization_failure, unique_violation, connection_failure
        for code in ["40001", "23505", "08006"] {
            assert!(!is_data_exception(code), "{code}");
        }
    }

    #[test]
    fn test_non_database_sqlx_errors_stay_store_errors() {
        let err = PipelineError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, PipelineError::Store(_)));
    }

    #[test]
    fn test_client_error_classification() {
        assert!(PipelineError::validation("missing userId").is_client_error());
        assert!(PipelineError::not_found("Order", 1).is_client_error());
        assert!(PipelineError::InvalidData("value too long".into()).is_client_error());
        assert!(!PipelineError::store("connection reset").is_client_error());
        assert!(!PipelineError::Publish("broker down".into()).is_client_error());
    }

    #[test]
    fn test_sqlx_conversion_is_store_error() {
        let err: PipelineError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, PipelineError::Store(_)));
    }
}
