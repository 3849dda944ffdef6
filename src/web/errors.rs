//! # Web API Error Types
//!
//! Maps domain errors onto HTTP statuses and the `{"error": {"code", "message"}}` body
//! shared by both services.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::error::PipelineError;

/// Web API specific errors with HTTP status code mappings
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{message}")]
    NotFound { message: String },

    #[error("Invalid request: {message}")]
    BadRequest { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Service temporarily unavailable: {message}")]
    ServiceUnavailable { message: String },

    #[error("Database operation failed: {operation}")]
    DatabaseError { operation: String },

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::DatabaseError { .. } | ApiError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound { .. } => "NOT_FOUND",
            ApiError::BadRequest { .. } => "VALIDATION_ERROR",
            ApiError::Conflict { .. } => "CONFLICT",
            ApiError::ServiceUnavailable { .. } => "SERVICE_UNAVAILABLE",
            ApiError::DatabaseError { .. } => "DATABASE_ERROR",
            ApiError::Internal => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let message = match &self {
            ApiError::NotFound { message }
            | ApiError::BadRequest { message }
            | ApiError::Conflict { message }
            | ApiError::ServiceUnavailable { message } => message.clone(),
            ApiError::DatabaseError { operation } => operation.clone(),
            ApiError::Internal => "Internal server error".to_string(),
        };

        let error_response = json!({
            "error": {
                "code": self.code(),
                "message": message
            }
        });

        (status_code, Json(error_response)).into_response()
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Validation(message) | PipelineError::InvalidData(message) => {
                ApiError::BadRequest { message }
            }
            err @ PipelineError::NotFound { .. } => ApiError::not_found(err.to_string()),
            PipelineError::Conflict(message) => ApiError::Conflict { message },
            PipelineError::DependencyUnavailable(message) => {
                ApiError::ServiceUnavailable { message }
            }
            PipelineError::Store(detail) => {
                // Details stay in the logs
                error!(error = %detail, "Store operation failed");
                ApiError::DatabaseError {
                    operation: "Store operation failed".to_string(),
                }
            }
            PipelineError::Publish(detail) | PipelineError::Configuration(detail) => {
                error!(error = %detail, "Unexpected pipeline error");
                ApiError::Internal
            }
        }
    }
}

/// Malformed or missing JSON bodies are validation failures
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

/// Result type alias for web API operations
pub type ApiResult<T> = Result<T, ApiError>;
