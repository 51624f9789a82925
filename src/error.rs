//! Unified error handling for the provisioning API.
//!
//! This module provides a centralized error type (`AppError`) that handles
//! all errors throughout the application and maps them to appropriate HTTP responses.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::services::provisioner::{ProvisioningError, ProvisioningFailure};
use crate::store::StoreError;

/// Unified application error type.
///
/// All errors in the application are converted to this type, which implements
/// `actix_web::ResponseError` for automatic HTTP response generation.
#[derive(Debug, Error)]
pub enum AppError {
    /// Store errors outside of a provisioning operation
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Missing or malformed request input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unauthorized access errors
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Lifecycle operation failures, surfaced verbatim
    #[error("{0}")]
    Provisioning(ProvisioningError),

    /// Internal server errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<ProvisioningError> for AppError {
    fn from(err: ProvisioningError) -> Self {
        match err.failure {
            ProvisioningFailure::ServiceNotFound(_) | ProvisioningFailure::OrderNotFound(_) => {
                AppError::NotFound(err.failure.to_string())
            }
            ProvisioningFailure::Store(_) => AppError::Internal(err.to_string()),
            _ => AppError::Provisioning(err),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Provisioning(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error_message = match self {
            // For storage and internal errors, don't expose internal details
            AppError::Store(_) | AppError::Internal(_) => {
                "Internal server error".to_string()
            }
            AppError::Provisioning(e) => e.to_string(),
            AppError::Validation(msg) => msg.clone(),
            AppError::Unauthorized(msg) => msg.clone(),
            AppError::NotFound(msg) => msg.clone(),
        };

        let body = serde_json::json!({
            "error": error_message
        });

        HttpResponse::build(self.status_code()).json(body)
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
