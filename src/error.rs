use axum::{
    http::{StatusCode, header},
    response::IntoResponse,
};
use thiserror::Error;
use validator::ValidationErrors;

use crate::dao::{kubernetes::KubernetesError, storage::StorageError};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The key-value store failed or returned inconsistent data.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// The Kubernetes gateway or the game server answered unexpectedly.
    #[error(transparent)]
    Upstream(#[from] KubernetesError),
    /// The requested feature is disabled by configuration.
    #[error("{0} not configured")]
    NotConfigured(&'static str),
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// A collaborator (store or cluster) failed.
    #[error("bad gateway: {0}")]
    BadGateway(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Storage(source) => AppError::Internal(source.to_string()),
            ServiceError::Upstream(source) => AppError::BadGateway(source.to_string()),
            ServiceError::NotConfigured(feature) => {
                AppError::NotFound(format!("{feature} not configured"))
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Diagnostics are meant for an operator reading the raw response.
        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=UTF-8")],
            self.to_string(),
        )
            .into_response()
    }
}
