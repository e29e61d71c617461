use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::DbErr;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Wire shape for every error the API returns.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    #[serde(rename = "type")]
    pub error_type: String,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
}

/// Business-level error taxonomy. Every service operation returns one of
/// these kinds; the HTTP layer maps kinds to status codes.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Transfer is no longer undoable: {0}")]
    NotUndoable(String),

    #[error("Resource is in use: {0}")]
    InUse(String),

    #[error("No preferred vendor: {0}")]
    NoPreferredVendor(String),

    #[error("Serialization retry budget exhausted: {0}")]
    SerializationRetry(String),

    #[error("External service error: {0}")]
    External(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Stable machine-readable code for clients and logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::InvalidTransition(_) => "invalid_transition",
            Self::InsufficientStock(_) => "insufficient_stock",
            Self::NotUndoable(_) => "not_undoable",
            Self::InUse(_) => "in_use",
            Self::NoPreferredVendor(_) => "no_preferred_vendor",
            Self::SerializationRetry(_) => "serialization_retry",
            Self::External(_) => "external",
            Self::Database(_) => "database",
            Self::Internal(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::InvalidTransition(_)
            | Self::InsufficientStock(_)
            | Self::NotUndoable(_)
            | Self::NoPreferredVendor(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) | Self::InUse(_) | Self::SerializationRetry(_) => {
                StatusCode::CONFLICT
            }
            Self::External(_) => StatusCode::BAD_GATEWAY,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(kind = self.code(), "request failed: {}", self);
        }

        // Internal detail stays out of responses.
        let message = match &self {
            ServiceError::Database(_) | ServiceError::Internal(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse {
            error_type: if status.is_server_error() {
                "processing_error".to_string()
            } else {
                "invalid_request".to_string()
            },
            code: self.code().to_string(),
            message,
            param: None,
        };

        (status, Json(body)).into_response()
    }
}

/// Result alias used across the service layer.
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_keep_their_message() {
        let err = ServiceError::InsufficientStock("pick 5 > on_hand 3".into());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "insufficient_stock");
    }

    #[test]
    fn database_errors_map_to_500() {
        let err = ServiceError::Database(DbErr::Custom("boom".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn conflict_maps_to_409() {
        assert_eq!(
            ServiceError::Conflict("duplicate SKU".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::InUse("location carries stock".into()).status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn exhausted_serialization_retries_are_distinguishable_from_data_conflicts() {
        let err = ServiceError::SerializationRetry("transfer".into());
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "serialization_retry");
        assert_ne!(err.code(), ServiceError::Conflict("dup".into()).code());
    }
}
