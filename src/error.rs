use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::auth::InvalidSubject;
use crate::database::DatabaseError;

/// Anything that stops a handler from reaching a repository result
#[derive(Debug, thiserror::Error)]
pub enum HandlerFault {
    /// Rejected before any procedure ran; answered with `fail`, not `error`
    #[error("invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: &'static str },

    #[error(transparent)]
    InvalidSubject(#[from] InvalidSubject),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl HandlerFault {
    pub fn invalid(field: &'static str, reason: &'static str) -> Self {
        HandlerFault::InvalidInput { field, reason }
    }
}

/// HTTP API errors for the routes outside the defaults envelope
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InternalServerError(String),

    #[error("{0}")]
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "status": "error",
            "message": self.to_string(),
            "code": self.error_code()
        })
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::ConfigMissing(_) | DatabaseError::InvalidDatabaseUrl | DatabaseError::Sqlx(_) => {
                // Log the real error but return generic message
                tracing::error!("Database unavailable: {}", err);
                ApiError::ServiceUnavailable("database unavailable".to_string())
            }
            other => {
                tracing::error!("Database error: {}", other);
                ApiError::InternalServerError("Database error occurred".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}
