use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::response::ApiResponse;

/// Standard error type for TUPark.
#[derive(Debug, Error)]
pub enum TuparkError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// An empty or malformed source identity reached the login guard.
    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    /// The audit store (or another persistence collaborator) failed.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl TuparkError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            TuparkError::NotFound(_) => StatusCode::NOT_FOUND,
            TuparkError::BadRequest(_) => StatusCode::BAD_REQUEST,
            TuparkError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            TuparkError::Conflict(_) => StatusCode::CONFLICT,
            TuparkError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            TuparkError::InvalidIdentity(_) => StatusCode::BAD_REQUEST,
            TuparkError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            TuparkError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            TuparkError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code string for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            TuparkError::NotFound(_) => "NOT_FOUND",
            TuparkError::BadRequest(_) => "BAD_REQUEST",
            TuparkError::Unauthorized(_) => "UNAUTHORIZED",
            TuparkError::Conflict(_) => "CONFLICT",
            TuparkError::Validation(_) => "VALIDATION_ERROR",
            TuparkError::InvalidIdentity(_) => "INVALID_IDENTITY",
            TuparkError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            TuparkError::Internal(_) => "INTERNAL_ERROR",
            TuparkError::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Message safe to show to the client.
    ///
    /// Storage and internal failures are reported generically; the full error
    /// goes to the log instead.
    pub fn public_message(&self) -> String {
        match self {
            TuparkError::NotFound(m)
            | TuparkError::BadRequest(m)
            | TuparkError::Unauthorized(m)
            | TuparkError::Conflict(m)
            | TuparkError::Validation(m)
            | TuparkError::InvalidIdentity(m) => m.clone(),
            TuparkError::StoreUnavailable(_) => "Storage is temporarily unavailable".to_string(),
            TuparkError::Internal(_) | TuparkError::Database(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

/// Error detail for API responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl axum::response::IntoResponse for TuparkError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body: ApiResponse<()> = ApiResponse {
            success: false,
            message: None,
            data: None,
            error: Some(ErrorDetail {
                code: self.error_code().to_string(),
                message: self.public_message(),
            }),
        };

        (status, axum::Json(body)).into_response()
    }
}
