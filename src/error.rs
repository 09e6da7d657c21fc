/// Unified error types for the Ecosystem CMS backend
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the CMS backend
#[derive(Error, Debug)]
pub enum CmsError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Missing or malformed input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing, invalid or expired credential
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Credential present but not permitted (revoked refresh token, non-admin)
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Password reset token unknown, already used, or past its expiry
    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,

    /// Rate limiting errors
    #[error("Rate limit exceeded: {message}")]
    RateLimitExceeded {
        message: String,
        retry_after: std::time::Duration,
    },

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict errors (e.g., duplicate username)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored document could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// JWT signing errors
    #[error("JWT error: {0}")]
    Jwt(String),

    /// Email delivery errors
    #[error("Mail error: {0}")]
    Mail(String),
}

/// JSON error body returned by every endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl CmsError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            CmsError::Validation(_) | CmsError::InvalidOrExpiredToken => StatusCode::BAD_REQUEST,
            CmsError::Authentication(_) => StatusCode::UNAUTHORIZED,
            CmsError::Authorization(_) => StatusCode::FORBIDDEN,
            CmsError::NotFound(_) => StatusCode::NOT_FOUND,
            CmsError::Conflict(_) => StatusCode::CONFLICT,
            CmsError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convert CmsError to HTTP response
impl IntoResponse for CmsError {
    fn into_response(self) -> Response {
        let status = self.status();
        let retry_after = match &self {
            CmsError::RateLimitExceeded { retry_after, .. } => Some(retry_after.as_secs().max(1)),
            _ => None,
        };

        let (error_code, message) = match self {
            CmsError::Validation(msg) => ("ValidationError", msg),
            CmsError::InvalidOrExpiredToken => {
                ("InvalidOrExpiredToken", "Invalid or expired token".to_string())
            }
            CmsError::Authentication(msg) => ("Unauthorized", msg),
            CmsError::Authorization(msg) => ("Forbidden", msg),
            CmsError::NotFound(msg) => ("NotFound", msg),
            CmsError::Conflict(msg) => ("Conflict", msg),
            CmsError::RateLimitExceeded { message, .. } => ("RateLimitExceeded", message),
            other => {
                tracing::error!("Request failed: {}", other);
                (
                    "InternalServerError",
                    "Internal server error".to_string(), // Don't leak details
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        let mut response = (status, body).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

impl From<validator::ValidationErrors> for CmsError {
    fn from(errors: validator::ValidationErrors) -> Self {
        CmsError::Validation(errors.to_string())
    }
}

/// Result type alias for CMS operations
pub type CmsResult<T> = Result<T, CmsError>;
