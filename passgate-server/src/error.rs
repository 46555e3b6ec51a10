//! API error handling module
//!
//! Maps core failures onto HTTP responses. The mapping is deliberately
//! lossy towards the client: internal detail goes to the logs, the client
//! sees only a generic category and message. A possible-clone detection is
//! additionally logged as a security event for operational monitoring — it
//! signals a potential incident, not ordinary user error.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use passgate_core::{CloneError, StoreError, TokenError, VerificationError};

/// API error type with structured variants for different error categories
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request - client provided invalid input
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error - unexpected server-side failure
    #[error("Internal error: {0}")]
    Internal(String),

    /// Challenge token missing, invalid or expired
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Ceremony verification failed
    #[error(transparent)]
    Verification(#[from] VerificationError),

    /// Signature counter did not advance
    #[error(transparent)]
    Clone(#[from] CloneError),

    /// Credential store failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Create an internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            // All three token failures are the same to the caller: the
            // ceremony binding is gone, start over.
            Self::Token(_) => StatusCode::UNAUTHORIZED,
            Self::Verification(_) => StatusCode::BAD_REQUEST,
            Self::Clone(_) => StatusCode::FORBIDDEN,
            Self::Store(e) => match e {
                StoreError::NotFound => StatusCode::NOT_FOUND,
                StoreError::Conflict => StatusCode::CONFLICT,
                // The one retriable category.
                StoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }

    /// Get the error code for programmatic error handling
    fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "INVALID_INPUT",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Token(_) => "CEREMONY_TOKEN_REJECTED",
            Self::Verification(_) => "VERIFICATION_FAILED",
            Self::Clone(_) => "POSSIBLE_CLONE",
            Self::Store(e) => match e {
                StoreError::NotFound => "CREDENTIAL_NOT_FOUND",
                StoreError::Conflict => "STORE_CONFLICT",
                StoreError::Unavailable(_) => "STORE_UNAVAILABLE",
            },
        }
    }

    /// Get sanitized error message for client response.
    ///
    /// Never echoes internal detail or client-controlled bytes back across
    /// the trust boundary.
    fn client_message(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "Invalid request",
            Self::Internal(_) => "Internal server error",
            Self::Token(_) => "Ceremony token missing, invalid or expired",
            Self::Verification(_) => "Ceremony verification failed",
            Self::Clone(_) => "Security alert: possible cloned credential detected",
            Self::Store(e) => match e {
                StoreError::NotFound => "Credential not found",
                StoreError::Conflict => "Credential store conflict",
                StoreError::Unavailable(_) => "Service temporarily unavailable, retry later",
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();
        let internal_message = self.to_string();
        let client_message = self.client_message();

        match &self {
            Self::Clone(e) => {
                // Surfaced to monitoring, not just the HTTP response.
                tracing::warn!(
                    security_event = "possible_clone",
                    status = %status,
                    code = code,
                    error = %e,
                    "possible cloned authenticator detected"
                );
            }
            Self::BadRequest(_) | Self::Token(_) | Self::Verification(_) => {
                tracing::warn!(
                    status = %status,
                    code = code,
                    error = %internal_message,
                    "ceremony rejected"
                );
            }
            Self::Store(StoreError::Unavailable(_)) | Self::Internal(_) => {
                tracing::error!(
                    status = %status,
                    code = code,
                    error = %internal_message,
                    "server error"
                );
            }
            Self::Store(_) => {
                tracing::warn!(
                    status = %status,
                    code = code,
                    error = %internal_message,
                    "store rejected operation"
                );
            }
        }

        // All error responses include a `code` field for programmatic
        // error handling; the message never carries internal detail.
        let body = serde_json::json!({
            "success": false,
            "error": client_message,
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}
