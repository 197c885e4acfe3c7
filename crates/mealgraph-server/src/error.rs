//! Error Types for the Mealgraph API
//!
//! This module defines error handling for the HTTP layer, including:
//! - ApiError struct for structured error responses
//! - ErrorCode enum for categorizing errors
//! - IntoResponse implementation for Axum HTTP responses
//!
//! Errors are serialized as `{"error": <message>, "type": <code>}` with the
//! matching HTTP status. The one exception is `ClientClosed`, which goes out
//! as a plain-text 499 body following the nginx convention.

use std::fmt;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// Error categories for API responses
///
/// Each code maps to one HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Request validation failed (400)
    Validation,
    /// Requested thread does not exist (404)
    NotFound,
    /// Request rate limit exceeded (429)
    RateLimit,
    /// The caller went away before the turn finished (499)
    ClientClosed,
    /// Server-side configuration problem (500)
    Configuration,
    /// Unexpected server error (500)
    Server,
    /// Upstream LLM call failed (502)
    ExternalApi,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::Validation => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::RateLimit => StatusCode::TOO_MANY_REQUESTS,
            // 499 has no StatusCode constant; it is still a valid code.
            ErrorCode::ClientClosed => {
                StatusCode::from_u16(499).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            ErrorCode::Configuration | ErrorCode::Server => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::ExternalApi => StatusCode::BAD_GATEWAY,
        }
    }

    /// Get a default message for this error code
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::Validation => "Request validation failed",
            ErrorCode::NotFound => "Thread not found. Please start a new conversation.",
            ErrorCode::RateLimit => "Rate limit exceeded",
            ErrorCode::ClientClosed => "Client closed request",
            ErrorCode::Configuration => "Server configuration error",
            ErrorCode::Server => "An unexpected error occurred",
            ErrorCode::ExternalApi => "Upstream service error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Structured error response for API operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable error message
    #[serde(rename = "error")]
    pub message: String,

    /// Error code categorizing the error
    #[serde(rename = "type")]
    pub code: ErrorCode,
}

impl ApiError {
    /// Create a new API error with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }

    /// Create a new API error with the code's default message
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            message: code.default_message().to_string(),
            code,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    /// Create a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Validation, message)
    }

    /// Create a NotFound error with the canonical thread message
    pub fn thread_not_found() -> Self {
        Self::from_code(ErrorCode::NotFound)
    }

    /// Create a ClientClosed error
    pub fn client_closed() -> Self {
        Self::from_code(ErrorCode::ClientClosed)
    }

    /// Create a Configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Configuration, message)
    }

    /// Create a Server error
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Server, message)
    }

    /// Create an ExternalApi error
    pub fn external_api(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ExternalApi, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if self.code == ErrorCode::ClientClosed {
            // 499 is plain text, not the JSON error shape.
            return (status, self.message).into_response();
        }
        (status, Json(self)).into_response()
    }
}

impl From<mealgraph_core::Error> for ApiError {
    fn from(err: mealgraph_core::Error) -> Self {
        use mealgraph_core::Error;

        match err {
            Error::ThreadNotFound(_) => ApiError::thread_not_found(),
            Error::InvalidInput(message) => {
                ApiError::validation(format!("Invalid request format: {}", message))
            }
            Error::Cancelled => ApiError::client_closed(),
            Error::ConfigError(message) => ApiError::configuration(message),
            Error::RateLimited(_) => ApiError::new(ErrorCode::RateLimit, err.to_string()),
            Error::NetworkError(_) | Error::LLMError(_) | Error::DecisionRejected(_) => {
                tracing::error!(error = %err, "Upstream LLM failure");
                ApiError::external_api(err.to_string())
            }
            Error::Other(_) | Error::Io(_) => {
                tracing::error!(error = %err, "Unhandled core error");
                ApiError::server(err.to_string())
            }
        }
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;
