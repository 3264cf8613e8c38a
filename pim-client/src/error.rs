//! Client error types

use shared::ErrorResponseBody;
use shared::response::PaginationError;
use thiserror::Error;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Request superseded by a newer one for the same slot
    #[error("Request cancelled")]
    Cancelled,

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Authentication required
    #[error("Authentication required")]
    Unauthorized,

    /// Permission denied
    #[error("Permission denied: {0}")]
    Forbidden(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// HTTP 400, optionally with structured field errors
    #[error("Bad request: {message}")]
    BadRequest {
        message: String,
        body: Option<ErrorResponseBody>,
    },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// Cancelled requests are superseded, not failed
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ClientError::Cancelled)
    }

    /// Structured validation errors of a 400 response, if any
    pub fn field_errors(&self) -> Option<&ErrorResponseBody> {
        match self {
            ClientError::BadRequest {
                body: Some(body), ..
            } if body.has_field_errors() => Some(body),
            _ => None,
        }
    }
}

impl From<PaginationError> for ClientError {
    fn from(err: PaginationError) -> Self {
        ClientError::InvalidResponse(err.to_string())
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Outcome of a load at a composable boundary
///
/// Failures never escape as errors: they are reported through the
/// notification sink and the previous state is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// Fresh data applied
    Loaded,
    /// Superseded by a newer request; nothing applied, nothing reported
    Cancelled,
    /// Request failed; last good state retained
    NotLoaded,
}
