//! Error types for remote API calls.

use thiserror::Error;

/// Errors returned by the remote orchestration and CCE APIs.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (HTTP 404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Resource busy or a conflicting request is still processing (HTTP 409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Any other non-success HTTP status.
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    /// Connection or request-level failure.
    #[error("transport: {0}")]
    Transport(String),

    /// Response body could not be decoded.
    #[error("decode: {0}")]
    Decode(String),

    /// A lookup did not resolve to exactly one resource.
    #[error(transparent)]
    Lookup(#[from] LookupError),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ApiError::Conflict(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

/// Errors from list-and-filter lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("query returned no results, change the search criteria and try again")]
    NoResults,

    #[error("query returned {0} results, use a more specific search criteria")]
    MultipleResults(usize),
}

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;
