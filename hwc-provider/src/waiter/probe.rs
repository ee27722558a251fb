//! Probe outcomes.
//!
//! A probe performs exactly one read of a remote resource and reports what it saw.

use std::fmt;

use crate::error::ApiError;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error reported by a probe, tagged with whether polling may continue.
#[derive(Debug)]
pub struct ProbeError {
    retryable: bool,
    cause: BoxError,
}

impl ProbeError {
    /// A transient condition such as "conflict" or "resource busy".
    pub fn retryable(cause: impl Into<BoxError>) -> Self {
        Self {
            retryable: true,
            cause: cause.into(),
        }
    }

    pub fn fatal(cause: impl Into<BoxError>) -> Self {
        Self {
            retryable: false,
            cause: cause.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    pub fn cause(&self) -> &BoxError {
        &self.cause
    }

    pub fn into_cause(self) -> BoxError {
        self.cause
    }
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.cause.fmt(f)
    }
}

/// Result of a single probe.
#[derive(Debug)]
pub enum ProbeOutcome<T> {
    /// The resource exists and reports `label`.
    Observed { snapshot: T, label: String },
    /// The resource does not exist.
    Absent,
    /// The read itself failed.
    Error(ProbeError),
}

impl<T> ProbeOutcome<T> {
    pub fn observed(snapshot: T, label: impl Into<String>) -> Self {
        ProbeOutcome::Observed {
            snapshot,
            label: label.into(),
        }
    }

    /// Map an API read onto a probe outcome.
    ///
    /// 404 becomes [`ProbeOutcome::Absent`], 409 a retryable error and everything
    /// else a fatal error.
    pub fn from_read<F>(result: Result<T, ApiError>, label: F) -> Self
    where
        F: FnOnce(&T) -> String,
    {
        match result {
            Ok(snapshot) => {
                let label = label(&snapshot);
                ProbeOutcome::Observed { snapshot, label }
            }
            Err(ApiError::NotFound(_)) => ProbeOutcome::Absent,
            Err(e @ ApiError::Conflict(_)) => ProbeOutcome::Error(ProbeError::retryable(e)),
            Err(e) => ProbeOutcome::Error(ProbeError::fatal(e)),
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            ProbeOutcome::Observed { label, .. } => Some(label),
            _ => None,
        }
    }
}
