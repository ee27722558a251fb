//! Lifecycle drivers for the different resource kinds.
//!
//! Each driver issues the mutating API call and then hands the waiter a probe
//! plus the pending/target states that apply to that operation. Drivers declare
//! their own state vocabularies; nothing is shared between resource kinds.

pub mod cluster;
pub mod node;
pub mod stack;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::clients::StatusReport;
use crate::error::ApiError;
use crate::waiter::{
    Converged, FailureKind, ProbeOutcome, SpecError, WaitFailure, WaitSpec, WaitSpecBuilder,
    Waiter, DEFAULT_DELAY, DEFAULT_POLL_INTERVAL,
};

pub use cluster::ClusterDriver;
pub use node::{NodeCreate, NodeDriver, NodeKey};
pub use stack::{StackDriver, StackKey};

/// Trait for resource lifecycle drivers.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Desired state sent on creation.
    type Spec: Send + Sync;
    /// In-place changes.
    type Update: Send + Sync;
    /// Identifies an existing resource.
    type Key: Send + Sync;
    /// Remote representation.
    type Snapshot: Send;

    /// Create the resource and wait until it is ready.
    async fn create(&self, spec: &Self::Spec) -> Result<(Self::Key, Self::Snapshot), DriverError>;

    /// Read the resource. `None` if it no longer exists.
    async fn read(&self, key: &Self::Key) -> Result<Option<Self::Snapshot>, DriverError>;

    /// Apply in-place changes and wait until they are applied.
    async fn update(
        &self,
        key: &Self::Key,
        update: &Self::Update,
    ) -> Result<Self::Snapshot, DriverError>;

    /// Delete the resource and wait until it is gone.
    async fn delete(&self, key: &Self::Key) -> Result<(), DriverError>;
}

/// Wait budgets per operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub update: Duration,
    pub delete: Duration,
    pub delay: Duration,
    pub poll_interval: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: Duration::from_secs(10 * 60),
            update: Duration::from_secs(10 * 60),
            delete: Duration::from_secs(10 * 60),
            delay: DEFAULT_DELAY,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl Timeouts {
    fn spec(&self, timeout: Duration) -> WaitSpecBuilder {
        WaitSpec::builder(timeout)
            .delay(self.delay)
            .poll_interval(self.poll_interval)
    }
}

/// Errors surfaced to the user by drivers.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("error {action} {resource}: {source}")]
    Api {
        action: &'static str,
        resource: String,
        #[source]
        source: ApiError,
    },

    #[error("error waiting for {resource} to {action}: {detail}")]
    Wait {
        action: &'static str,
        resource: String,
        kind: FailureKind,
        status: Option<String>,
        reason: Option<String>,
        detail: String,
    },

    #[error("invalid wait specification: {0}")]
    InvalidSpec(#[from] SpecError),
}

impl DriverError {
    pub(crate) fn api(action: &'static str, resource: &str, source: ApiError) -> Self {
        DriverError::Api {
            action,
            resource: resource.to_string(),
            source,
        }
    }

    /// Build a user-facing error that carries the last known status and reason.
    pub(crate) fn wait<T: StatusReport>(
        action: &'static str,
        resource: &str,
        failure: WaitFailure<T>,
    ) -> Self {
        let status = failure
            .snapshot
            .as_ref()
            .map(|s| s.status().to_string())
            .or_else(|| failure.label.clone());
        let reason = failure
            .snapshot
            .as_ref()
            .and_then(|s| s.reason())
            .map(str::to_string);

        let detail = match (&status, &reason) {
            (Some(status), Some(reason)) if failure.kind == FailureKind::UnexpectedState => {
                format!("{status}: {reason:?}")
            }
            (_, Some(reason)) => format!("{failure} ({reason:?})"),
            _ => failure.to_string(),
        };

        DriverError::Wait {
            action,
            resource: resource.to_string(),
            kind: failure.kind,
            status,
            reason,
            detail,
        }
    }

    /// Wait failure kind, if this error came from a wait.
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            DriverError::Wait { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Run a waiter and convert its failure into a [`DriverError`].
pub(crate) async fn converge<T, F, Fut>(
    spec: WaitSpec,
    cancel: &CancellationToken,
    action: &'static str,
    resource: &str,
    probe: F,
) -> Result<Converged<T>, DriverError>
where
    T: StatusReport,
    F: FnMut() -> Fut,
    Fut: Future<Output = ProbeOutcome<T>>,
{
    Waiter::new(spec)
        .with_cancellation(cancel.clone())
        .describing(resource)
        .wait(probe)
        .await
        .map_err(|failure| DriverError::wait(action, resource, failure))
}

/// Label a snapshot by its status.
pub(crate) fn status_label<T: StatusReport>(snapshot: &T) -> String {
    snapshot.status().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::Stack;

    fn failure(kind: FailureKind, snapshot: Option<Stack>) -> WaitFailure<Stack> {
        WaitFailure {
            kind,
            label: snapshot.as_ref().map(|s| s.status.clone()),
            snapshot,
            cause: None,
            target: "CREATE_COMPLETE".into(),
            attempts: 3,
            elapsed: Duration::from_secs(9),
        }
    }

    #[test]
    fn unexpected_state_reports_status_and_reason() {
        let stack = Stack {
            status: "CREATE_FAILED".into(),
            status_reason: "quota exceeded".into(),
            ..Default::default()
        };
        let err = DriverError::wait(
            "become active",
            "stack web",
            failure(FailureKind::UnexpectedState, Some(stack)),
        );

        assert_eq!(err.kind(), Some(FailureKind::UnexpectedState));
        assert_eq!(
            err.to_string(),
            "error waiting for stack web to become active: CREATE_FAILED: \"quota exceeded\""
        );
        match err {
            DriverError::Wait { status, reason, .. } => {
                assert_eq!(status.as_deref(), Some("CREATE_FAILED"));
                assert_eq!(reason.as_deref(), Some("quota exceeded"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn timeout_without_snapshot() {
        let err = DriverError::wait("be deleted", "stack web", failure(FailureKind::Timeout, None));
        assert_eq!(err.kind(), Some(FailureKind::Timeout));
        assert!(err.to_string().contains("timeout after"));
    }
}
