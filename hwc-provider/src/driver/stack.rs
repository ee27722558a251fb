//! Stack driver - creates, updates and deletes RTS stacks.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{converge, status_label, Driver, DriverError, Timeouts};
use crate::clients::{Stack, StackApi, StackCreateOpts, StackUpdateOpts};
use crate::error::ApiError;
use crate::waiter::{AbsencePolicy, ProbeError, ProbeOutcome, SpecError, WaitSpec};

pub const CREATE_IN_PROGRESS: &str = "CREATE_IN_PROGRESS";
pub const CREATE_COMPLETE: &str = "CREATE_COMPLETE";
pub const CREATE_FAILED: &str = "CREATE_FAILED";
pub const UPDATE_IN_PROGRESS: &str = "UPDATE_IN_PROGRESS";
pub const UPDATE_COMPLETE: &str = "UPDATE_COMPLETE";
pub const UPDATE_FAILED: &str = "UPDATE_FAILED";
pub const ROLLBACK_IN_PROGRESS: &str = "ROLLBACK_IN_PROGRESS";
pub const ROLLBACK_COMPLETE: &str = "ROLLBACK_COMPLETE";
pub const DELETE_IN_PROGRESS: &str = "DELETE_IN_PROGRESS";
pub const DELETE_COMPLETE: &str = "DELETE_COMPLETE";
pub const DELETE_FAILED: &str = "DELETE_FAILED";

/// Stacks are addressed by name and id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackKey {
    pub name: String,
    pub id: String,
}

impl StackKey {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
        }
    }

    fn describe(&self) -> String {
        format!("stack {} ({})", self.name, self.id)
    }
}

/// Stack driver backed by the RTS API.
pub struct StackDriver {
    api: Arc<dyn StackApi>,
    timeouts: Timeouts,
    cancel: CancellationToken,
}

impl StackDriver {
    pub fn new(api: Arc<dyn StackApi>) -> Self {
        Self {
            api,
            timeouts: Timeouts {
                delete: Duration::from_secs(3 * 60),
                ..Timeouts::default()
            },
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    pub fn create_spec(&self) -> Result<WaitSpec, SpecError> {
        self.timeouts
            .spec(self.timeouts.create)
            .pending([CREATE_IN_PROGRESS])
            .target([CREATE_COMPLETE])
            .absence(AbsencePolicy::Failure)
            .build()
    }

    /// A stack still reports its previous `CREATE_COMPLETE` until the update starts.
    pub fn update_spec(&self) -> Result<WaitSpec, SpecError> {
        self.timeouts
            .spec(self.timeouts.update)
            .pending([UPDATE_IN_PROGRESS, ROLLBACK_IN_PROGRESS, CREATE_COMPLETE])
            .target([UPDATE_COMPLETE])
            .absence(AbsencePolicy::Failure)
            .build()
    }

    /// Every settled state is pending: the delete probe re-issues the delete until
    /// the stack starts deleting.
    pub fn delete_spec(&self) -> Result<WaitSpec, SpecError> {
        self.timeouts
            .spec(self.timeouts.delete)
            .pending([
                DELETE_IN_PROGRESS,
                CREATE_COMPLETE,
                CREATE_FAILED,
                UPDATE_COMPLETE,
                UPDATE_FAILED,
                ROLLBACK_COMPLETE,
                ROLLBACK_IN_PROGRESS,
            ])
            .target([DELETE_COMPLETE])
            .absence(AbsencePolicy::Success)
            .build()
    }

    async fn get(&self, key: &StackKey) -> Result<Stack, DriverError> {
        self.api
            .get_stack(&key.name, &key.id)
            .await
            .map_err(|e| DriverError::api("retrieving", &key.describe(), e))
    }

    /// One delete probe: read the stack and re-issue the delete if it has not
    /// started deleting yet.
    async fn probe_delete(api: &dyn StackApi, key: &StackKey) -> ProbeOutcome<Stack> {
        let stack = match api.get_stack(&key.name, &key.id).await {
            Ok(stack) => stack,
            Err(e) => return ProbeOutcome::from_read(Err(e), status_label),
        };

        if matches!(
            stack.status.as_str(),
            DELETE_IN_PROGRESS | DELETE_COMPLETE | DELETE_FAILED
        ) {
            let label = stack.status.clone();
            return ProbeOutcome::observed(stack, label);
        }

        match api.delete_stack(&key.name, &key.id).await {
            Ok(()) => {
                let label = stack.status.clone();
                ProbeOutcome::observed(stack, label)
            }
            Err(ApiError::NotFound(_)) => ProbeOutcome::Absent,
            Err(e @ ApiError::Conflict(_)) => ProbeOutcome::Error(ProbeError::retryable(e)),
            Err(e) => ProbeOutcome::Error(ProbeError::fatal(e)),
        }
    }
}

#[async_trait]
impl Driver for StackDriver {
    type Spec = StackCreateOpts;
    type Update = StackUpdateOpts;
    type Key = StackKey;
    type Snapshot = Stack;

    async fn create(&self, opts: &Self::Spec) -> Result<(StackKey, Stack), DriverError> {
        let spec = self.create_spec()?;
        info!("Creating stack {}", opts.name);

        let created = self
            .api
            .create_stack(opts)
            .await
            .map_err(|e| DriverError::api("creating", &format!("stack {}", opts.name), e))?;
        let key = StackKey::new(opts.name.clone(), created.id);
        info!("Created {}, waiting for it to become active", key.describe());

        let api = self.api.as_ref();
        let k = &key;
        let done = converge(
            spec,
            &self.cancel,
            "become active",
            &key.describe(),
            move || async move {
                ProbeOutcome::from_read(api.get_stack(&k.name, &k.id).await, status_label)
            },
        )
        .await?;

        let stack = match done.snapshot {
            Some(stack) => stack,
            None => self.get(&key).await?,
        };
        Ok((key, stack))
    }

    async fn read(&self, key: &StackKey) -> Result<Option<Stack>, DriverError> {
        match self.api.get_stack(&key.name, &key.id).await {
            Ok(stack) => Ok(Some(stack)),
            Err(ApiError::NotFound(_)) => {
                warn!("{} no longer exists", key.describe());
                Ok(None)
            }
            Err(e) => Err(DriverError::api("retrieving", &key.describe(), e)),
        }
    }

    async fn update(&self, key: &StackKey, opts: &StackUpdateOpts) -> Result<Stack, DriverError> {
        let spec = self.update_spec()?;
        info!("Updating {}", key.describe());

        self.api
            .update_stack(&key.name, &key.id, opts)
            .await
            .map_err(|e| DriverError::api("updating", &key.describe(), e))?;

        let api = self.api.as_ref();
        let done = converge(spec, &self.cancel, "update", &key.describe(), move || async move {
            ProbeOutcome::from_read(api.get_stack(&key.name, &key.id).await, status_label)
        })
        .await?;

        match done.snapshot {
            Some(stack) => Ok(stack),
            None => self.get(key).await,
        }
    }

    async fn delete(&self, key: &StackKey) -> Result<(), DriverError> {
        let spec = self.delete_spec()?;
        info!("Destroying {}", key.describe());

        match self.api.delete_stack(&key.name, &key.id).await {
            Ok(()) => {}
            Err(ApiError::NotFound(_)) => {
                info!("{} already deleted", key.describe());
                return Ok(());
            }
            // A previous delete is still being processed; the probe keeps retrying.
            Err(ApiError::Conflict(msg)) => warn!("{} busy: {}", key.describe(), msg),
            Err(e) => return Err(DriverError::api("deleting", &key.describe(), e)),
        }

        let api = self.api.as_ref();
        converge(spec, &self.cancel, "be deleted", &key.describe(), move || {
            Self::probe_delete(api, key)
        })
        .await?;

        info!("Successfully deleted {}", key.describe());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoApi;

    #[async_trait]
    impl StackApi for NoApi {
        async fn create_stack(
            &self,
            _: &StackCreateOpts,
        ) -> crate::error::Result<crate::clients::CreatedStack> {
            unimplemented!()
        }
        async fn get_stack(&self, _: &str, _: &str) -> crate::error::Result<Stack> {
            unimplemented!()
        }
        async fn update_stack(
            &self,
            _: &str,
            _: &str,
            _: &StackUpdateOpts,
        ) -> crate::error::Result<()> {
            unimplemented!()
        }
        async fn delete_stack(&self, _: &str, _: &str) -> crate::error::Result<()> {
            unimplemented!()
        }
        async fn list_stacks(&self) -> crate::error::Result<Vec<Stack>> {
            unimplemented!()
        }
        async fn list_stack_resources(
            &self,
            _: &str,
            _: &str,
        ) -> crate::error::Result<Vec<crate::clients::StackResource>> {
            unimplemented!()
        }
    }

    #[test]
    fn state_vocabularies() {
        let driver = StackDriver::new(Arc::new(NoApi));

        let create = driver.create_spec().unwrap();
        assert!(create.is_pending(CREATE_IN_PROGRESS));
        assert!(create.is_target(CREATE_COMPLETE));
        assert!(!create.is_pending(CREATE_FAILED) && !create.is_target(CREATE_FAILED));
        assert_eq!(create.absence(), AbsencePolicy::Failure);

        let update = driver.update_spec().unwrap();
        assert!(update.is_pending(CREATE_COMPLETE));
        assert!(update.is_target(UPDATE_COMPLETE));
        assert!(!update.is_pending(ROLLBACK_COMPLETE));

        let delete = driver.delete_spec().unwrap();
        assert!(delete.is_target(DELETE_COMPLETE));
        assert!(!delete.is_target(DELETE_FAILED) && !delete.is_pending(DELETE_FAILED));
        assert_eq!(delete.absence(), AbsencePolicy::Success);
        assert_eq!(delete.timeout(), Duration::from_secs(180));
    }
}
