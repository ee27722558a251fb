//! Cluster driver - manages CCE clusters.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{converge, status_label, Driver, DriverError, Timeouts};
use crate::clients::{CceApi, Cluster, ClusterUpdateOpts};
use crate::error::ApiError;
use crate::waiter::{AbsencePolicy, ProbeOutcome, SpecError, WaitSpec};

pub const CREATING: &str = "Creating";
pub const AVAILABLE: &str = "Available";
pub const UNAVAILABLE: &str = "Unavailable";
pub const UPGRADING: &str = "Upgrading";
pub const DELETING: &str = "Deleting";

/// CCE cluster driver.
pub struct ClusterDriver {
    api: Arc<dyn CceApi>,
    timeouts: Timeouts,
    cancel: CancellationToken,
}

impl ClusterDriver {
    pub fn new(api: Arc<dyn CceApi>) -> Self {
        Self {
            api,
            timeouts: Timeouts::default(),
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

    pub fn create_spec(&self) -> Result<WaitSpec, SpecError> {
        self.timeouts
            .spec(self.timeouts.create)
            .pending([CREATING])
            .target([AVAILABLE])
            .absence(AbsencePolicy::Failure)
            .build()
    }

    pub fn update_spec(&self) -> Result<WaitSpec, SpecError> {
        self.timeouts
            .spec(self.timeouts.update)
            .pending([UPGRADING])
            .target([AVAILABLE])
            .absence(AbsencePolicy::Failure)
            .build()
    }

    pub fn delete_spec(&self) -> Result<WaitSpec, SpecError> {
        self.timeouts
            .spec(self.timeouts.delete)
            .pending([DELETING, AVAILABLE, UNAVAILABLE])
            .absence(AbsencePolicy::Success)
            .build()
    }

    async fn wait(
        &self,
        spec: WaitSpec,
        action: &'static str,
        id: &str,
    ) -> Result<Cluster, DriverError> {
        let resource = format!("cluster {id}");
        let api = self.api.as_ref();
        let done = converge(spec, &self.cancel, action, &resource, move || async move {
            ProbeOutcome::from_read(api.get_cluster(id).await, status_label)
        })
        .await?;

        match done.snapshot {
            Some(cluster) => Ok(cluster),
            None => self
                .api
                .get_cluster(id)
                .await
                .map_err(|e| DriverError::api("retrieving", &resource, e)),
        }
    }
}

#[async_trait]
impl Driver for ClusterDriver {
    type Spec = Cluster;
    type Update = ClusterUpdateOpts;
    type Key = String;
    type Snapshot = Cluster;

    async fn create(&self, cluster: &Cluster) -> Result<(String, Cluster), DriverError> {
        let spec = self.create_spec()?;
        info!("Creating cluster {}", cluster.metadata.name);

        let created = self.api.create_cluster(cluster).await.map_err(|e| {
            DriverError::api("creating", &format!("cluster {}", cluster.metadata.name), e)
        })?;
        let id = created.metadata.id;
        info!("Waiting for cluster {} to become available", id);

        let cluster = self.wait(spec, "become available", &id).await?;
        Ok((id, cluster))
    }

    async fn read(&self, id: &String) -> Result<Option<Cluster>, DriverError> {
        match self.api.get_cluster(id).await {
            Ok(cluster) => Ok(Some(cluster)),
            Err(ApiError::NotFound(_)) => {
                warn!("cluster {} no longer exists", id);
                Ok(None)
            }
            Err(e) => Err(DriverError::api("retrieving", &format!("cluster {id}"), e)),
        }
    }

    async fn update(&self, id: &String, opts: &ClusterUpdateOpts) -> Result<Cluster, DriverError> {
        let spec = self.update_spec()?;
        info!("Updating cluster {}", id);

        self.api
            .update_cluster(id, opts)
            .await
            .map_err(|e| DriverError::api("updating", &format!("cluster {id}"), e))?;

        self.wait(spec, "apply update", id).await
    }

    async fn delete(&self, id: &String) -> Result<(), DriverError> {
        let spec = self.delete_spec()?;
        info!("Deleting cluster {}", id);

        match self.api.delete_cluster(id).await {
            Ok(()) => {}
            Err(ApiError::NotFound(_)) => {
                info!("cluster {} already deleted", id);
                return Ok(());
            }
            // A previous delete is still being processed.
            Err(ApiError::Conflict(msg)) => warn!("cluster {} busy: {}", id, msg),
            Err(e) => return Err(DriverError::api("deleting", &format!("cluster {id}"), e)),
        }

        let resource = format!("cluster {id}");
        let api = self.api.as_ref();
        converge(spec, &self.cancel, "be deleted", &resource, move || async move {
            ProbeOutcome::from_read(api.get_cluster(id).await, status_label)
        })
        .await?;

        info!("Successfully deleted cluster {}", id);
        Ok(())
    }
}
