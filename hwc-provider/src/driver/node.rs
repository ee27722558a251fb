//! Node driver - manages nodes of a CCE cluster.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{converge, status_label, Driver, DriverError, Timeouts};
use crate::clients::{CceApi, Node, NodeUpdateOpts};
use crate::error::ApiError;
use crate::waiter::{AbsencePolicy, ProbeOutcome, SpecError, WaitSpec};

pub const BUILD: &str = "Build";
pub const CREATING: &str = "Creating";
pub const INSTALLING: &str = "Installing";
pub const ACTIVE: &str = "Active";
pub const AVAILABLE: &str = "Available";
pub const DELETING: &str = "Deleting";

/// Nodes are addressed by cluster and node id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeKey {
    pub cluster_id: String,
    pub node_id: String,
}

impl NodeKey {
    pub fn new(cluster_id: impl Into<String>, node_id: impl Into<String>) -> Self {
        Self {
            cluster_id: cluster_id.into(),
            node_id: node_id.into(),
        }
    }

    fn describe(&self) -> String {
        format!("node {} in cluster {}", self.node_id, self.cluster_id)
    }
}

/// Desired node together with the cluster it joins.
#[derive(Debug, Clone)]
pub struct NodeCreate {
    pub cluster_id: String,
    pub node: Node,
}

/// CCE node driver.
pub struct NodeDriver {
    api: Arc<dyn CceApi>,
    timeouts: Timeouts,
    cancel: CancellationToken,
}

impl NodeDriver {
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
            .pending([BUILD, CREATING, INSTALLING])
            .target([ACTIVE, AVAILABLE])
            .absence(AbsencePolicy::Failure)
            .build()
    }

    pub fn delete_spec(&self) -> Result<WaitSpec, SpecError> {
        self.timeouts
            .spec(self.timeouts.delete)
            .pending([DELETING, ACTIVE, AVAILABLE])
            .absence(AbsencePolicy::Success)
            .build()
    }

    async fn get(&self, key: &NodeKey) -> Result<Node, DriverError> {
        self.api
            .get_node(&key.cluster_id, &key.node_id)
            .await
            .map_err(|e| DriverError::api("retrieving", &key.describe(), e))
    }
}

#[async_trait]
impl Driver for NodeDriver {
    type Spec = NodeCreate;
    type Update = NodeUpdateOpts;
    type Key = NodeKey;
    type Snapshot = Node;

    async fn create(&self, req: &NodeCreate) -> Result<(NodeKey, Node), DriverError> {
        let spec = self.create_spec()?;
        info!(
            "Creating node {} in cluster {}",
            req.node.metadata.name, req.cluster_id
        );

        let created = self
            .api
            .create_node(&req.cluster_id, &req.node)
            .await
            .map_err(|e| {
                DriverError::api("creating", &format!("node {}", req.node.metadata.name), e)
            })?;
        let key = NodeKey::new(req.cluster_id.clone(), created.metadata.id);
        info!("Waiting for {} to become available", key.describe());

        let api = self.api.as_ref();
        let k = &key;
        let done = converge(
            spec,
            &self.cancel,
            "become available",
            &key.describe(),
            move || async move {
                ProbeOutcome::from_read(api.get_node(&k.cluster_id, &k.node_id).await, status_label)
            },
        )
        .await?;

        let node = match done.snapshot {
            Some(node) => node,
            None => self.get(&key).await?,
        };
        Ok((key, node))
    }

    async fn read(&self, key: &NodeKey) -> Result<Option<Node>, DriverError> {
        match self.api.get_node(&key.cluster_id, &key.node_id).await {
            Ok(node) => Ok(Some(node)),
            Err(ApiError::NotFound(_)) => {
                warn!("{} no longer exists", key.describe());
                Ok(None)
            }
            Err(e) => Err(DriverError::api("retrieving", &key.describe(), e)),
        }
    }

    /// Renames apply immediately; the node is read back without waiting.
    async fn update(&self, key: &NodeKey, opts: &NodeUpdateOpts) -> Result<Node, DriverError> {
        info!("Updating {}", key.describe());
        self.api
            .update_node(&key.cluster_id, &key.node_id, opts)
            .await
            .map_err(|e| DriverError::api("updating", &key.describe(), e))?;
        self.get(key).await
    }

    async fn delete(&self, key: &NodeKey) -> Result<(), DriverError> {
        let spec = self.delete_spec()?;
        info!("Deleting {}", key.describe());

        match self.api.delete_node(&key.cluster_id, &key.node_id).await {
            Ok(()) => {}
            Err(ApiError::NotFound(_)) => {
                info!("{} already deleted", key.describe());
                return Ok(());
            }
            Err(ApiError::Conflict(msg)) => warn!("{} busy: {}", key.describe(), msg),
            Err(e) => return Err(DriverError::api("deleting", &key.describe(), e)),
        }

        let api = self.api.as_ref();
        converge(spec, &self.cancel, "be deleted", &key.describe(), move || async move {
            ProbeOutcome::from_read(api.get_node(&key.cluster_id, &key.node_id).await, status_label)
        })
        .await?;

        info!("Successfully deleted {}", key.describe());
        Ok(())
    }
}
