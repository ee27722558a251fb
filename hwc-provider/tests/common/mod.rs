//! Shared test utilities for hwc-provider integration tests.
//!
//! `FakeCloud` answers reads from scripted status sequences. Each read pops
//! the next reply; the last reply repeats forever.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use hwc_provider::clients::types::{ClusterStatus, Metadata, NodeStatus};
use hwc_provider::clients::{
    CceApi, Cluster, ClusterUpdateOpts, CreatedStack, Node, NodeUpdateOpts, Stack,
    StackCreateOpts, StackResource, StackUpdateOpts,
};
use hwc_provider::error::{ApiError, Result};

/// One scripted API reply.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Resource exists with this status.
    State(&'static str),
    /// Resource exists with this status and reason.
    Failed(&'static str, &'static str),
    NotFound,
    Conflict,
    ServerError,
}

impl Reply {
    fn into_result<T>(self, build: impl FnOnce(&str, Option<&str>) -> T) -> Result<T> {
        match self {
            Reply::State(status) => Ok(build(status, None)),
            Reply::Failed(status, reason) => Ok(build(status, Some(reason))),
            Reply::NotFound => Err(ApiError::NotFound("resource not found".into())),
            Reply::Conflict => Err(ApiError::Conflict("operation in progress".into())),
            Reply::ServerError => Err(ApiError::Status {
                status: 500,
                body: "internal error".into(),
            }),
        }
    }
}

/// Scripted reply queue.
#[derive(Default)]
pub struct Script(Mutex<VecDeque<Reply>>);

impl Script {
    pub fn set(&self, replies: impl IntoIterator<Item = Reply>) {
        *self.0.lock().unwrap() = replies.into_iter().collect();
    }

    fn next(&self) -> Option<Reply> {
        let mut queue = self.0.lock().unwrap();
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

/// In-memory stand-in for the RTS and CCE APIs.
#[derive(Default)]
pub struct FakeCloud {
    pub stack_reads: Script,
    /// Replies to delete calls; `State` means the call succeeded.
    pub stack_deletes: Script,
    pub cluster_reads: Script,
    pub cluster_deletes: Script,
    pub node_reads: Script,
    pub node_deletes: Script,
    pub stacks: Mutex<Vec<Stack>>,
    pub resources: Mutex<Vec<StackResource>>,
    pub clusters: Mutex<Vec<Cluster>>,
    pub nodes: Mutex<Vec<Node>>,
    calls: Mutex<Vec<String>>,
}

impl FakeCloud {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every API call made so far, e.g. `delete_stack web`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn deletion(script: &Script) -> Result<()> {
        match script.next() {
            Some(reply) => reply.into_result(|_, _| ()),
            None => Ok(()),
        }
    }
}

pub fn stack(name: &str, id: &str, status: &str, reason: Option<&str>) -> Stack {
    Stack {
        id: id.into(),
        name: name.into(),
        status: status.into(),
        status_reason: reason.unwrap_or_default().into(),
        ..Default::default()
    }
}

pub fn cluster(id: &str, name: &str, phase: &str, reason: Option<&str>) -> Cluster {
    Cluster {
        kind: "Cluster".into(),
        api_version: "v3".into(),
        metadata: Metadata {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        },
        status: ClusterStatus {
            phase: phase.into(),
            reason: reason.map(str::to_string),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn node(id: &str, name: &str, phase: &str, reason: Option<&str>) -> Node {
    Node {
        kind: "Node".into(),
        api_version: "v3".into(),
        metadata: Metadata {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        },
        status: NodeStatus {
            phase: phase.into(),
            reason: reason.map(str::to_string),
            ..Default::default()
        },
        ..Default::default()
    }
}

#[async_trait]
impl hwc_provider::clients::StackApi for FakeCloud {
    async fn create_stack(&self, opts: &StackCreateOpts) -> Result<CreatedStack> {
        self.record(format!("create_stack {}", opts.name));
        Ok(CreatedStack {
            id: uuid::Uuid::new_v4().to_string(),
        })
    }

    async fn get_stack(&self, name: &str, id: &str) -> Result<Stack> {
        self.record(format!("get_stack {name}"));
        let reply = self.stack_reads.next().unwrap_or(Reply::NotFound);
        reply.into_result(|status, reason| stack(name, id, status, reason))
    }

    async fn update_stack(&self, name: &str, _id: &str, _opts: &StackUpdateOpts) -> Result<()> {
        self.record(format!("update_stack {name}"));
        Ok(())
    }

    async fn delete_stack(&self, name: &str, _id: &str) -> Result<()> {
        self.record(format!("delete_stack {name}"));
        Self::deletion(&self.stack_deletes)
    }

    async fn list_stacks(&self) -> Result<Vec<Stack>> {
        self.record("list_stacks".into());
        Ok(self.stacks.lock().unwrap().clone())
    }

    async fn list_stack_resources(&self, name: &str, _id: &str) -> Result<Vec<StackResource>> {
        self.record(format!("list_stack_resources {name}"));
        Ok(self.resources.lock().unwrap().clone())
    }
}

#[async_trait]
impl CceApi for FakeCloud {
    async fn create_cluster(&self, cluster: &Cluster) -> Result<Cluster> {
        self.record(format!("create_cluster {}", cluster.metadata.name));
        let mut created = cluster.clone();
        created.metadata.id = uuid::Uuid::new_v4().to_string();
        created.status.phase = "Creating".into();
        Ok(created)
    }

    async fn get_cluster(&self, id: &str) -> Result<Cluster> {
        self.record(format!("get_cluster {id}"));
        let reply = self.cluster_reads.next().unwrap_or(Reply::NotFound);
        reply.into_result(|phase, reason| cluster(id, "fake", phase, reason))
    }

    async fn update_cluster(&self, id: &str, opts: &ClusterUpdateOpts) -> Result<Cluster> {
        self.record(format!("update_cluster {id} {}", opts.spec.description));
        Ok(cluster(id, "fake", "Available", None))
    }

    async fn delete_cluster(&self, id: &str) -> Result<()> {
        self.record(format!("delete_cluster {id}"));
        Self::deletion(&self.cluster_deletes)
    }

    async fn list_clusters(&self) -> Result<Vec<Cluster>> {
        self.record("list_clusters".into());
        Ok(self.clusters.lock().unwrap().clone())
    }

    async fn create_node(&self, cluster_id: &str, node: &Node) -> Result<Node> {
        self.record(format!("create_node {cluster_id} {}", node.metadata.name));
        let mut created = node.clone();
        created.metadata.id = uuid::Uuid::new_v4().to_string();
        created.status.phase = "Build".into();
        Ok(created)
    }

    async fn get_node(&self, cluster_id: &str, node_id: &str) -> Result<Node> {
        self.record(format!("get_node {cluster_id} {node_id}"));
        let reply = self.node_reads.next().unwrap_or(Reply::NotFound);
        reply.into_result(|phase, reason| node(node_id, "fake", phase, reason))
    }

    async fn update_node(
        &self,
        cluster_id: &str,
        node_id: &str,
        opts: &NodeUpdateOpts,
    ) -> Result<Node> {
        self.record(format!(
            "update_node {cluster_id} {node_id} {}",
            opts.metadata.name
        ));
        Ok(node(node_id, &opts.metadata.name, "Active", None))
    }

    async fn delete_node(&self, cluster_id: &str, node_id: &str) -> Result<()> {
        self.record(format!("delete_node {cluster_id} {node_id}"));
        Self::deletion(&self.node_deletes)
    }

    async fn list_nodes(&self, cluster_id: &str) -> Result<Vec<Node>> {
        self.record(format!("list_nodes {cluster_id}"));
        Ok(self.nodes.lock().unwrap().clone())
    }
}
