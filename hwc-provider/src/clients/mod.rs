//! Clients for the remote cloud APIs.
//!
//! - RTS (orchestration): stacks and their resources
//! - CCE (container engine): clusters and cluster nodes
//!
//! Drivers depend on the traits only; [`HttpClient`] is the production
//! implementation and tests substitute in-memory fakes.

pub mod http;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;

pub use http::HttpClient;
pub use types::{
    Cluster, ClusterUpdateOpts, CreatedStack, Node, NodeUpdateOpts, Stack, StackCreateOpts,
    StackResource, StackUpdateOpts, StatusReport,
};

/// RTS orchestration API.
#[async_trait]
pub trait StackApi: Send + Sync {
    async fn create_stack(&self, opts: &StackCreateOpts) -> Result<CreatedStack>;

    async fn get_stack(&self, name: &str, id: &str) -> Result<Stack>;

    async fn update_stack(&self, name: &str, id: &str, opts: &StackUpdateOpts) -> Result<()>;

    async fn delete_stack(&self, name: &str, id: &str) -> Result<()>;

    async fn list_stacks(&self) -> Result<Vec<Stack>>;

    async fn list_stack_resources(&self, name: &str, id: &str) -> Result<Vec<StackResource>>;
}

/// CCE cluster and node API.
#[async_trait]
pub trait CceApi: Send + Sync {
    async fn create_cluster(&self, cluster: &Cluster) -> Result<Cluster>;

    async fn get_cluster(&self, id: &str) -> Result<Cluster>;

    async fn update_cluster(&self, id: &str, opts: &ClusterUpdateOpts) -> Result<Cluster>;

    async fn delete_cluster(&self, id: &str) -> Result<()>;

    async fn list_clusters(&self) -> Result<Vec<Cluster>>;

    async fn create_node(&self, cluster_id: &str, node: &Node) -> Result<Node>;

    async fn get_node(&self, cluster_id: &str, node_id: &str) -> Result<Node>;

    async fn update_node(
        &self,
        cluster_id: &str,
        node_id: &str,
        opts: &NodeUpdateOpts,
    ) -> Result<Node>;

    async fn delete_node(&self, cluster_id: &str, node_id: &str) -> Result<()>;

    async fn list_nodes(&self, cluster_id: &str) -> Result<Vec<Node>>;
}
