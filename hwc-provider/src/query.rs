//! Lookups that resolve a filter to exactly one remote resource.
//!
//! The APIs only support listing, so filters are applied client-side. An empty
//! filter field matches everything.

use tracing::debug;

use crate::clients::{CceApi, Cluster, Node, Stack, StackApi, StackResource};
use crate::error::{LookupError, Result};

/// `true` if the filter value is unset or equal to `actual`.
fn matches(filter: &Option<String>, actual: &str) -> bool {
    filter.as_deref().map_or(true, |want| want.is_empty() || want == actual)
}

/// Reduce a filtered list to its single element.
pub fn single<T>(mut items: Vec<T>) -> std::result::Result<T, LookupError> {
    match items.len() {
        0 => Err(LookupError::NoResults),
        1 => Ok(items.remove(0)),
        n => Err(LookupError::MultipleResults(n)),
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClusterFilter {
    pub id: Option<String>,
    pub name: Option<String>,
    pub cluster_type: Option<String>,
    pub phase: Option<String>,
    pub vpc_id: Option<String>,
}

impl ClusterFilter {
    pub fn matches(&self, c: &Cluster) -> bool {
        matches(&self.id, &c.metadata.id)
            && matches(&self.name, &c.metadata.name)
            && matches(&self.cluster_type, &c.spec.cluster_type)
            && matches(&self.phase, &c.status.phase)
            && matches(&self.vpc_id, &c.spec.host_network.vpc_id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct NodeFilter {
    pub node_id: Option<String>,
    pub name: Option<String>,
    pub flavor: Option<String>,
    pub az: Option<String>,
    pub phase: Option<String>,
}

impl NodeFilter {
    pub fn matches(&self, n: &Node) -> bool {
        matches(&self.node_id, &n.metadata.id)
            && matches(&self.name, &n.metadata.name)
            && matches(&self.flavor, &n.spec.flavor)
            && matches(&self.az, &n.spec.az)
            && matches(&self.phase, &n.status.phase)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResourceFilter {
    pub name: Option<String>,
    pub logical_id: Option<String>,
    pub physical_id: Option<String>,
    pub status: Option<String>,
    pub resource_type: Option<String>,
}

impl ResourceFilter {
    pub fn matches(&self, r: &StackResource) -> bool {
        matches(&self.name, &r.name)
            && matches(&self.logical_id, &r.logical_id)
            && matches(&self.physical_id, &r.physical_id)
            && matches(&self.status, &r.status)
            && matches(&self.resource_type, &r.resource_type)
    }
}

pub async fn find_cluster(api: &dyn CceApi, filter: &ClusterFilter) -> Result<Cluster> {
    let clusters: Vec<Cluster> = api
        .list_clusters()
        .await?
        .into_iter()
        .filter(|c| filter.matches(c))
        .collect();
    debug!("{} clusters match {:?}", clusters.len(), filter);
    Ok(single(clusters)?)
}

pub async fn find_node(api: &dyn CceApi, cluster_id: &str, filter: &NodeFilter) -> Result<Node> {
    let nodes: Vec<Node> = api
        .list_nodes(cluster_id)
        .await?
        .into_iter()
        .filter(|n| filter.matches(n))
        .collect();
    debug!("{} nodes in cluster {} match {:?}", nodes.len(), cluster_id, filter);
    Ok(single(nodes)?)
}

pub async fn find_stack_resource(
    api: &dyn StackApi,
    stack_name: &str,
    stack_id: &str,
    filter: &ResourceFilter,
) -> Result<StackResource> {
    let resources: Vec<StackResource> = api
        .list_stack_resources(stack_name, stack_id)
        .await?
        .into_iter()
        .filter(|r| filter.matches(r))
        .collect();
    debug!(
        "{} resources of stack {} match {:?}",
        resources.len(),
        stack_name,
        filter
    );
    Ok(single(resources)?)
}

/// Stacks are read directly; `id` may be empty to match by name only.
pub async fn find_stack(api: &dyn StackApi, name: &str, id: &str) -> Result<Stack> {
    if !id.is_empty() {
        return api.get_stack(name, id).await;
    }
    let stacks: Vec<Stack> = api
        .list_stacks()
        .await?
        .into_iter()
        .filter(|s| s.name == name)
        .collect();
    Ok(single(stacks)?)
}
