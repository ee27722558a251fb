//! reqwest-backed client for the RTS and CCE REST APIs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::types::{
    Cluster, ClusterUpdateOpts, CreatedStack, Node, NodeUpdateOpts, Stack, StackCreateOpts,
    StackResource, StackUpdateOpts,
};
use super::{CceApi, StackApi};
use crate::config::ApiConfig;
use crate::error::{ApiError, Result};

const AUTH_HEADER: &str = "X-Auth-Token";

#[derive(Deserialize)]
struct StackEnvelope<T> {
    stack: T,
}

#[derive(Deserialize)]
struct StacksEnvelope {
    stacks: Vec<Stack>,
}

#[derive(Deserialize)]
struct ResourcesEnvelope {
    resources: Vec<StackResource>,
}

#[derive(Deserialize)]
struct ItemsEnvelope<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

/// Shared client handle. Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    orchestration: String,
    cce: String,
    project_id: String,
    token: String,
}

impl HttpClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            orchestration: config.orchestration_endpoint().trim_end_matches('/').to_string(),
            cce: config.cce_endpoint().trim_end_matches('/').to_string(),
            project_id: config.project_id.clone(),
            token: config.token.clone(),
        })
    }

    fn stacks_url(&self) -> String {
        format!("{}/stacks", self.orchestration)
    }

    fn stack_url(&self, name: &str, id: &str) -> String {
        format!("{}/stacks/{}/{}", self.orchestration, name, id)
    }

    fn stack_resources_url(&self, name: &str, id: &str) -> String {
        format!("{}/resources", self.stack_url(name, id))
    }

    fn clusters_url(&self) -> String {
        format!("{}/api/v3/projects/{}/clusters", self.cce, self.project_id)
    }

    fn cluster_url(&self, id: &str) -> String {
        format!("{}/{}", self.clusters_url(), id)
    }

    fn nodes_url(&self, cluster_id: &str) -> String {
        format!("{}/nodes", self.cluster_url(cluster_id))
    }

    fn node_url(&self, cluster_id: &str, node_id: &str) -> String {
        format!("{}/{}", self.nodes_url(cluster_id), node_id)
    }

    /// Send a request and map error statuses onto [`ApiError`].
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.header(AUTH_HEADER, &self.token).send().await?;
        let status = response.status();
        debug!("{} {}", status.as_u16(), response.url());

        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::NOT_FOUND => ApiError::NotFound(url),
            StatusCode::CONFLICT => ApiError::Conflict(if body.is_empty() { url } else { body }),
            _ => ApiError::Status {
                status: status.as_u16(),
                body,
            },
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T> {
        Ok(self.send(self.http.get(url)).await?.json().await?)
    }
}

#[async_trait]
impl StackApi for HttpClient {
    async fn create_stack(&self, opts: &StackCreateOpts) -> Result<CreatedStack> {
        let response = self.send(self.http.post(self.stacks_url()).json(opts)).await?;
        let envelope: StackEnvelope<CreatedStack> = response.json().await?;
        Ok(envelope.stack)
    }

    async fn get_stack(&self, name: &str, id: &str) -> Result<Stack> {
        let envelope: StackEnvelope<Stack> = self.get_json(self.stack_url(name, id)).await?;
        Ok(envelope.stack)
    }

    async fn update_stack(&self, name: &str, id: &str, opts: &StackUpdateOpts) -> Result<()> {
        self.send(self.http.put(self.stack_url(name, id)).json(opts)).await?;
        Ok(())
    }

    async fn delete_stack(&self, name: &str, id: &str) -> Result<()> {
        self.send(self.http.delete(self.stack_url(name, id))).await?;
        Ok(())
    }

    async fn list_stacks(&self) -> Result<Vec<Stack>> {
        let envelope: StacksEnvelope = self.get_json(self.stacks_url()).await?;
        Ok(envelope.stacks)
    }

    async fn list_stack_resources(&self, name: &str, id: &str) -> Result<Vec<StackResource>> {
        let envelope: ResourcesEnvelope =
            self.get_json(self.stack_resources_url(name, id)).await?;
        Ok(envelope.resources)
    }
}

#[async_trait]
impl CceApi for HttpClient {
    async fn create_cluster(&self, cluster: &Cluster) -> Result<Cluster> {
        let response = self.send(self.http.post(self.clusters_url()).json(cluster)).await?;
        Ok(response.json().await?)
    }

    async fn get_cluster(&self, id: &str) -> Result<Cluster> {
        self.get_json(self.cluster_url(id)).await
    }

    async fn update_cluster(&self, id: &str, opts: &ClusterUpdateOpts) -> Result<Cluster> {
        let response = self.send(self.http.put(self.cluster_url(id)).json(opts)).await?;
        Ok(response.json().await?)
    }

    async fn delete_cluster(&self, id: &str) -> Result<()> {
        self.send(self.http.delete(self.cluster_url(id))).await?;
        Ok(())
    }

    async fn list_clusters(&self) -> Result<Vec<Cluster>> {
        let envelope: ItemsEnvelope<Cluster> = self.get_json(self.clusters_url()).await?;
        Ok(envelope.items)
    }

    async fn create_node(&self, cluster_id: &str, node: &Node) -> Result<Node> {
        let response = self.send(self.http.post(self.nodes_url(cluster_id)).json(node)).await?;
        Ok(response.json().await?)
    }

    async fn get_node(&self, cluster_id: &str, node_id: &str) -> Result<Node> {
        self.get_json(self.node_url(cluster_id, node_id)).await
    }

    async fn update_node(
        &self,
        cluster_id: &str,
        node_id: &str,
        opts: &NodeUpdateOpts,
    ) -> Result<Node> {
        let response = self
            .send(self.http.put(self.node_url(cluster_id, node_id)).json(opts))
            .await?;
        Ok(response.json().await?)
    }

    async fn delete_node(&self, cluster_id: &str, node_id: &str) -> Result<()> {
        self.send(self.http.delete(self.node_url(cluster_id, node_id))).await?;
        Ok(())
    }

    async fn list_nodes(&self, cluster_id: &str) -> Result<Vec<Node>> {
        let envelope: ItemsEnvelope<Node> = self.get_json(self.nodes_url(cluster_id)).await?;
        Ok(envelope.items)
    }
}
