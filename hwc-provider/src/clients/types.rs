//! Resource representations exchanged with the RTS and CCE APIs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Status and reason string of a remote resource, used in user-facing errors.
pub trait StatusReport {
    fn status(&self) -> &str;
    fn reason(&self) -> Option<&str>;
}

// =============================================================================
// RTS stacks
// =============================================================================

/// Orchestration stack as returned by `GET /stacks/{name}/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stack {
    pub id: String,
    #[serde(rename = "stack_name")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "stack_status", default)]
    pub status: String,
    #[serde(rename = "stack_status_reason", default)]
    pub status_reason: String,
    #[serde(default)]
    pub parameters: HashMap<String, String>,
    #[serde(default)]
    pub outputs: Vec<StackOutput>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub notification_topics: Vec<String>,
    #[serde(default)]
    pub timeout_mins: Option<u32>,
    #[serde(default)]
    pub disable_rollback: bool,
    #[serde(default)]
    pub creation_time: Option<String>,
    #[serde(default)]
    pub updated_time: Option<String>,
}

impl Stack {
    /// Outputs flattened to `key -> value`.
    pub fn output_map(&self) -> HashMap<String, serde_json::Value> {
        self.outputs
            .iter()
            .map(|o| (o.output_key.clone(), o.output_value.clone()))
            .collect()
    }

    /// Parsed creation time. RTS omits the offset, UTC is assumed.
    pub fn created_at(&self) -> Option<chrono::NaiveDateTime> {
        self.creation_time
            .as_deref()
            .and_then(|t| chrono::NaiveDateTime::parse_from_str(t, "%Y-%m-%dT%H:%M:%S").ok())
    }
}

impl StatusReport for Stack {
    fn status(&self) -> &str {
        &self.status
    }

    fn reason(&self) -> Option<&str> {
        Some(self.status_reason.as_str()).filter(|r| !r.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StackOutput {
    pub output_key: String,
    #[serde(default)]
    pub output_value: serde_json::Value,
    #[serde(default)]
    pub description: String,
}

/// Response to a stack creation; only the identifier is returned.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedStack {
    pub id: String,
}

/// Template source for stack create/update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateOpts {
    #[serde(rename = "template", skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    #[serde(rename = "template_url", skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "HashMap::is_empty", default)]
    pub files: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StackCreateOpts {
    #[serde(rename = "stack_name")]
    pub name: String,
    #[serde(flatten)]
    pub template: TemplateOpts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "HashMap::is_empty", default)]
    pub parameters: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_mins: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_rollback: Option<bool>,
}

/// Only the fields that are set get sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StackUpdateOpts {
    #[serde(flatten)]
    pub template: TemplateOpts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_mins: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_rollback: Option<bool>,
}

/// A resource managed by a stack.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StackResource {
    #[serde(rename = "resource_name")]
    pub name: String,
    #[serde(rename = "logical_resource_id", default)]
    pub logical_id: String,
    #[serde(rename = "physical_resource_id", default)]
    pub physical_id: String,
    #[serde(default)]
    pub required_by: Vec<String>,
    #[serde(rename = "resource_status", default)]
    pub status: String,
    #[serde(rename = "resource_status_reason", default)]
    pub status_reason: String,
    #[serde(rename = "resource_type", default)]
    pub resource_type: String,
}

impl StatusReport for StackResource {
    fn status(&self) -> &str {
        &self.status
    }

    fn reason(&self) -> Option<&str> {
        Some(self.status_reason.as_str()).filter(|r| !r.is_empty())
    }
}

// =============================================================================
// CCE clusters
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    #[serde(default = "cluster_kind")]
    pub kind: String,
    #[serde(default = "api_v3")]
    pub api_version: String,
    pub metadata: Metadata,
    pub spec: ClusterSpec,
    #[serde(default)]
    pub status: ClusterStatus,
}

impl StatusReport for Cluster {
    fn status(&self) -> &str {
        &self.status.phase
    }

    fn reason(&self) -> Option<&str> {
        self.status.reason.as_deref()
    }
}

/// Object metadata shared by clusters and nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "uid", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub annotations: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    #[serde(rename = "type", default)]
    pub cluster_type: String,
    #[serde(default)]
    pub flavor: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub billing_mode: i32,
    #[serde(default)]
    pub host_network: HostNetwork,
    #[serde(default)]
    pub container_network: ContainerNetwork,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostNetwork {
    #[serde(rename = "vpc", default)]
    pub vpc_id: String,
    #[serde(rename = "subnet", default)]
    pub subnet_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub highway_subnet: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerNetwork {
    #[serde(default)]
    pub mode: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cidr: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterStatus {
    #[serde(default)]
    pub phase: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub endpoints: Endpoints,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Endpoints {
    #[serde(default)]
    pub internal: String,
    #[serde(default)]
    pub external: String,
}

/// Only the description of a cluster can be changed in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterUpdateOpts {
    pub spec: ClusterUpdateSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterUpdateSpec {
    pub description: String,
}

// =============================================================================
// CCE nodes
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    #[serde(default = "node_kind")]
    pub kind: String,
    #[serde(default = "api_v3")]
    pub api_version: String,
    pub metadata: Metadata,
    pub spec: NodeSpec,
    #[serde(default)]
    pub status: NodeStatus,
}

impl StatusReport for Node {
    fn status(&self) -> &str {
        &self.status.phase
    }

    fn reason(&self) -> Option<&str> {
        self.status.reason.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSpec {
    pub flavor: String,
    pub az: String,
    #[serde(default)]
    pub login: Login,
    #[serde(default)]
    pub root_volume: Volume,
    #[serde(default)]
    pub data_volumes: Vec<Volume>,
    #[serde(rename = "publicIP", default)]
    pub public_ip: PublicIp,
    #[serde(default)]
    pub billing_mode: i32,
    #[serde(default)]
    pub count: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub extend_param: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Login {
    #[serde(rename = "sshKey", default)]
    pub ssh_key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub size: u32,
    #[serde(rename = "volumetype")]
    pub volume_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub extend_param: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublicIp {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<String>,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub eip: Eip,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Eip {
    #[serde(rename = "iptype", default)]
    pub ip_type: String,
    #[serde(default)]
    pub bandwidth: Bandwidth,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bandwidth {
    #[serde(rename = "chargemode", default)]
    pub charge_mode: String,
    #[serde(default)]
    pub size: u32,
    #[serde(rename = "sharetype", default)]
    pub share_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStatus {
    #[serde(default)]
    pub phase: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub server_id: String,
    #[serde(rename = "privateIP", default)]
    pub private_ip: String,
    #[serde(rename = "publicIP", default)]
    pub public_ip: String,
}

/// Only the node name can be changed in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeUpdateOpts {
    pub metadata: NodeUpdateMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeUpdateMetadata {
    pub name: String,
}

fn cluster_kind() -> String {
    "Cluster".to_string()
}

fn node_kind() -> String {
    "Node".to_string()
}

fn api_v3() -> String {
    "v3".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_from_rts_json() {
        let body = serde_json::json!({
            "id": "3095aefc-09fb-4bc7-b1f0-f21a304e864c",
            "stack_name": "web",
            "stack_status": "CREATE_FAILED",
            "stack_status_reason": "Resource CREATE failed: quota exceeded",
            "outputs": [{"output_key": "ip", "output_value": "192.168.0.10"}],
            "disable_rollback": true,
            "creation_time": "2018-04-13T08:12:44"
        });

        let stack: Stack = serde_json::from_value(body).unwrap();
        assert_eq!(stack.name, "web");
        assert_eq!(stack.status(), "CREATE_FAILED");
        assert_eq!(stack.reason(), Some("Resource CREATE failed: quota exceeded"));
        assert_eq!(stack.output_map()["ip"], "192.168.0.10");
        assert!(stack.created_at().is_some());
    }

    #[test]
    fn empty_reason_is_none() {
        let stack = Stack {
            status: "CREATE_COMPLETE".into(),
            ..Default::default()
        };
        assert_eq!(stack.reason(), None);
    }

    #[test]
    fn cluster_from_cce_json() {
        let body = serde_json::json!({
            "kind": "Cluster",
            "apiVersion": "v3",
            "metadata": {"name": "cce-1", "uid": "4e8e5957-649f-11e8-b6a8-0255ac101111"},
            "spec": {
                "type": "VirtualMachine",
                "flavor": "cce.s1.small",
                "version": "v1.7.3-r10",
                "hostNetwork": {"vpc": "vpc-1", "subnet": "subnet-1"},
                "containerNetwork": {"mode": "overlay_l2"}
            },
            "status": {"phase": "Available", "endpoints": {"internal": "https://10.0.0.5:5443"}}
        });

        let cluster: Cluster = serde_json::from_value(body).unwrap();
        assert_eq!(cluster.metadata.id, "4e8e5957-649f-11e8-b6a8-0255ac101111");
        assert_eq!(cluster.spec.host_network.vpc_id, "vpc-1");
        assert_eq!(cluster.spec.container_network.mode, "overlay_l2");
        assert_eq!(cluster.status(), "Available");
        assert_eq!(cluster.status.endpoints.internal, "https://10.0.0.5:5443");
    }

    #[test]
    fn stack_create_opts_wire_names() {
        let opts = StackCreateOpts {
            name: "web".into(),
            template: TemplateOpts {
                url: Some("https://example.com/web.yaml".into()),
                ..Default::default()
            },
            timeout_mins: Some(60),
            disable_rollback: Some(false),
            ..Default::default()
        };

        let json = serde_json::to_value(&opts).unwrap();
        assert_eq!(json["stack_name"], "web");
        assert_eq!(json["template_url"], "https://example.com/web.yaml");
        assert_eq!(json["timeout_mins"], 60);
        assert!(json.get("template").is_none());
        assert!(json.get("parameters").is_none());
    }
}
