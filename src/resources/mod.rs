//! Resource declarations for the cluster deployment unit.
//!
//! Each submodule declares one kind of infrastructure entity and knows how
//! to render itself into a [`Resource`]: a logical id, a resource type and a
//! property document. Cross-resource wiring is expressed with `Ref` and
//! `Fn::GetAtt` tokens inside the properties; the [`graph`](crate::graph)
//! module turns those tokens into dependency edges.
//!
//! ## Components
//!
//! - [`network`]: network lookup and availability-zone subnet filtering
//! - [`registry`]: container image registry
//! - [`identity`]: worker node and control-plane IAM roles
//! - [`cluster`]: managed cluster, platform versions, compatibility layer
//! - [`access`]: identity to in-cluster group mappings
//! - [`traffic`]: intra-cluster traffic rule
//! - [`output`]: published stack outputs

pub mod access;
#[cfg(feature = "aws")]
pub mod aws;
pub mod cluster;
pub mod identity;
pub mod network;
pub mod output;
pub mod registry;
pub mod traffic;

pub use access::{AccessBinder, AccessBinding};
#[cfg(feature = "aws")]
pub use aws::Ec2NetworkLookup;
pub use cluster::{
    declare_cluster, Cluster, ClusterDeclaration, ClusterSpec, CompatibilityLayer, EngineSupport,
    NodeGroup, PlatformVersion,
};
pub use identity::{ServiceRole, WorkerIdentity};
pub use network::{
    resolve_network, select_subnets, Network, NetworkLookup, NetworkSelection,
    StaticNetworkLookup, Subnet, SubnetSelection, ZoneAllowList,
};
pub use output::StackOutput;
pub use registry::Registry;
pub use traffic::TrafficPolicy;

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of a declared entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Existing virtual network, looked up rather than created
    Network,
    /// Version-matched kubectl layer
    CompatibilityLayer,
    /// IAM role (control plane or worker)
    Role,
    /// Managed Kubernetes cluster
    Cluster,
    /// Managed worker node group
    NodeGroup,
    /// Container image registry
    Registry,
    /// Cluster authentication mappings
    AccessMapping,
    /// Security group ingress rule
    TrafficPolicy,
}

impl ResourceKind {
    /// Resource type name understood by the provisioning engine
    pub fn resource_type(&self) -> &'static str {
        match self {
            ResourceKind::Network => "AWS::EC2::VPC",
            ResourceKind::CompatibilityLayer => "AWS::Lambda::LayerVersion",
            ResourceKind::Role => "AWS::IAM::Role",
            ResourceKind::Cluster => "AWS::EKS::Cluster",
            ResourceKind::NodeGroup => "AWS::EKS::Nodegroup",
            ResourceKind::Registry => "AWS::ECR::Repository",
            ResourceKind::AccessMapping => "Custom::AWSCDK-EKS-KubernetesResource",
            ResourceKind::TrafficPolicy => "AWS::EC2::SecurityGroupIngress",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Network => "network",
            ResourceKind::CompatibilityLayer => "compatibility_layer",
            ResourceKind::Role => "role",
            ResourceKind::Cluster => "cluster",
            ResourceKind::NodeGroup => "node_group",
            ResourceKind::Registry => "registry",
            ResourceKind::AccessMapping => "access_mapping",
            ResourceKind::TrafficPolicy => "traffic_policy",
        };
        write!(f, "{}", name)
    }
}

/// A declared resource, ready to be placed in the resource graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Logical id, unique within the stack
    pub id: String,
    /// Entity kind
    pub kind: ResourceKind,
    /// Property document
    pub properties: Value,
    /// Ordering edges that are not visible as property tokens
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    /// Existing infrastructure that is referenced but never emitted
    #[serde(default)]
    pub imported: bool,
}

impl Resource {
    /// Create a resource with an empty property document
    pub fn new(id: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            id: id.into(),
            kind,
            properties: Value::Object(serde_json::Map::new()),
            depends_on: Vec::new(),
            imported: false,
        }
    }

    /// Set the property document
    pub fn with_properties(mut self, properties: Value) -> Self {
        self.properties = properties;
        self
    }

    /// Add an explicit ordering dependency
    pub fn with_dependency(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        if !self.depends_on.contains(&id) {
            self.depends_on.push(id);
        }
        self
    }

    /// Mark the resource as imported
    pub fn imported(mut self) -> Self {
        self.imported = true;
        self
    }

    /// Resource type name
    pub fn resource_type(&self) -> &'static str {
        self.kind.resource_type()
    }

    /// Every logical id this resource depends on, from tokens and explicit edges
    pub fn references(&self) -> BTreeSet<String> {
        let mut refs = BTreeSet::new();
        collect_references(&self.properties, &mut refs);
        refs.extend(self.depends_on.iter().cloned());
        refs
    }
}

/// `{"Ref": id}` token
pub fn reference(id: &str) -> Value {
    serde_json::json!({ "Ref": id })
}

/// `{"Fn::GetAtt": [id, attribute]}` token
pub fn attribute(id: &str, attribute: &str) -> Value {
    serde_json::json!({ "Fn::GetAtt": [id, attribute] })
}

/// Walk a property document collecting the logical ids its tokens name.
///
/// Pseudo parameters (`AWS::AccountId` and friends) are not resources and
/// are skipped.
pub fn collect_references(value: &Value, refs: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(id)) = map.get("Ref") {
                if !id.starts_with("AWS::") {
                    refs.insert(id.clone());
                }
            }
            if let Some(Value::Array(parts)) = map.get("Fn::GetAtt") {
                if let Some(Value::String(id)) = parts.first() {
                    refs.insert(id.clone());
                }
            }
            for nested in map.values() {
                collect_references(nested, refs);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_references(item, refs);
            }
        }
        _ => {}
    }
}
