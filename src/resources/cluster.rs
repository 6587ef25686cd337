//! Managed Kubernetes cluster.
//!
//! The cluster is bound to the selected subnets and a platform version. When
//! the engine's bundled kubectl cannot manage that version, a kubectl layer
//! for exactly that version has to be declared and bound, otherwise the
//! declaration fails with [`Error::MissingCompatibilityLayer`].
//!
//! Default capacity becomes a managed node group running as the worker
//! identity.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::identity::{cluster_role, ServiceRole};
use super::network::SubnetSelection;
use super::{attribute, reference, Resource, ResourceKind, WorkerIdentity};
use crate::error::{Error, Result};

/// Logical id of the cluster
pub const CLUSTER_ID: &str = "EKSCluster";
/// Logical id of the kubectl layer
pub const LAYER_ID: &str = "KubectlLayer";
/// Logical id of the default capacity node group
pub const NODE_GROUP_ID: &str = "DefaultCapacity";
/// Bucket the kubectl layer archives are published to
pub const LAYER_ASSET_BUCKET: &str = "cdk-assets-${AWS::AccountId}-${AWS::Region}";

/// Worker count when none is configured
pub const DEFAULT_CAPACITY: u32 = 2;
/// Largest default capacity accepted
pub const MAX_DEFAULT_CAPACITY: u32 = 100;
/// Instance type when none is configured
pub const DEFAULT_INSTANCE_TYPE: &str = "m5.large";

static CLUSTER_NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9A-Za-z][A-Za-z0-9_-]{0,99}$").expect("Invalid cluster name regex")
});

/// Supported Kubernetes minor versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PlatformVersion {
    V1_23,
    V1_24,
    V1_25,
    V1_26,
    V1_27,
    V1_28,
    V1_29,
    V1_30,
    V1_31,
}

impl PlatformVersion {
    /// All supported versions, oldest first
    pub const ALL: [PlatformVersion; 9] = [
        PlatformVersion::V1_23,
        PlatformVersion::V1_24,
        PlatformVersion::V1_25,
        PlatformVersion::V1_26,
        PlatformVersion::V1_27,
        PlatformVersion::V1_28,
        PlatformVersion::V1_29,
        PlatformVersion::V1_30,
        PlatformVersion::V1_31,
    ];

    /// Minor version number
    pub fn minor(&self) -> u32 {
        match self {
            PlatformVersion::V1_23 => 23,
            PlatformVersion::V1_24 => 24,
            PlatformVersion::V1_25 => 25,
            PlatformVersion::V1_26 => 26,
            PlatformVersion::V1_27 => 27,
            PlatformVersion::V1_28 => 28,
            PlatformVersion::V1_29 => 29,
            PlatformVersion::V1_30 => 30,
            PlatformVersion::V1_31 => 31,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformVersion::V1_23 => "1.23",
            PlatformVersion::V1_24 => "1.24",
            PlatformVersion::V1_25 => "1.25",
            PlatformVersion::V1_26 => "1.26",
            PlatformVersion::V1_27 => "1.27",
            PlatformVersion::V1_28 => "1.28",
            PlatformVersion::V1_29 => "1.29",
            PlatformVersion::V1_30 => "1.30",
            PlatformVersion::V1_31 => "1.31",
        }
    }
}

impl fmt::Display for PlatformVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PlatformVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let normalized = trimmed.strip_prefix('v').unwrap_or(trimmed);
        PlatformVersion::ALL
            .iter()
            .copied()
            .find(|v| v.as_str() == normalized)
            .ok_or_else(|| {
                let supported: Vec<&str> = PlatformVersion::ALL.iter().map(|v| v.as_str()).collect();
                Error::configuration(
                    "PlatformVersion",
                    format!(
                        "unsupported platform version '{}'. Supported: {}",
                        s,
                        supported.join(", ")
                    ),
                )
            })
    }
}

impl TryFrom<String> for PlatformVersion {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<PlatformVersion> for String {
    fn from(version: PlatformVersion) -> Self {
        version.as_str().to_string()
    }
}

/// Which platform versions the engine's built-in tooling manages natively.
///
/// The engine bundles one kubectl release; kubectl supports control planes
/// within `skew` minor versions of itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSupport {
    bundled: PlatformVersion,
    skew: u32,
}

impl Default for EngineSupport {
    fn default() -> Self {
        Self {
            bundled: PlatformVersion::V1_30,
            skew: 1,
        }
    }
}

impl EngineSupport {
    pub fn new(bundled: PlatformVersion) -> Self {
        Self {
            bundled,
            ..Self::default()
        }
    }

    /// Set the supported version skew
    pub fn with_skew(mut self, skew: u32) -> Self {
        self.skew = skew;
        self
    }

    /// Bundled tooling version
    pub fn bundled(&self) -> PlatformVersion {
        self.bundled
    }

    /// Whether `version` is managed without a compatibility layer
    pub fn supports(&self, version: PlatformVersion) -> bool {
        version.minor().abs_diff(self.bundled.minor()) <= self.skew
    }

    /// Natively supported versions, oldest first
    pub fn native_versions(&self) -> Vec<PlatformVersion> {
        PlatformVersion::ALL
            .iter()
            .copied()
            .filter(|v| self.supports(*v))
            .collect()
    }
}

/// Version-matched kubectl layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompatibilityLayer {
    /// kubectl version shipped in the layer
    pub version: PlatformVersion,
}

impl CompatibilityLayer {
    pub fn new(version: PlatformVersion) -> Self {
        Self { version }
    }

    /// Layer ARN (`Ref` of a layer version)
    pub fn arn(&self) -> Value {
        reference(LAYER_ID)
    }

    pub fn to_resource(&self) -> Resource {
        Resource::new(LAYER_ID, ResourceKind::CompatibilityLayer).with_properties(serde_json::json!({
            "Content": {
                "S3Bucket": { "Fn::Sub": LAYER_ASSET_BUCKET },
                "S3Key": format!("kubectl-v{}.zip", self.version),
            },
            "Description": format!("/opt/kubectl/kubectl {}", self.version),
            "LicenseInfo": "Apache-2.0",
        }))
    }
}

/// Inputs of the cluster provisioner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterSpec {
    /// Cluster name, unique within the account/region
    pub name: String,
    /// Platform version
    pub version: PlatformVersion,
    /// Worker count of the default node group; 0 disables it
    pub default_capacity: u32,
    /// Instance type of the default node group
    pub instance_type: String,
    /// Compatibility layer version, when one is declared
    pub compatibility_layer: Option<PlatformVersion>,
}

impl ClusterSpec {
    pub fn new(name: impl Into<String>, version: PlatformVersion) -> Self {
        Self {
            name: name.into(),
            version,
            default_capacity: DEFAULT_CAPACITY,
            instance_type: DEFAULT_INSTANCE_TYPE.to_string(),
            compatibility_layer: None,
        }
    }

    pub fn with_default_capacity(mut self, capacity: u32) -> Self {
        self.default_capacity = capacity;
        self
    }

    pub fn with_compatibility_layer(mut self, version: PlatformVersion) -> Self {
        self.compatibility_layer = Some(version);
        self
    }

    pub fn with_instance_type(mut self, instance_type: impl Into<String>) -> Self {
        self.instance_type = instance_type.into();
        self
    }
}

/// The cluster resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    /// Logical id in the resource graph
    pub logical_id: String,
    /// Cluster name
    pub name: String,
    /// Platform version
    pub version: PlatformVersion,
    /// Logical id of the network the cluster lives in
    pub network_id: String,
    /// Subnets the control plane may use; empty means unrestricted
    pub subnet_ids: Vec<String>,
    /// Bound compatibility layer
    pub layer: Option<CompatibilityLayer>,
    /// Logical id of the control plane role
    pub role_id: String,
}

impl Cluster {
    /// Cluster security group attribute, shared by every managed interface
    pub fn security_group(&self) -> Value {
        attribute(&self.logical_id, "ClusterSecurityGroupId")
    }

    /// Cluster name token
    pub fn name_ref(&self) -> Value {
        reference(&self.logical_id)
    }

    pub fn to_resource(&self) -> Resource {
        let mut vpc_config = serde_json::json!({});
        if !self.subnet_ids.is_empty() {
            vpc_config["SubnetIds"] = serde_json::json!(self.subnet_ids);
        }

        let mut properties = serde_json::json!({
            "Name": self.name,
            "Version": self.version.as_str(),
            "RoleArn": attribute(&self.role_id, "Arn"),
            "ResourcesVpcConfig": vpc_config,
        });
        if let Some(layer) = &self.layer {
            properties["KubectlLayerArn"] = layer.arn();
        }

        Resource::new(&self.logical_id, ResourceKind::Cluster)
            .with_properties(properties)
            .with_dependency(&self.network_id)
    }
}

/// Default capacity node group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeGroup {
    /// Logical id in the resource graph
    pub logical_id: String,
    /// Desired (and minimum) worker count
    pub capacity: u32,
    /// Instance type
    pub instance_type: String,
    /// Subnets the workers are placed in
    pub subnet_ids: Vec<String>,
}

impl NodeGroup {
    pub fn to_resource(&self, cluster: &Cluster, worker: &WorkerIdentity) -> Resource {
        let mut properties = serde_json::json!({
            "ClusterName": cluster.name_ref(),
            "NodeRole": worker.arn(),
            "InstanceTypes": [self.instance_type],
            "ScalingConfig": {
                "MinSize": self.capacity,
                "DesiredSize": self.capacity,
                "MaxSize": self.capacity,
            },
        });
        if !self.subnet_ids.is_empty() {
            properties["Subnets"] = serde_json::json!(self.subnet_ids);
        }
        Resource::new(&self.logical_id, ResourceKind::NodeGroup).with_properties(properties)
    }
}

/// Everything the cluster provisioner declares
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterDeclaration {
    pub cluster: Cluster,
    pub cluster_role: ServiceRole,
    pub layer: Option<CompatibilityLayer>,
    pub node_group: Option<NodeGroup>,
}

impl ClusterDeclaration {
    /// Render every declared resource. The worker identity is bound to the
    /// node group; it is rendered by its own provisioner.
    pub fn to_resources(&self, worker: &WorkerIdentity, partition: &str) -> Vec<Resource> {
        let mut resources = Vec::new();
        if let Some(layer) = &self.layer {
            resources.push(layer.to_resource());
        }
        resources.push(self.cluster_role.to_resource(partition));
        resources.push(self.cluster.to_resource());
        if let Some(node_group) = &self.node_group {
            resources.push(node_group.to_resource(&self.cluster, worker));
        }
        resources
    }

    /// Whether the worker identity ends up attached to any nodes
    pub fn binds_worker_identity(&self) -> bool {
        self.node_group.is_some()
    }
}

/// Declare the cluster, its control plane role, the optional kubectl layer
/// and the default capacity node group.
pub fn declare_cluster(
    spec: &ClusterSpec,
    network: &SubnetSelection,
    support: &EngineSupport,
) -> Result<ClusterDeclaration> {
    let entity = format!("Cluster '{}'", spec.name);

    if !CLUSTER_NAME_REGEX.is_match(&spec.name) {
        return Err(Error::configuration(
            entity,
            "cluster name must be 1-100 characters, start with an alphanumeric and contain only alphanumerics, '-' or '_'",
        ));
    }

    if spec.default_capacity > MAX_DEFAULT_CAPACITY {
        return Err(Error::configuration(
            entity,
            format!(
                "default capacity {} exceeds the maximum of {}",
                spec.default_capacity, MAX_DEFAULT_CAPACITY
            ),
        ));
    }

    if spec.default_capacity > 0 && spec.instance_type.trim().is_empty() {
        return Err(Error::configuration(entity, "instance type must not be empty"));
    }

    let layer = match (support.supports(spec.version), spec.compatibility_layer) {
        (_, Some(layer)) if layer != spec.version => {
            return Err(Error::configuration(
                entity,
                format!(
                    "compatibility layer {} does not match platform version {}",
                    layer, spec.version
                ),
            ));
        }
        (false, None) => {
            return Err(Error::MissingCompatibilityLayer {
                cluster: spec.name.clone(),
                version: spec.version.to_string(),
            });
        }
        (_, Some(layer)) => Some(CompatibilityLayer::new(layer)),
        (true, None) => None,
    };

    if let Some(layer) = &layer {
        debug!(version = %layer.version, "Binding kubectl compatibility layer");
    }

    let role = cluster_role();
    let subnet_ids = network.subnet_ids();
    let cluster = Cluster {
        logical_id: CLUSTER_ID.to_string(),
        name: spec.name.clone(),
        version: spec.version,
        network_id: network.logical_id.clone(),
        subnet_ids: subnet_ids.clone(),
        layer,
        role_id: role.logical_id.clone(),
    };

    let node_group = (spec.default_capacity > 0).then(|| NodeGroup {
        logical_id: NODE_GROUP_ID.to_string(),
        capacity: spec.default_capacity,
        instance_type: spec.instance_type.clone(),
        subnet_ids,
    });

    info!(
        cluster = %spec.name,
        version = %spec.version,
        capacity = spec.default_capacity,
        layer = layer.is_some(),
        "Declared cluster"
    );

    Ok(ClusterDeclaration {
        cluster,
        cluster_role: role,
        layer,
        node_group,
    })
}
