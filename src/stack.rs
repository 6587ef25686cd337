//! Stack file model.
//!
//! A stack file declares one deployment unit: the cluster, where it runs,
//! its registry, worker permissions and who may access it. Optional fields
//! are branched on exactly once, during synthesis.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::resources::cluster::{DEFAULT_CAPACITY, DEFAULT_INSTANCE_TYPE};
use crate::resources::output::REGISTRY_URI_DESCRIPTION;
use crate::resources::{NetworkSelection, PlatformVersion, ZoneAllowList};

/// Default stack name
pub const DEFAULT_STACK_NAME: &str = "InfrastructureStack";

/// Declared intents of one deployment unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StackConfig {
    /// Deployment unit name
    #[serde(default = "default_stack_name")]
    pub stack_name: String,
    pub cluster: ClusterConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    pub registry: RegistryConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub access: Vec<AccessConfig>,
    #[serde(default)]
    pub outputs: OutputsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterConfig {
    pub name: String,
    pub version: PlatformVersion,
    #[serde(default = "default_capacity")]
    pub default_capacity: u32,
    #[serde(default = "default_instance_type")]
    pub instance_type: String,
    /// kubectl layer version; must match `version`
    #[serde(default)]
    pub compatibility_layer: Option<PlatformVersion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkConfig {
    #[serde(default = "default_selection")]
    pub selection: NetworkSelection,
    /// Approved availability zones; all subnets are used when absent
    #[serde(default)]
    pub zones: Option<ZoneAllowList>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            selection: NetworkSelection::Default,
            zones: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerConfig {
    #[serde(default)]
    pub role_name: Option<String>,
    /// Grants attached after the required worker grants
    #[serde(default)]
    pub extra_grants: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessConfig {
    pub identity: String,
    pub groups: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputsConfig {
    #[serde(default = "default_registry_uri_description")]
    pub registry_uri_description: String,
}

impl Default for OutputsConfig {
    fn default() -> Self {
        Self {
            registry_uri_description: default_registry_uri_description(),
        }
    }
}

fn default_stack_name() -> String {
    DEFAULT_STACK_NAME.to_string()
}

fn default_capacity() -> u32 {
    DEFAULT_CAPACITY
}

fn default_instance_type() -> String {
    DEFAULT_INSTANCE_TYPE.to_string()
}

fn default_selection() -> NetworkSelection {
    NetworkSelection::Default
}

fn default_registry_uri_description() -> String {
    REGISTRY_URI_DESCRIPTION.to_string()
}

impl StackConfig {
    /// Load a stack file; the format follows the extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let extension = path.extension().and_then(|e| e.to_str());
        let stack = Self::parse(&content, extension).map_err(|message| Error::StackParse {
            path: path.to_path_buf(),
            message,
        })?;
        debug!(path = %path.display(), stack = %stack.stack_name, "Loaded stack file");
        Ok(stack)
    }

    fn parse(content: &str, extension: Option<&str>) -> std::result::Result<Self, String> {
        match extension {
            Some("yml") | Some("yaml") => serde_yaml::from_str(content).map_err(|e| e.to_string()),
            Some("json") => serde_json::from_str(content).map_err(|e| e.to_string()),
            Some("toml") => toml::from_str(content).map_err(|e| e.to_string()),
            _ => toml::from_str(content)
                .or_else(|_| serde_yaml::from_str(content))
                .map_err(|e| e.to_string()),
        }
    }

    /// Parse a YAML document
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Minimal stack used by `init`
    pub fn sample() -> Self {
        Self {
            stack_name: DEFAULT_STACK_NAME.to_string(),
            cluster: ClusterConfig {
                name: "eks-cluster".to_string(),
                version: PlatformVersion::V1_30,
                default_capacity: DEFAULT_CAPACITY,
                instance_type: DEFAULT_INSTANCE_TYPE.to_string(),
                compatibility_layer: None,
            },
            network: NetworkConfig::default(),
            registry: RegistryConfig {
                name: "ecr-repo".to_string(),
            },
            worker: WorkerConfig::default(),
            access: Vec::new(),
            outputs: OutputsConfig::default(),
        }
    }
}
