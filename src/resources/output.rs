//! Published stack outputs.

use serde::Serialize;
use serde_json::Value;

use super::registry::Registry;
use crate::error::{Error, Result};

/// Name of the registry URI output
pub const REGISTRY_URI_OUTPUT: &str = "ECRRepoUri";
/// Default description of the registry URI output
pub const REGISTRY_URI_DESCRIPTION: &str = "ECR Repository URI";

/// A named, read-only value sourced from another resource's attribute
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackOutput {
    /// Output name, unique within the stack
    pub name: String,
    /// Attribute token the value is read from
    pub value: Value,
    /// Human-readable description
    pub description: String,
    /// Logical id of the source resource
    #[serde(skip)]
    pub source: String,
}

impl StackOutput {
    pub fn new(
        name: impl Into<String>,
        source: impl Into<String>,
        value: Value,
        description: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        let description = description.into();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::configuration(
                format!("Output '{}'", name),
                "output names must be non-empty and alphanumeric",
            ));
        }
        if description.trim().is_empty() {
            return Err(Error::configuration(
                format!("Output '{}'", name),
                "output description must not be empty",
            ));
        }
        Ok(Self {
            name,
            value,
            description,
            source: source.into(),
        })
    }

    /// The registry URI output
    pub fn registry_uri(registry: &Registry, description: Option<&str>) -> Result<Self> {
        Self::new(
            REGISTRY_URI_OUTPUT,
            &registry.logical_id,
            registry.uri(),
            description.unwrap_or(REGISTRY_URI_DESCRIPTION),
        )
    }

    /// Render the template entry
    pub fn to_template(&self) -> Value {
        serde_json::json!({
            "Value": self.value,
            "Description": self.description,
        })
    }
}
