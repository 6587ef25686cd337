//! Container image registry.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use super::{attribute, Resource, ResourceKind};
use crate::error::{Error, Result};

/// Logical id of the registry
pub const REGISTRY_ID: &str = "ECRRepo";

/// Repository naming rule: lowercase components separated by `.`, `_`, `-` or `/`
static REGISTRY_NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[a-z0-9]+(?:[._-][a-z0-9]+)*/)*[a-z0-9]+(?:[._-][a-z0-9]+)*$")
        .expect("Invalid registry name regex")
});

/// A container image registry declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    /// Logical id in the resource graph
    pub logical_id: String,
    /// Repository name, unique within the account/region
    pub name: String,
}

impl Registry {
    /// Declare a registry. Collisions with existing repositories are only
    /// detectable by the provisioning engine.
    pub fn declare(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_registry_name(&name)?;
        debug!(registry = %name, "Declared registry");
        Ok(Self {
            logical_id: REGISTRY_ID.to_string(),
            name,
        })
    }

    /// URI attribute, available once provisioned
    pub fn uri(&self) -> Value {
        attribute(&self.logical_id, "RepositoryUri")
    }

    pub fn to_resource(&self) -> Resource {
        Resource::new(&self.logical_id, ResourceKind::Registry).with_properties(serde_json::json!({
            "RepositoryName": self.name,
        }))
    }
}

fn validate_registry_name(name: &str) -> Result<()> {
    let entity = format!("Registry '{}'", name);
    if name.len() < 2 || name.len() > 256 {
        return Err(Error::configuration(
            entity,
            "registry name must be between 2 and 256 characters",
        ));
    }
    if !REGISTRY_NAME_REGEX.is_match(name) {
        return Err(Error::configuration(
            entity,
            "registry name must be lowercase alphanumerics separated by '.', '_', '-' or '/'",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare_registry() {
        let registry = Registry::declare("ecr-repo").unwrap();
        assert_eq!(registry.logical_id, "ECRRepo");
        let resource = registry.to_resource();
        assert_eq!(resource.resource_type(), "AWS::ECR::Repository");
        assert_eq!(resource.properties["RepositoryName"], "ecr-repo");
    }

    #[test]
    fn test_uri_is_attribute_token() {
        let registry = Registry::declare("ecr-repo").unwrap();
        assert_eq!(
            registry.uri(),
            serde_json::json!({ "Fn::GetAtt": ["ECRRepo", "RepositoryUri"] })
        );
    }

    #[test]
    fn test_namespaced_names_are_valid() {
        assert!(Registry::declare("team/app.web").is_ok());
        assert!(Registry::declare("team_a/app-1").is_ok());
    }

    #[test]
    fn test_invalid_names() {
        for name in ["ECR-Repo", "a", "repo-", "-repo", "repo//x", "repo name"] {
            let err = Registry::declare(name).unwrap_err();
            assert!(
                matches!(err, Error::Configuration { .. }),
                "expected configuration error for {name}"
            );
        }
    }
}
