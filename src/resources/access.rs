//! Cluster access bindings.
//!
//! Maps external identities to in-cluster privilege groups. All bindings are
//! aggregated into the cluster's authentication config map. Binding an
//! identity again adds groups; it never removes earlier ones.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::cluster::Cluster;
use super::{Resource, ResourceKind};
use crate::context::ExecutionContext;
use crate::error::{Error, Result};

/// Logical id of the aggregated access mapping
pub const ACCESS_MAPPING_ID: &str = "AwsAuth";

const ENTITY: &str = "AccessBinder";

/// One identity mapped to one or more groups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessBinding {
    /// Account-scoped user name
    pub identity: String,
    /// In-cluster privilege groups
    pub groups: Vec<String>,
}

impl AccessBinding {
    pub fn new<I, S>(identity: impl Into<String>, groups: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let identity = identity.into().trim().to_string();
        if identity.is_empty() {
            return Err(Error::configuration(ENTITY, "access identity must not be empty"));
        }

        let mut ordered: Vec<String> = Vec::new();
        for group in groups {
            let group = group.into().trim().to_string();
            if group.is_empty() {
                return Err(Error::configuration(
                    format!("{} '{}'", ENTITY, identity),
                    "group names must not be empty",
                ));
            }
            if !ordered.contains(&group) {
                ordered.push(group);
            }
        }

        if ordered.is_empty() {
            return Err(Error::configuration(
                format!("{} '{}'", ENTITY, identity),
                "at least one group is required",
            ));
        }

        Ok(Self {
            identity,
            groups: ordered,
        })
    }
}

/// Accumulates bindings for one cluster
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessBinder {
    bindings: IndexMap<String, Vec<String>>,
}

impl AccessBinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding; groups of an already bound identity are unioned.
    pub fn bind(&mut self, binding: AccessBinding) {
        let groups = self.bindings.entry(binding.identity.clone()).or_default();
        for group in binding.groups {
            if !groups.contains(&group) {
                groups.push(group);
            }
        }
        debug!(identity = %binding.identity, groups = ?groups, "Bound identity");
    }

    /// Current bindings, in first-bound order
    pub fn bindings(&self) -> Vec<AccessBinding> {
        self.bindings
            .iter()
            .map(|(identity, groups)| AccessBinding {
                identity: identity.clone(),
                groups: groups.clone(),
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Render the authentication mapping for `cluster`.
    ///
    /// Returns `None` without bindings: only the deploying identity has
    /// access then.
    pub fn to_resource(&self, cluster: &Cluster, context: &ExecutionContext) -> Option<Resource> {
        if self.bindings.is_empty() {
            info!(
                cluster = %cluster.name,
                "No access bindings; only {} can reach the cluster",
                context.deploying_identity()
            );
            return None;
        }

        let map_users: Vec<serde_json::Value> = self
            .bindings
            .iter()
            .map(|(identity, groups)| {
                serde_json::json!({
                    "userarn": context.user_arn(identity),
                    "username": identity,
                    "groups": groups,
                })
            })
            .collect();

        Some(
            Resource::new(ACCESS_MAPPING_ID, ResourceKind::AccessMapping).with_properties(
                serde_json::json!({
                    "ClusterName": cluster.name_ref(),
                    "Manifest": [{
                        "apiVersion": "v1",
                        "kind": "ConfigMap",
                        "metadata": { "name": "aws-auth", "namespace": "kube-system" },
                        "data": { "mapUsers": map_users },
                    }],
                    "Overwrite": true,
                }),
            ),
        )
    }
}
