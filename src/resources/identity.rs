//! IAM roles for the cluster.
//!
//! The worker identity always carries the three grants a node needs to
//! bootstrap: node operation, read-only registry access and the network
//! plugin policy. Extra grants are appended after them.

use serde_json::Value;
use tracing::debug;

use super::{attribute, Resource, ResourceKind};
use crate::error::{Error, Result};

/// Logical id of the worker node role
pub const WORKER_ROLE_ID: &str = "WorkerNodeRole";
/// Logical id of the control plane service role
pub const CLUSTER_ROLE_ID: &str = "ClusterRole";

/// Node operation grant
pub const NODE_OPERATION_GRANT: &str = "AmazonEKSWorkerNodePolicy";
/// Registry read-only grant
pub const REGISTRY_READ_GRANT: &str = "AmazonEC2ContainerRegistryReadOnly";
/// Network plugin grant
pub const NETWORK_PLUGIN_GRANT: &str = "AmazonEKS_CNI_Policy";
/// Control plane grant
pub const CLUSTER_GRANT: &str = "AmazonEKSClusterPolicy";

/// Grants every worker identity must carry, in attachment order
pub const REQUIRED_WORKER_GRANTS: [&str; 3] =
    [NODE_OPERATION_GRANT, REGISTRY_READ_GRANT, NETWORK_PLUGIN_GRANT];

/// Compute-instance service principal
pub const EC2_PRINCIPAL: &str = "ec2.amazonaws.com";
/// Managed cluster service principal
pub const EKS_PRINCIPAL: &str = "eks.amazonaws.com";

/// An IAM role assumable by a service principal, with managed grants attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRole {
    /// Logical id in the resource graph
    pub logical_id: String,
    /// Explicit role name; generated by the engine when `None`
    pub role_name: Option<String>,
    /// Service principal trusted to assume the role
    pub principal: String,
    /// Managed grant names, in attachment order
    pub grants: Vec<String>,
}

impl ServiceRole {
    /// ARN attribute
    pub fn arn(&self) -> Value {
        attribute(&self.logical_id, "Arn")
    }

    /// Render as a role resource. Grant ARNs are built in `partition`.
    pub fn to_resource(&self, partition: &str) -> Resource {
        let policy_arns: Vec<String> = self
            .grants
            .iter()
            .map(|g| format!("arn:{}:iam::aws:policy/{}", partition, g))
            .collect();

        let mut properties = serde_json::json!({
            "AssumeRolePolicyDocument": {
                "Version": "2012-10-17",
                "Statement": [{
                    "Action": "sts:AssumeRole",
                    "Effect": "Allow",
                    "Principal": { "Service": self.principal },
                }],
            },
            "ManagedPolicyArns": policy_arns,
        });
        if let Some(name) = &self.role_name {
            properties["RoleName"] = Value::String(name.clone());
        }

        Resource::new(&self.logical_id, ResourceKind::Role).with_properties(properties)
    }
}

/// Service role for the cluster control plane
pub fn cluster_role() -> ServiceRole {
    ServiceRole {
        logical_id: CLUSTER_ROLE_ID.to_string(),
        role_name: None,
        principal: EKS_PRINCIPAL.to_string(),
        grants: vec![CLUSTER_GRANT.to_string()],
    }
}

/// Execution identity for worker nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerIdentity {
    role: ServiceRole,
}

impl WorkerIdentity {
    /// Declare the worker identity with the required grants followed by
    /// `extra_grants`. Duplicates are dropped, first occurrence wins.
    pub fn declare<S: AsRef<str>>(role_name: Option<&str>, extra_grants: &[S]) -> Result<Self> {
        let grants: Vec<String> = REQUIRED_WORKER_GRANTS
            .iter()
            .map(|g| g.to_string())
            .chain(extra_grants.iter().map(|g| g.as_ref().trim().to_string()))
            .collect();
        Self::with_grants(role_name, grants)
    }

    /// Declare the worker identity with an exact grant list.
    ///
    /// The list must contain every grant in [`REQUIRED_WORKER_GRANTS`].
    pub fn with_grants(role_name: Option<&str>, grants: Vec<String>) -> Result<Self> {
        let mut ordered: Vec<String> = Vec::with_capacity(grants.len());
        for grant in grants {
            if grant.is_empty() {
                return Err(Error::configuration(
                    WORKER_ROLE_ID,
                    "capability grant names must not be empty",
                ));
            }
            if !ordered.contains(&grant) {
                ordered.push(grant);
            }
        }

        let missing: Vec<&str> = REQUIRED_WORKER_GRANTS
            .iter()
            .copied()
            .filter(|required| !ordered.iter().any(|g| g == required))
            .collect();
        if !missing.is_empty() {
            return Err(Error::configuration(
                WORKER_ROLE_ID,
                format!(
                    "worker identity is missing required capability grants: {}",
                    missing.join(", ")
                ),
            ));
        }

        if let Some(name) = role_name {
            if name.is_empty() || name.len() > 64 {
                return Err(Error::configuration(
                    WORKER_ROLE_ID,
                    "role name must be between 1 and 64 characters",
                ));
            }
        }

        debug!(grants = ?ordered, "Declared worker identity");
        Ok(Self {
            role: ServiceRole {
                logical_id: WORKER_ROLE_ID.to_string(),
                role_name: role_name.map(String::from),
                principal: EC2_PRINCIPAL.to_string(),
                grants: ordered,
            },
        })
    }

    /// Logical id in the resource graph
    pub fn logical_id(&self) -> &str {
        &self.role.logical_id
    }

    /// Attached grants
    pub fn grants(&self) -> &[String] {
        &self.role.grants
    }

    /// Trusted principal
    pub fn principal(&self) -> &str {
        &self.role.principal
    }

    /// ARN attribute
    pub fn arn(&self) -> Value {
        self.role.arn()
    }

    pub fn to_resource(&self, partition: &str) -> Resource {
        self.role.to_resource(partition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_grants_come_first() {
        let identity = WorkerIdentity::declare(None, &["CloudWatchAgentServerPolicy"]).unwrap();
        assert_eq!(
            identity.grants(),
            &[
                "AmazonEKSWorkerNodePolicy",
                "AmazonEC2ContainerRegistryReadOnly",
                "AmazonEKS_CNI_Policy",
                "CloudWatchAgentServerPolicy",
            ]
        );
        assert_eq!(identity.principal(), "ec2.amazonaws.com");
    }

    #[test]
    fn test_duplicate_required_grant_is_not_repeated() {
        let identity = WorkerIdentity::declare(None, &["AmazonEKS_CNI_Policy"]).unwrap();
        assert_eq!(identity.grants().len(), 3);
    }

    #[test]
    fn test_missing_required_grant_is_configuration_error() {
        let err = WorkerIdentity::with_grants(
            None,
            vec![
                NODE_OPERATION_GRANT.to_string(),
                REGISTRY_READ_GRANT.to_string(),
            ],
        )
        .unwrap_err();
        match err {
            Error::Configuration { entity, message } => {
                assert_eq!(entity, "WorkerNodeRole");
                assert!(message.contains("AmazonEKS_CNI_Policy"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_role_resource() {
        let identity = WorkerIdentity::declare::<&str>(Some("eks-workers"), &[]).unwrap();
        let resource = identity.to_resource("aws");
        assert_eq!(resource.resource_type(), "AWS::IAM::Role");
        assert_eq!(resource.properties["RoleName"], "eks-workers");
        assert_eq!(
            resource.properties["AssumeRolePolicyDocument"]["Statement"][0]["Principal"]["Service"],
            "ec2.amazonaws.com"
        );
        assert_eq!(
            resource.properties["ManagedPolicyArns"][0],
            "arn:aws:iam::aws:policy/AmazonEKSWorkerNodePolicy"
        );
    }

    #[test]
    fn test_cluster_role() {
        let role = cluster_role();
        let resource = role.to_resource("aws-cn");
        assert_eq!(
            resource.properties["ManagedPolicyArns"][0],
            "arn:aws-cn:iam::aws:policy/AmazonEKSClusterPolicy"
        );
        assert!(resource.properties.get("RoleName").is_none());
    }
}
