//! Provisioning engine boundary.
//!
//! The engine reconciles a synthesized stack against live infrastructure and
//! reports one outcome per resource. Any failed outcome fails the whole
//! deployment unit; nothing is rolled back here.

pub mod local;
pub mod store;

pub use local::LocalStateEngine;
pub use store::TemplateStore;

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{error, info};

use crate::error::{Error, Result};
use crate::synth::SynthesizedStack;

/// Per-resource reconciliation result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResourceStatus {
    Created,
    Updated,
    Unchanged,
    Failed { reason: String },
}

impl ResourceStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, ResourceStatus::Failed { .. })
    }

    pub fn is_change(&self) -> bool {
        matches!(self, ResourceStatus::Created | ResourceStatus::Updated)
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceStatus::Created => write!(f, "created"),
            ResourceStatus::Updated => write!(f, "updated"),
            ResourceStatus::Unchanged => write!(f, "unchanged"),
            ResourceStatus::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

/// Outcome reported for one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceOutcome {
    /// Logical id
    pub id: String,
    /// Resource type
    pub resource_type: String,
    #[serde(flatten)]
    pub status: ResourceStatus,
    /// Property diff for updated resources
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

impl ResourceOutcome {
    pub fn new(
        id: impl Into<String>,
        resource_type: impl Into<String>,
        status: ResourceStatus,
    ) -> Self {
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
            status,
            diff: None,
        }
    }

    pub fn with_diff(mut self, diff: impl Into<String>) -> Self {
        self.diff = Some(diff.into());
        self
    }
}

/// Something that reconciles synthesized stacks
#[async_trait]
pub trait ProvisioningEngine: Send + Sync {
    /// Engine name, for display
    fn name(&self) -> &str;

    /// Compute the outcome of every emitted resource, in execution order
    async fn reconcile(&self, stack: &SynthesizedStack) -> Result<Vec<ResourceOutcome>>;

    /// Record the stack as deployed
    async fn commit(&self, stack: &SynthesizedStack) -> Result<()>;

    /// Resources the last deployment had that this stack no longer declares
    async fn removed(&self, _stack: &SynthesizedStack) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Outcomes of one plan or deployment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeploymentReport {
    pub stack_name: String,
    pub outcomes: Vec<ResourceOutcome>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub removed: Vec<String>,
}

impl DeploymentReport {
    pub fn count(&self, status: &str) -> usize {
        self.outcomes
            .iter()
            .filter(|o| match &o.status {
                ResourceStatus::Failed { .. } => status == "failed",
                other => other.to_string() == status,
            })
            .count()
    }

    /// Whether applying the stack would change anything
    pub fn has_changes(&self) -> bool {
        !self.removed.is_empty() || self.outcomes.iter().any(|o| o.status.is_change())
    }

    /// First failed outcome, in execution order
    pub fn first_failure(&self) -> Option<&ResourceOutcome> {
        self.outcomes.iter().find(|o| o.status.is_failed())
    }

    pub fn outcome(&self, id: &str) -> Option<&ResourceOutcome> {
        self.outcomes.iter().find(|o| o.id == id)
    }
}

/// Compute outcomes without recording anything.
pub async fn plan(
    engine: &dyn ProvisioningEngine,
    stack: &SynthesizedStack,
) -> Result<DeploymentReport> {
    let outcomes = engine.reconcile(stack).await?;
    let removed = engine.removed(stack).await?;
    Ok(DeploymentReport {
        stack_name: stack.stack_name.clone(),
        outcomes,
        removed,
    })
}

/// Reconcile and record a stack.
///
/// Any failed outcome becomes [`Error::ProvisioningFailure`] naming the
/// resource, and nothing is recorded.
pub async fn deploy(
    engine: &dyn ProvisioningEngine,
    stack: &SynthesizedStack,
) -> Result<DeploymentReport> {
    info!(stack = %stack.stack_name, engine = engine.name(), "Deploying stack");
    let report = plan(engine, stack).await?;

    if let Some(failed) = report.first_failure() {
        let reason = match &failed.status {
            ResourceStatus::Failed { reason } => reason.clone(),
            other => other.to_string(),
        };
        error!(resource = %failed.id, reason = %reason, "Resource failed, deployment aborted");
        return Err(Error::provisioning_failure(&failed.id, reason));
    }

    engine.commit(stack).await?;
    info!(
        stack = %stack.stack_name,
        created = report.count("created"),
        updated = report.count("updated"),
        unchanged = report.count("unchanged"),
        "Deployment complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(ResourceStatus::Created.to_string(), "created");
        assert_eq!(
            ResourceStatus::Failed {
                reason: "quota".into()
            }
            .to_string(),
            "failed: quota"
        );
    }

    #[test]
    fn test_report_counts() {
        let report = DeploymentReport {
            stack_name: "s".into(),
            outcomes: vec![
                ResourceOutcome::new("A", "AWS::IAM::Role", ResourceStatus::Created),
                ResourceOutcome::new("B", "AWS::IAM::Role", ResourceStatus::Unchanged),
                ResourceOutcome::new(
                    "C",
                    "AWS::IAM::Role",
                    ResourceStatus::Failed {
                        reason: "denied".into(),
                    },
                ),
            ],
            removed: vec![],
        };
        assert_eq!(report.count("created"), 1);
        assert_eq!(report.count("unchanged"), 1);
        assert_eq!(report.count("failed"), 1);
        assert!(report.has_changes());
        assert_eq!(report.first_failure().map(|o| o.id.as_str()), Some("C"));
    }

    #[test]
    fn test_outcome_serializes_flat() {
        let outcome = ResourceOutcome::new(
            "ECRRepo",
            "AWS::ECR::Repository",
            ResourceStatus::Failed {
                reason: "exists".into(),
            },
        );
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["reason"], "exists");
        assert_eq!(value["id"], "ECRRepo");
    }
}
