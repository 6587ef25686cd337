//! Deployment execution context.
//!
//! The account, region and deploying principal are passed into synthesis
//! explicitly instead of being read from ambient process state, so every
//! declaration can be built and tested without live credentials.

use serde::{Deserialize, Serialize};

/// Partition used when the context does not name one.
pub const DEFAULT_PARTITION: &str = "aws";

/// Account/credentials context the provisioning engine deploys with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionContext {
    /// Target account id; unresolved until deploy time when `None`
    pub account: Option<String>,
    /// Target region
    pub region: Option<String>,
    /// Partition (`aws`, `aws-cn`, `aws-us-gov`)
    pub partition: Option<String>,
    /// Identity the engine deploys as
    pub principal: Option<String>,
}

impl ExecutionContext {
    /// Create an empty context (account and region resolved by the engine)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target account
    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    /// Set the target region
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set the deploying principal
    pub fn with_principal(mut self, principal: impl Into<String>) -> Self {
        self.principal = Some(principal.into());
        self
    }

    /// Effective partition
    pub fn partition(&self) -> &str {
        self.partition.as_deref().unwrap_or(DEFAULT_PARTITION)
    }

    /// Human-readable description of who deploys, for notes and logs
    pub fn deploying_identity(&self) -> String {
        match (&self.principal, &self.account) {
            (Some(principal), _) => principal.clone(),
            (None, Some(account)) => format!("the deploying identity of account {}", account),
            (None, None) => "the deploying identity".to_string(),
        }
    }

    /// ARN of an IAM user in the target account.
    ///
    /// Returns a literal ARN when the account is known, otherwise an
    /// `Fn::Sub` expression the engine resolves at deploy time.
    pub fn user_arn(&self, user: &str) -> serde_json::Value {
        match &self.account {
            Some(account) => serde_json::Value::String(format!(
                "arn:{}:iam::{}:user/{}",
                self.partition(),
                account,
                user
            )),
            None => serde_json::json!({
                "Fn::Sub": format!("arn:${{AWS::Partition}}:iam::${{AWS::AccountId}}:user/{}", user)
            }),
        }
    }
}
