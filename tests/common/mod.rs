//! Shared test utilities and fixtures for the kubestack test suite.
//!
//! This module provides:
//! - A fixture network with subnets in four availability zones
//! - A fluent builder for stack declarations
//! - A provisioning engine that fails a chosen resource
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};

use kubestack::engine::{ProvisioningEngine, ResourceOutcome, ResourceStatus};
use kubestack::error::Result;
use kubestack::resources::{Network, NetworkSelection, PlatformVersion, StaticNetworkLookup, ZoneAllowList};
use kubestack::stack::{AccessConfig, StackConfig};
use kubestack::synth::SynthesizedStack;

// ============================================================================
// Network fixtures
// ============================================================================

pub const DEFAULT_VPC: &str = "vpc-0default";
pub const OTHER_VPC: &str = "vpc-0other";

/// Default network with one subnet in each of us-east-1a/b/c/e
pub fn default_network() -> Network {
    Network::new(DEFAULT_VPC)
        .default_network()
        .in_region("us-east-1")
        .with_subnet("subnet-a", "us-east-1a")
        .with_subnet("subnet-b", "us-east-1b")
        .with_subnet("subnet-c", "us-east-1c")
        .with_subnet("subnet-e", "us-east-1e")
}

/// Non-default network with two subnets
pub fn other_network() -> Network {
    Network::new(OTHER_VPC)
        .in_region("us-east-1")
        .with_subnet("subnet-x", "us-east-1a")
        .with_subnet("subnet-y", "us-east-1d")
}

pub fn fixture_lookup() -> StaticNetworkLookup {
    StaticNetworkLookup::new(vec![default_network(), other_network()])
}

/// Zone allow-list from string literals
pub fn zones(list: &[&str]) -> ZoneAllowList {
    ZoneAllowList::new(list.iter().copied()).unwrap()
}

// ============================================================================
// Stack builder
// ============================================================================

/// Fluent builder over [`StackConfig::sample`]
pub struct StackBuilder {
    stack: StackConfig,
}

impl StackBuilder {
    pub fn new() -> Self {
        Self {
            stack: StackConfig::sample(),
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.stack.stack_name = name.to_string();
        self
    }

    pub fn cluster_name(mut self, name: &str) -> Self {
        self.stack.cluster.name = name.to_string();
        self
    }

    pub fn version(mut self, version: PlatformVersion) -> Self {
        self.stack.cluster.version = version;
        self
    }

    pub fn layer(mut self, version: PlatformVersion) -> Self {
        self.stack.cluster.compatibility_layer = Some(version);
        self
    }

    pub fn capacity(mut self, capacity: u32) -> Self {
        self.stack.cluster.default_capacity = capacity;
        self
    }

    pub fn network(mut self, id: &str) -> Self {
        self.stack.network.selection = NetworkSelection::Id(id.to_string());
        self
    }

    pub fn zones(mut self, list: &[&str]) -> Self {
        self.stack.network.zones = Some(zones(list));
        self
    }

    pub fn registry(mut self, name: &str) -> Self {
        self.stack.registry.name = name.to_string();
        self
    }

    pub fn access(mut self, identity: &str, groups: &[&str]) -> Self {
        self.stack.access.push(AccessConfig {
            identity: identity.to_string(),
            groups: groups.iter().map(|g| g.to_string()).collect(),
        });
        self
    }

    pub fn build(self) -> StackConfig {
        self.stack
    }
}

impl Default for StackBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Engines
// ============================================================================

/// Engine that creates everything except the named resources, which fail
pub struct FailingEngine {
    pub failing: Vec<String>,
    pub reason: String,
    pub committed: AtomicBool,
}

impl FailingEngine {
    pub fn new(failing: &str, reason: &str) -> Self {
        Self::new_many(&[failing], reason)
    }

    pub fn new_many(failing: &[&str], reason: &str) -> Self {
        Self {
            failing: failing.iter().map(|id| id.to_string()).collect(),
            reason: reason.to_string(),
            committed: AtomicBool::new(false),
        }
    }

    pub fn was_committed(&self) -> bool {
        self.committed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProvisioningEngine for FailingEngine {
    fn name(&self) -> &str {
        "failing"
    }

    async fn reconcile(&self, stack: &SynthesizedStack) -> Result<Vec<ResourceOutcome>> {
        Ok(stack
            .resource_documents()
            .iter()
            .map(|(id, doc)| {
                let resource_type = doc["Type"].as_str().unwrap_or_default().to_string();
                let status = if self.failing.contains(id) {
                    ResourceStatus::Failed {
                        reason: self.reason.clone(),
                    }
                } else {
                    ResourceStatus::Created
                };
                ResourceOutcome::new(id.clone(), resource_type, status)
            })
            .collect())
    }

    async fn commit(&self, _stack: &SynthesizedStack) -> Result<()> {
        self.committed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Position of `id` in `order`; panics when absent
pub fn position(order: &[String], id: &str) -> usize {
    order
        .iter()
        .position(|x| x == id)
        .unwrap_or_else(|| panic!("{} missing from {:?}", id, order))
}
