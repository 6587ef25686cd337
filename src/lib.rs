//! # kubestack - managed Kubernetes clusters as one deployment unit
//!
//! kubestack composes a managed Kubernetes cluster with the infrastructure it
//! needs: an existing network narrowed to approved availability zones, a
//! container registry, a worker identity, administrator access bindings and
//! an intra-cluster traffic policy. Declarations become [`resources::Resource`]
//! nodes, references between them become edges of a [`graph::ResourceGraph`],
//! and a [`engine::ProvisioningEngine`] reconciles the result in dependency
//! order.
//!
//! ## Architecture Overview
//!
//! ```text
//! stack file ──▶ StackConfig ──▶ Synthesizer ──▶ SynthesizedStack ──▶ ProvisioningEngine
//!                                    │                 │
//!                             NetworkLookup      ResourceGraph
//!                          (fixture / EC2 API)  (petgraph, acyclic)
//! ```
//!
//! Every declaration-time check (unsupported versions, empty zone filters,
//! mismatched kubectl layers, dangling references, cycles) fails synthesis
//! before anything reaches the engine.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use kubestack::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let lookup = StaticNetworkLookup::from_file("networks.yml")?;
//!     let stack = StackConfig::load("stack.yml")?;
//!
//!     let synthesized = Synthesizer::new(&lookup, ExecutionContext::new())
//!         .synthesize(&stack)
//!         .await?;
//!
//!     println!("{}", synthesized.to_template());
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::context::ExecutionContext;
    pub use crate::engine::{
        DeploymentReport, LocalStateEngine, ProvisioningEngine, ResourceOutcome, ResourceStatus,
        TemplateStore,
    };
    pub use crate::error::{Error, Result};
    pub use crate::graph::ResourceGraph;
    pub use crate::resources::{
        AccessBinder, AccessBinding, Cluster, ClusterSpec, EngineSupport, Network,
        NetworkLookup, NetworkSelection, PlatformVersion, Registry, Resource, StackOutput,
        StaticNetworkLookup, SubnetSelection, TrafficPolicy, WorkerIdentity, ZoneAllowList,
    };
    pub use crate::stack::StackConfig;
    pub use crate::synth::{Note, NoteLevel, SynthesizedStack, Synthesizer};
}

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod graph;
pub mod resources;
pub mod stack;
pub mod synth;

pub use error::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
