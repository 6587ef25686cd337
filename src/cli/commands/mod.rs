//! Subcommands module for kubestack CLI
//!
//! This module contains all the subcommand implementations.

pub mod deploy;
pub mod diff;
pub mod graph;
pub mod init;
pub mod synth;
pub mod validate;

use crate::cli::output::OutputFormatter;
use anyhow::{Context, Result};
use kubestack::config::Config;
use kubestack::context::ExecutionContext;
use kubestack::engine::{LocalStateEngine, TemplateStore};
use kubestack::resources::NetworkLookup;
use kubestack::stack::StackConfig;
use kubestack::synth::{SynthesizedStack, Synthesizer};
use std::path::{Path, PathBuf};

/// Common context shared between commands
pub struct CommandContext {
    /// Configuration
    pub config: Config,
    /// Output formatter
    pub output: OutputFormatter,
    /// Execution context after CLI overrides
    pub context: ExecutionContext,
    /// Network fixture
    pub networks: Option<PathBuf>,
}

impl CommandContext {
    /// Create a new command context from CLI arguments
    pub fn new(cli: &crate::cli::Cli, config: Config) -> Self {
        let use_color = !cli.no_color && config.colors.enabled;
        let output = OutputFormatter::new(use_color, cli.is_json(), cli.verbosity());

        let mut context = config.execution_context().clone();
        if let Some(account) = &cli.account {
            context.account = Some(account.clone());
        }
        if let Some(region) = &cli.region {
            context.region = Some(region.clone());
        }

        Self {
            config,
            output,
            context,
            networks: cli.networks.clone(),
        }
    }

    /// Network lookup for this invocation: the fixture when one is given,
    /// otherwise EC2 when built with the `aws` feature
    pub fn network_lookup(&self) -> Result<Box<dyn NetworkLookup>> {
        if let Some(path) = &self.networks {
            self.output
                .debug(&format!("Using network fixture {}", path.display()));
            let lookup = kubestack::resources::StaticNetworkLookup::from_file(path)?;
            return Ok(Box::new(lookup));
        }

        live_lookup(&self.context)
    }

    /// Load a stack file and synthesize it
    pub async fn synthesize(&self, stack_path: &Path) -> Result<SynthesizedStack> {
        let stack = StackConfig::load(stack_path)?;
        let lookup = self.network_lookup()?;
        let synthesizer = Synthesizer::new(lookup.as_ref(), self.context.clone())
            .with_support(self.config.engine_support());
        let synthesized = synthesizer.synthesize(&stack).await?;

        for note in &synthesized.notes {
            self.output.note(note);
        }
        Ok(synthesized)
    }

    /// Local state engine rooted at the configured state directory
    pub fn engine(&self) -> Result<LocalStateEngine> {
        let dir = &self.config.engine.state_dir;
        let store = TemplateStore::open(dir)
            .with_context(|| format!("Failed to open state directory {}", dir.display()))?;
        Ok(LocalStateEngine::new(store))
    }
}

#[cfg(feature = "aws")]
fn live_lookup(context: &ExecutionContext) -> Result<Box<dyn NetworkLookup>> {
    let mut lookup = kubestack::resources::Ec2NetworkLookup::new();
    if let Some(region) = &context.region {
        lookup = lookup.with_region(region.clone());
    }
    Ok(Box::new(lookup))
}

#[cfg(not(feature = "aws"))]
fn live_lookup(_context: &ExecutionContext) -> Result<Box<dyn NetworkLookup>> {
    anyhow::bail!("no network fixture given; pass --networks <file> or build with the `aws` feature")
}

/// Trait for runnable commands
#[async_trait::async_trait]
pub trait Runnable {
    /// Execute the command
    async fn run(&self, ctx: &mut CommandContext) -> Result<i32>;
}
