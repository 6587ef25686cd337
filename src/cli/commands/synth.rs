//! Synth command - render the provisioning template
//!
//! This module implements the `synth` subcommand.

use super::{CommandContext, Runnable};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

/// Arguments for the synth command
#[derive(Parser, Debug, Clone)]
pub struct SynthArgs {
    /// Path to the stack file
    #[arg(required = true)]
    pub stack: PathBuf,

    /// Write the template to a file instead of stdout
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,
}

impl SynthArgs {
    /// Execute the synth command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let synthesized = ctx.synthesize(&self.stack).await?;
        let template = synthesized.to_template();

        match &self.out {
            Some(path) => {
                let rendered = serde_json::to_string_pretty(&template)?;
                std::fs::write(path, rendered + "\n")
                    .with_context(|| format!("Failed to write template to {}", path.display()))?;
                ctx.output.info(&format!(
                    "Wrote {} resources to {}",
                    synthesized.graph.node_count(),
                    path.display()
                ));
            }
            None => ctx.output.json(&template),
        }

        Ok(0)
    }
}

#[async_trait::async_trait]
impl Runnable for SynthArgs {
    async fn run(&self, ctx: &mut CommandContext) -> Result<i32> {
        self.execute(ctx).await
    }
}
