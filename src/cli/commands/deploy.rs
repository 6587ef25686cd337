//! Deploy command
//!
//! Hands the synthesized stack to the local state engine. A failed resource
//! fails the whole deployment and nothing is recorded.

use super::{CommandContext, Runnable};
use anyhow::Result;
use clap::Parser;
use kubestack::engine;
use std::path::PathBuf;

/// Arguments for the deploy command
#[derive(Parser, Debug, Clone)]
pub struct DeployArgs {
    /// Path to the stack file
    #[arg(required = true)]
    pub stack: PathBuf,
}

impl DeployArgs {
    /// Execute the deploy command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let synthesized = ctx.synthesize(&self.stack).await?;
        let engine = ctx.engine()?;

        ctx.output
            .banner(&format!("DEPLOY [{}]", synthesized.stack_name));
        let report = engine::deploy(&engine, &synthesized).await?;
        ctx.output.report(&report, "Deployed");

        if !ctx.output.is_json() {
            for output in &synthesized.outputs {
                ctx.output.plain(&format!(
                    "Output {} ({}): {}",
                    output.name,
                    output.description,
                    serde_json::to_string(&output.value)?
                ));
            }
        }
        ctx.output.elapsed("Deploy took");

        Ok(0)
    }
}

#[async_trait::async_trait]
impl Runnable for DeployArgs {
    async fn run(&self, ctx: &mut CommandContext) -> Result<i32> {
        self.execute(ctx).await
    }
}
