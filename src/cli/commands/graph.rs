//! Graph command - show the resource dependency graph

use super::{CommandContext, Runnable};
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

/// Arguments for the graph command
#[derive(Parser, Debug, Clone)]
pub struct GraphArgs {
    /// Path to the stack file
    #[arg(required = true)]
    pub stack: PathBuf,

    /// Print the groups of resources that can be reconciled concurrently
    #[arg(long)]
    pub waves: bool,
}

impl GraphArgs {
    /// Execute the graph command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let synthesized = ctx.synthesize(&self.stack).await?;
        let graph = &synthesized.graph;

        if ctx.output.is_json() {
            let value = serde_json::json!({
                "order": graph.execution_order(),
                "waves": graph.parallel_waves(),
                "edges": graph.adjacency(),
            });
            ctx.output.json(&value);
            return Ok(0);
        }

        if self.waves {
            for (i, wave) in graph.parallel_waves().iter().enumerate() {
                ctx.output.list(&format!("Wave {}", i + 1), wave);
            }
        } else {
            ctx.output.plain(&graph.to_dot());
        }

        Ok(0)
    }
}

#[async_trait::async_trait]
impl Runnable for GraphArgs {
    async fn run(&self, ctx: &mut CommandContext) -> Result<i32> {
        self.execute(ctx).await
    }
}
