//! Diff command - compare a stack with the recorded state
//!
//! This module implements the `diff` subcommand. Nothing is recorded.

use super::{CommandContext, Runnable};
use anyhow::Result;
use clap::Parser;
use kubestack::engine;
use std::path::PathBuf;

/// Arguments for the diff command
#[derive(Parser, Debug, Clone)]
pub struct DiffArgs {
    /// Path to the stack file
    #[arg(required = true)]
    pub stack: PathBuf,

    /// Exit with status 1 when there are changes
    #[arg(long)]
    pub exit_code: bool,
}

impl DiffArgs {
    /// Execute the diff command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let synthesized = ctx.synthesize(&self.stack).await?;
        let engine = ctx.engine()?;

        ctx.output
            .banner(&format!("DIFF [{}]", synthesized.stack_name));
        let report = engine::plan(&engine, &synthesized).await?;
        ctx.output.report(&report, "Plan");

        if self.exit_code && report.has_changes() {
            return Ok(1);
        }
        Ok(0)
    }
}

#[async_trait::async_trait]
impl Runnable for DiffArgs {
    async fn run(&self, ctx: &mut CommandContext) -> Result<i32> {
        self.execute(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diff_args_parsing() {
        let args = DiffArgs::try_parse_from(["diff", "stack.yml", "--exit-code"]).unwrap();
        assert_eq!(args.stack, PathBuf::from("stack.yml"));
        assert!(args.exit_code);
    }
}
