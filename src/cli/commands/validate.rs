//! Validate command
//!
//! Runs every declaration-time check, including the network lookup, and
//! reports warnings without writing anything.

use super::{CommandContext, Runnable};
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

/// Arguments for the validate command
#[derive(Parser, Debug, Clone)]
pub struct ValidateArgs {
    /// Path to the stack file
    #[arg(required = true)]
    pub stack: PathBuf,

    /// Treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

impl ValidateArgs {
    /// Execute the validate command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let synthesized = ctx.synthesize(&self.stack).await?;
        let warnings = synthesized.warnings().count();

        if ctx.output.is_json() {
            ctx.output.json(&serde_json::json!({
                "valid": true,
                "stack": synthesized.stack_name,
                "resources": synthesized.graph.node_count(),
                "subnets": synthesized.subnet_selection.subnet_ids(),
                "notes": synthesized.notes,
            }));
        } else {
            ctx.output.section(&format!("Stack {}", synthesized.stack_name));
            ctx.output.list("Subnets", &synthesized.subnet_selection.subnet_ids());
            let bindings: Vec<String> = synthesized
                .access_bindings
                .iter()
                .map(|b| format!("{} -> {}", b.identity, b.groups.join(", ")))
                .collect();
            if !bindings.is_empty() {
                ctx.output.list("Access bindings", &bindings);
            }
            ctx.output.plain(&format!(
                "\nStack is valid: {} resources, {} warnings",
                synthesized.graph.node_count(),
                warnings
            ));
        }

        if self.strict && warnings > 0 {
            ctx.output.error("Warnings are treated as errors (--strict)");
            return Ok(1);
        }
        Ok(0)
    }
}

#[async_trait::async_trait]
impl Runnable for ValidateArgs {
    async fn run(&self, ctx: &mut CommandContext) -> Result<i32> {
        self.execute(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_args_parsing() {
        let args = ValidateArgs::try_parse_from(["validate", "stack.yml", "--strict"]).unwrap();
        assert_eq!(args.stack, PathBuf::from("stack.yml"));
        assert!(args.strict);
    }
}
