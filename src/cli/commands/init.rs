//! Init command - scaffold a stack file and a network fixture

use super::{CommandContext, Runnable};
use anyhow::{Context, Result};
use clap::Parser;
use kubestack::resources::{Network, StaticNetworkLookup, ZoneAllowList};
use kubestack::stack::StackConfig;
use std::path::{Path, PathBuf};

/// File name of the scaffolded stack
pub const STACK_FILE: &str = "stack.yml";
/// File name of the scaffolded network fixture
pub const NETWORKS_FILE: &str = "networks.yml";

/// Arguments for the init command
#[derive(Parser, Debug, Clone)]
pub struct InitArgs {
    /// Directory to write into
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Overwrite existing files
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let mut stack = StackConfig::sample();
        stack.network.zones = Some(ZoneAllowList::new(["us-east-1a", "us-east-1b", "us-east-1c"])?);
        let stack_yaml = serde_yaml::to_string(&stack)?;

        let fixture = StaticNetworkLookup::new(vec![Network::new("vpc-0a1b2c3d")
            .default_network()
            .in_region("us-east-1")
            .with_subnet("subnet-0a", "us-east-1a")
            .with_subnet("subnet-0b", "us-east-1b")
            .with_subnet("subnet-0c", "us-east-1c")
            .with_subnet("subnet-0e", "us-east-1e")]);
        let fixture_yaml = serde_yaml::to_string(&fixture)?;

        let mut skipped = 0;
        for (name, content) in [(STACK_FILE, stack_yaml), (NETWORKS_FILE, fixture_yaml)] {
            let path = self.dir.join(name);
            if self.write_file(&path, &content)? {
                ctx.output.info(&format!("Created {}", path.display()));
            } else {
                ctx.output
                    .warning(&format!("{} already exists, leaving it alone", path.display()));
                skipped += 1;
            }
        }

        if skipped == 0 {
            ctx.output.hint(&format!(
                "Try: kubestack --networks {} synth {}",
                self.dir.join(NETWORKS_FILE).display(),
                self.dir.join(STACK_FILE).display()
            ));
        }
        Ok(0)
    }

    fn write_file(&self, path: &Path, content: &str) -> Result<bool> {
        if path.exists() && !self.force {
            return Ok(false);
        }
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(true)
    }
}

#[async_trait::async_trait]
impl Runnable for InitArgs {
    async fn run(&self, ctx: &mut CommandContext) -> Result<i32> {
        self.execute(ctx).await
    }
}
