//! CLI module for kubestack
//!
//! This module provides the command-line interface for kubestack,
//! including argument parsing, configuration loading, and subcommand handling.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// kubestack - managed Kubernetes clusters as one deployment unit
///
/// Declares a cluster, its network placement, registry, worker identity and
/// access bindings, and turns them into a dependency-ordered template.
#[derive(Parser, Debug, Clone)]
#[command(name = "kubestack")]
#[command(author = "kubestack Contributors")]
#[command(version)]
#[command(about = "Declare and provision managed Kubernetes clusters", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format
    #[arg(long, global = true, default_value = "human")]
    pub output: OutputFormat,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true, env = "KUBESTACK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Network fixture (YAML/JSON) used instead of live lookups
    #[arg(long, global = true, env = "KUBESTACK_NETWORKS")]
    pub networks: Option<PathBuf>,

    /// Target account id
    #[arg(long, global = true)]
    pub account: Option<String>,

    /// Target region
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output with colors
    #[default]
    Human,
    /// JSON output for scripting
    Json,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Synthesize a stack and print its template
    Synth(commands::synth::SynthArgs),

    /// Compare a stack with the recorded state
    Diff(commands::diff::DiffArgs),

    /// Deploy a stack with the local state engine
    Deploy(commands::deploy::DeployArgs),

    /// Show the resource dependency graph
    Graph(commands::graph::GraphArgs),

    /// Run every declaration-time check
    Validate(commands::validate::ValidateArgs),

    /// Write a sample stack file and network fixture
    Init(commands::init::InitArgs),
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Get the effective verbosity level (0-3)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(3)
    }

    /// Check if JSON output is requested
    pub fn is_json(&self) -> bool {
        matches!(self.output, OutputFormat::Json)
    }
}
