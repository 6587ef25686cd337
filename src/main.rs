//! kubestack - managed Kubernetes clusters as one deployment unit
//!
//! This is the main entry point for the kubestack CLI.

mod cli;

use anyhow::Result;
use cli::commands::{CommandContext, Runnable};
use cli::{Cli, Commands};
use kubestack::config::{Config, LoggingConfig};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Application version information
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Load configuration before logging so its level and format apply
    let config_result = Config::load(cli.config.as_ref());
    let config = match &config_result {
        Ok(config) => config.clone(),
        Err(_) => Config::default(),
    };

    init_logging(cli.verbosity(), &config.logging);
    for warning in &config.warnings {
        tracing::warn!("{}", warning);
    }

    if cli.verbosity() >= 2 {
        eprintln!("kubestack v{}", VERSION);
    }

    let mut ctx = CommandContext::new(&cli, config);

    if let Err(e) = config_result {
        ctx.output
            .error(&format!("Failed to load configuration: {:#}", e));
        std::process::exit(2);
    }

    let command: &dyn Runnable = match &cli.command {
        Commands::Synth(args) => args,
        Commands::Diff(args) => args,
        Commands::Deploy(args) => args,
        Commands::Graph(args) => args,
        Commands::Validate(args) => args,
        Commands::Init(args) => args,
    };

    let exit_code = match command.run(&mut ctx).await {
        Ok(code) => code,
        Err(e) => {
            ctx.output.error(&format!("{:#}", e));
            exit_code_for(&e)
        }
    };

    ctx.output.flush();
    std::process::exit(exit_code);
}

/// Map an error to the process exit code
fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<kubestack::Error>()
        .map(kubestack::Error::exit_code)
        .unwrap_or(1)
}

/// Initialize logging based on verbosity level and the logging config
fn init_logging(verbosity: u8, logging: &LoggingConfig) {
    let filter = match (verbosity, logging.level.as_deref()) {
        (0, Some(level)) => level,
        (0, None) => "warn",
        (1, _) => "info",
        (2, _) => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    if logging.json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_target(verbosity >= 3)
                    .with_writer(std::io::stderr),
            )
            .with(env_filter)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_exit_code_for_library_errors() {
        let err: anyhow::Error = kubestack::Error::resolution("DefaultVPC", "no default network").into();
        assert_eq!(exit_code_for(&err), 4);

        let err = anyhow::anyhow!("something else");
        assert_eq!(exit_code_for(&err), 1);
    }
}
