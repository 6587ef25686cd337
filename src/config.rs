//! Configuration module for kubestack
//!
//! Handles loading and merging tool configuration from multiple sources:
//! - Default values
//! - System configuration (/etc/kubestack/kubestack.toml)
//! - User configuration (~/.kubestack.toml)
//! - Project configuration (./kubestack.toml)
//! - Environment variables
//! - Command-line arguments
//!
//! This is separate from the stack file: it says *how* stacks are
//! synthesized and deployed, never *what* they contain.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::context::ExecutionContext;
use crate::resources::{EngineSupport, PlatformVersion};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Account, region and deploying principal
    pub context: ExecutionContext,

    /// Provisioning engine settings
    pub engine: EngineConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// Colors and output settings
    pub colors: ColorsConfig,

    /// Problems found while loading, reported once logging is up
    #[serde(skip)]
    pub warnings: Vec<String>,
}

/// Provisioning engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// kubectl version bundled with the engine
    pub bundled_kubectl: PlatformVersion,

    /// Minor versions of skew the bundled kubectl tolerates
    pub version_skew: u32,

    /// Where deployed templates are recorded
    pub state_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let support = EngineSupport::default();
        Self {
            bundled_kubectl: support.bundled(),
            version_skew: 1,
            state_dir: PathBuf::from(".kubestack/state"),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level when no verbosity flag is given
    pub level: Option<String>,

    /// Emit JSON log lines
    pub json: bool,
}

/// Colors configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorsConfig {
    /// Enable colors
    pub enabled: bool,
}

impl Default for ColorsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    /// Load configuration from all sources
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Config::default();

        for path in Self::get_config_paths(config_path) {
            if path.exists() {
                config = config.merge_from_file(&path)?;
            }
        }

        config.apply_env_overrides();

        Ok(config)
    }

    /// Configuration files to check, lowest precedence first
    fn get_config_paths(explicit_path: Option<&PathBuf>) -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // Explicit path replaces every other location
        if let Some(path) = explicit_path {
            paths.push(path.clone());
            return paths;
        }

        paths.push(PathBuf::from("/etc/kubestack/kubestack.toml"));

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".kubestack.toml"));
        }

        paths.push(PathBuf::from("kubestack.toml"));

        if let Ok(env_config) = std::env::var("KUBESTACK_CONFIG") {
            paths.insert(0, PathBuf::from(env_config));
        }

        paths
    }

    /// Merge configuration from a file
    fn merge_from_file(&self, path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let file_config: Config = match extension {
            "yml" | "yaml" => serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
            "json" => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
            "toml" => toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
            _ => toml::from_str(&content)
                .or_else(|_| serde_yaml::from_str(&content))
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
        };

        Ok(self.merge(file_config))
    }

    /// Merge another config into this one; set values in `other` win
    fn merge(&self, other: Config) -> Config {
        let defaults = EngineConfig::default();
        Config {
            context: ExecutionContext {
                account: other.context.account.or_else(|| self.context.account.clone()),
                region: other.context.region.or_else(|| self.context.region.clone()),
                partition: other
                    .context
                    .partition
                    .or_else(|| self.context.partition.clone()),
                principal: other
                    .context
                    .principal
                    .or_else(|| self.context.principal.clone()),
            },
            engine: EngineConfig {
                bundled_kubectl: if other.engine.bundled_kubectl != defaults.bundled_kubectl {
                    other.engine.bundled_kubectl
                } else {
                    self.engine.bundled_kubectl
                },
                version_skew: if other.engine.version_skew != defaults.version_skew {
                    other.engine.version_skew
                } else {
                    self.engine.version_skew
                },
                state_dir: if other.engine.state_dir != defaults.state_dir {
                    other.engine.state_dir
                } else {
                    self.engine.state_dir.clone()
                },
            },
            logging: LoggingConfig {
                level: other.logging.level.or_else(|| self.logging.level.clone()),
                json: other.logging.json || self.logging.json,
            },
            colors: other.colors,
            warnings: self.warnings.clone(),
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // KUBESTACK_ACCOUNT
        if let Ok(account) = std::env::var("KUBESTACK_ACCOUNT") {
            self.context.account = Some(account);
        }

        // KUBESTACK_REGION
        if let Ok(region) = std::env::var("KUBESTACK_REGION") {
            self.context.region = Some(region);
        }

        // KUBESTACK_STATE_DIR
        if let Ok(dir) = std::env::var("KUBESTACK_STATE_DIR") {
            self.engine.state_dir = PathBuf::from(dir);
        }

        // KUBESTACK_BUNDLED_KUBECTL
        if let Ok(version) = std::env::var("KUBESTACK_BUNDLED_KUBECTL") {
            match version.parse() {
                Ok(v) => self.engine.bundled_kubectl = v,
                Err(e) => self
                    .warnings
                    .push(format!("Ignoring KUBESTACK_BUNDLED_KUBECTL: {}", e)),
            }
        }

        // KUBESTACK_LOG_LEVEL
        if let Ok(level) = std::env::var("KUBESTACK_LOG_LEVEL") {
            self.logging.level = Some(level);
        }

        // NO_COLOR
        if std::env::var("NO_COLOR").is_ok() || std::env::var("KUBESTACK_NO_COLOR").is_ok() {
            self.colors.enabled = false;
        }
    }

    /// Native version support of the configured engine
    pub fn engine_support(&self) -> EngineSupport {
        EngineSupport::new(self.engine.bundled_kubectl).with_skew(self.engine.version_skew)
    }

    /// Execution context from configuration
    pub fn execution_context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Load from a specific file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path_buf = path.as_ref().to_path_buf();
        Config::default().merge_from_file(&path_buf)
    }
}
