//! Error types for kubestack.
//!
//! Every failure the declaration core can detect is raised immediately and
//! halts graph construction. Messages are entity-scoped: they name the
//! entity that was declared and the invariant its inputs violated.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for kubestack operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for kubestack.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Declaration Errors
    // ========================================================================
    /// Declared inputs are internally inconsistent.
    #[error("Configuration error in '{entity}': {message}")]
    Configuration {
        /// Entity whose inputs are inconsistent
        entity: String,
        /// Violated invariant
        message: String,
    },

    /// Platform version is not natively supported and no layer was declared.
    #[error(
        "Cluster '{cluster}' uses platform version {version}, which the engine does not \
         support natively; declare a compatibility layer for {version}"
    )]
    MissingCompatibilityLayer {
        /// Cluster name
        cluster: String,
        /// Declared platform version
        version: String,
    },

    // ========================================================================
    // Resolution Errors
    // ========================================================================
    /// A referenced existing resource could not be found or is ambiguous.
    #[error("Failed to resolve '{entity}': {message}")]
    Resolution {
        /// Entity being resolved
        entity: String,
        /// What went wrong
        message: String,
    },

    // ========================================================================
    // Provisioning Errors
    // ========================================================================
    /// The provisioning engine reported a resource failure.
    #[error("Provisioning failed for '{resource}': {reason}")]
    ProvisioningFailure {
        /// Logical id of the failed resource
        resource: String,
        /// Reason reported by the engine
        reason: String,
    },

    // ========================================================================
    // Graph Errors
    // ========================================================================
    /// A resource references a resource that was never declared.
    #[error("Resource '{from}' references undeclared resource '{to}'")]
    DanglingReference {
        /// Referencing resource
        from: String,
        /// Missing resource
        to: String,
    },

    /// Two declarations share one logical id.
    #[error("Resource '{0}' is declared more than once")]
    DuplicateResource(String),

    /// The resource graph contains a cycle.
    #[error("Dependency cycle detected: {0}")]
    DependencyCycle(String),

    // ========================================================================
    // IO and Serialization Errors
    // ========================================================================
    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Error parsing a stack file.
    #[error("Failed to parse stack file '{path}': {message}")]
    StackParse {
        /// Path to the stack file
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error.
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    // ========================================================================
    // Other Errors
    // ========================================================================
    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error with source.
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
        /// Source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Creates a new configuration error.
    pub fn configuration(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            entity: entity.into(),
            message: message.into(),
        }
    }

    /// Creates a new resolution error.
    pub fn resolution(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Resolution {
            entity: entity.into(),
            message: message.into(),
        }
    }

    /// Creates a new provisioning failure.
    pub fn provisioning_failure(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ProvisioningFailure {
            resource: resource.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if the error was detected before any resource was touched.
    pub fn is_declaration_error(&self) -> bool {
        matches!(
            self,
            Error::Configuration { .. }
                | Error::MissingCompatibilityLayer { .. }
                | Error::DanglingReference { .. }
                | Error::DuplicateResource(_)
                | Error::DependencyCycle(_)
        )
    }

    /// Returns the error code for CLI exit status.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Configuration { .. } | Error::StackParse { .. } => 2,
            Error::MissingCompatibilityLayer { .. } => 3,
            Error::Resolution { .. } => 4,
            Error::ProvisioningFailure { .. } => 5,
            Error::DanglingReference { .. }
            | Error::DuplicateResource(_)
            | Error::DependencyCycle(_) => 6,
            _ => 1,
        }
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Adds context with a closure that is only evaluated on error.
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Other {
            message: message.into(),
            source: Some(Box::new(e)),
        })
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| Error::Other {
            message: f().into(),
            source: Some(Box::new(e)),
        })
    }
}
