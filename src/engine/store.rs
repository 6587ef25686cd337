//! Recorded templates on disk.
//!
//! One pretty-printed JSON file per stack under the state directory.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use serde_json::Value;
use tracing::debug;

use crate::error::{Error, ErrorContext, Result};

/// File-backed store of the last deployed template per stack
#[derive(Debug, Clone)]
pub struct TemplateStore {
    base_dir: PathBuf,
}

impl TemplateStore {
    /// Open a store, creating the directory if needed
    pub fn open(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir).with_context(|| {
            format!("Failed to create state directory {}", base_dir.display())
        })?;
        Ok(Self { base_dir })
    }

    fn template_path(&self, stack_name: &str) -> Result<PathBuf> {
        if stack_name.is_empty()
            || !stack_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::configuration(
                format!("Stack '{}'", stack_name),
                "stack names must be alphanumerics, '-' or '_' to be recorded",
            ));
        }
        Ok(self.base_dir.join(format!("{}.json", stack_name)))
    }

    /// Last recorded template, if any
    pub fn load(&self, stack_name: &str) -> Result<Option<Value>> {
        let path = self.template_path(stack_name)?;
        if !path.exists() {
            return Ok(None);
        }
        let file = File::open(&path)?;
        let reader = BufReader::new(file);
        let template = serde_json::from_reader(reader)?;
        Ok(Some(template))
    }

    /// Record a template, replacing the previous one
    pub fn save(&self, stack_name: &str, template: &Value) -> Result<()> {
        let path = self.template_path(stack_name)?;
        let file = File::create(&path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, template)?;
        debug!(path = %path.display(), "Recorded template");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let store = TemplateStore::open(dir.path().join("state")).unwrap();
        assert!(store.load("InfrastructureStack").unwrap().is_none());

        let template = serde_json::json!({ "Resources": {} });
        store.save("InfrastructureStack", &template).unwrap();
        assert_eq!(store.load("InfrastructureStack").unwrap(), Some(template));
    }

    #[test]
    fn test_rejects_path_like_names() {
        let dir = TempDir::new().unwrap();
        let store = TemplateStore::open(dir.path()).unwrap();
        assert!(store.load("../escape").is_err());
    }
}
