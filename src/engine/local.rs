//! Local state engine.
//!
//! Computes outcomes by diffing the synthesized template against the one
//! recorded by the previous deployment. It never touches live
//! infrastructure, which makes it suitable for `diff`, dry runs and tests.

use async_trait::async_trait;
use serde_json::Value;
use similar::{ChangeTag, TextDiff};
use tracing::debug;

use super::store::TemplateStore;
use super::{ProvisioningEngine, ResourceOutcome, ResourceStatus};
use crate::error::Result;
use crate::synth::SynthesizedStack;

/// Engine backed by a [`TemplateStore`]
#[derive(Debug, Clone)]
pub struct LocalStateEngine {
    store: TemplateStore,
}

impl LocalStateEngine {
    pub fn new(store: TemplateStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &TemplateStore {
        &self.store
    }

    fn recorded_resources(&self, stack_name: &str) -> Result<serde_json::Map<String, Value>> {
        let recorded = self.store.load(stack_name)?;
        Ok(match recorded {
            Some(Value::Object(mut template)) => match template.remove("Resources") {
                Some(Value::Object(resources)) => resources,
                _ => serde_json::Map::new(),
            },
            _ => serde_json::Map::new(),
        })
    }
}

/// Line diff of two documents, changed lines only
fn document_diff(old: &Value, new: &Value) -> String {
    let old = serde_json::to_string_pretty(old).unwrap_or_default();
    let new = serde_json::to_string_pretty(new).unwrap_or_default();
    let diff = TextDiff::from_lines(&old, &new);

    let mut unified = String::new();
    for change in diff.iter_all_changes() {
        let line = change.value().trim_end();
        match change.tag() {
            ChangeTag::Insert => unified.push_str(&format!("+{}\n", line)),
            ChangeTag::Delete => unified.push_str(&format!("-{}\n", line)),
            ChangeTag::Equal => {}
        }
    }
    unified
}

#[async_trait]
impl ProvisioningEngine for LocalStateEngine {
    fn name(&self) -> &str {
        "local"
    }

    async fn reconcile(&self, stack: &SynthesizedStack) -> Result<Vec<ResourceOutcome>> {
        let recorded = self.recorded_resources(&stack.stack_name)?;
        let mut outcomes = Vec::new();

        for (id, document) in stack.resource_documents() {
            let resource_type = document
                .get("Type")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();

            let outcome = match recorded.get(&id) {
                None => ResourceOutcome::new(&id, resource_type, ResourceStatus::Created),
                Some(previous) if previous == &document => {
                    ResourceOutcome::new(&id, resource_type, ResourceStatus::Unchanged)
                }
                Some(previous) => ResourceOutcome::new(&id, resource_type, ResourceStatus::Updated)
                    .with_diff(document_diff(previous, &document)),
            };
            debug!(resource = %id, status = %outcome.status, "Reconciled resource");
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    async fn commit(&self, stack: &SynthesizedStack) -> Result<()> {
        self.store.save(&stack.stack_name, &stack.to_template())
    }

    async fn removed(&self, stack: &SynthesizedStack) -> Result<Vec<String>> {
        let recorded = self.recorded_resources(&stack.stack_name)?;
        let current = stack.resource_documents();
        Ok(recorded
            .keys()
            .filter(|id| !current.contains_key(id.as_str()))
            .cloned()
            .collect())
    }
}
