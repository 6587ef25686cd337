//! Stack synthesis.
//!
//! Composes every declaration of a stack into one validated
//! [`ResourceGraph`] and renders the provisioning template. Any error halts
//! synthesis; no partial graph is ever returned.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::context::ExecutionContext;
use crate::error::{Error, Result};
use crate::graph::ResourceGraph;
use crate::resources::cluster::ClusterSpec;
use crate::resources::{
    declare_cluster, resolve_network, AccessBinder, AccessBinding, EngineSupport, NetworkLookup,
    Registry, StackOutput, SubnetSelection, TrafficPolicy, WorkerIdentity,
};
use crate::stack::StackConfig;

/// Severity of a synthesis note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteLevel {
    Info,
    Warning,
}

/// Something the operator should know about the synthesized stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Note {
    pub level: NoteLevel,
    pub message: String,
}

impl Note {
    fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoteLevel::Info,
            message: message.into(),
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoteLevel::Warning,
            message: message.into(),
        }
    }
}

/// Result of a successful synthesis
#[derive(Debug, Clone)]
pub struct SynthesizedStack {
    pub stack_name: String,
    pub graph: ResourceGraph,
    pub outputs: Vec<StackOutput>,
    pub subnet_selection: SubnetSelection,
    pub access_bindings: Vec<AccessBinding>,
    pub notes: Vec<Note>,
}

impl SynthesizedStack {
    /// Output by name
    pub fn output(&self, name: &str) -> Option<&StackOutput> {
        self.outputs.iter().find(|o| o.name == name)
    }

    /// Warnings only
    pub fn warnings(&self) -> impl Iterator<Item = &Note> {
        self.notes.iter().filter(|n| n.level == NoteLevel::Warning)
    }

    /// Render the provisioning template.
    ///
    /// Imported resources are not emitted and explicit dependencies on
    /// them are dropped; token references to them stay as they are.
    pub fn to_template(&self) -> Value {
        let resources: serde_json::Map<String, Value> =
            self.resource_documents().into_iter().collect();

        let outputs: serde_json::Map<String, Value> = self
            .outputs
            .iter()
            .map(|o| (o.name.clone(), o.to_template()))
            .collect();

        serde_json::json!({
            "Description": format!("{} (kubestack)", self.stack_name),
            "Resources": resources,
            "Outputs": outputs,
        })
    }

    /// Template entries of emitted resources, in execution order
    pub fn resource_documents(&self) -> IndexMap<String, Value> {
        let mut documents = IndexMap::new();
        for id in self.graph.execution_order() {
            let Some(resource) = self.graph.get(&id) else {
                continue;
            };
            if resource.imported {
                continue;
            }

            let mut entry = serde_json::json!({
                "Type": resource.resource_type(),
                "Properties": resource.properties,
            });
            let depends_on: Vec<&str> = resource
                .depends_on
                .iter()
                .filter(|dep| self.graph.get(dep).map(|r| !r.imported).unwrap_or(false))
                .map(String::as_str)
                .collect();
            if !depends_on.is_empty() {
                entry["DependsOn"] = serde_json::json!(depends_on);
            }
            documents.insert(id, entry);
        }
        documents
    }
}

/// Composes stacks from declared intents
pub struct Synthesizer<'a> {
    lookup: &'a dyn NetworkLookup,
    context: ExecutionContext,
    support: EngineSupport,
}

impl<'a> Synthesizer<'a> {
    pub fn new(lookup: &'a dyn NetworkLookup, context: ExecutionContext) -> Self {
        Self {
            lookup,
            context,
            support: EngineSupport::default(),
        }
    }

    /// Override the engine's native version support
    pub fn with_support(mut self, support: EngineSupport) -> Self {
        self.support = support;
        self
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Synthesize a stack into a validated resource graph.
    pub async fn synthesize(&self, stack: &StackConfig) -> Result<SynthesizedStack> {
        info!(stack = %stack.stack_name, "Synthesizing stack");
        let mut notes = Vec::new();

        // Pure declarations first, so input errors surface before any lookup
        let registry = Registry::declare(&stack.registry.name)?;
        let worker = WorkerIdentity::declare(
            stack.worker.role_name.as_deref(),
            stack.worker.extra_grants.as_slice(),
        )?;

        let mut binder = AccessBinder::new();
        for access in &stack.access {
            binder.bind(AccessBinding::new(&access.identity, access.groups.iter().cloned())?);
        }

        let mut spec = ClusterSpec::new(&stack.cluster.name, stack.cluster.version)
            .with_default_capacity(stack.cluster.default_capacity)
            .with_instance_type(&stack.cluster.instance_type);
        if let Some(layer) = stack.cluster.compatibility_layer {
            spec = spec.with_compatibility_layer(layer);
        }

        let output = StackOutput::registry_uri(
            &registry,
            Some(stack.outputs.registry_uri_description.as_str()),
        )?;

        let selection = resolve_network(
            self.lookup,
            &stack.network.selection,
            stack.network.zones.as_ref(),
            &self.context,
        )
        .await?;

        let declaration = declare_cluster(&spec, &selection, &self.support)?;

        if !declaration.binds_worker_identity() {
            let message = format!(
                "worker identity {} is not attached to any nodes: default capacity is 0",
                worker.logical_id()
            );
            warn!("{}", message);
            notes.push(Note::warning(message));
        }
        if let Some(layer) = &declaration.layer {
            notes.push(Note::info(format!(
                "kubectl compatibility layer {} bound to cluster {}",
                layer.version, declaration.cluster.name
            )));
        }
        if selection.filtered && !selection.excluded.is_empty() {
            let excluded: Vec<&str> = selection.excluded.iter().map(|s| s.id.as_str()).collect();
            notes.push(Note::info(format!(
                "excluded subnets outside the zone allow-list: {}",
                excluded.join(", ")
            )));
        }

        let partition = self.context.partition();
        let mut resources = vec![selection.to_resource()];
        resources.extend(declaration.to_resources(&worker, partition));
        resources.push(registry.to_resource());
        resources.push(worker.to_resource(partition));

        match binder.to_resource(&declaration.cluster, &self.context) {
            Some(resource) => resources.push(resource),
            None => notes.push(Note::info(format!(
                "no access bindings: only {} can authenticate to cluster {}",
                self.context.deploying_identity(),
                declaration.cluster.name
            ))),
        }

        let traffic = TrafficPolicy::for_cluster(&declaration.cluster);
        resources.push(traffic.to_resource(&declaration.cluster));

        let graph = ResourceGraph::from_resources(resources)?;
        let outputs = vec![output];
        validate_outputs(&outputs, &graph)?;

        info!(
            stack = %stack.stack_name,
            resources = graph.node_count(),
            edges = graph.edge_count(),
            "Synthesized stack"
        );

        Ok(SynthesizedStack {
            stack_name: stack.stack_name.clone(),
            graph,
            outputs,
            subnet_selection: selection,
            access_bindings: binder.bindings(),
            notes,
        })
    }
}

/// Output names must be unique and sourced from declared resources
pub fn validate_outputs(outputs: &[StackOutput], graph: &ResourceGraph) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    for output in outputs {
        if !seen.insert(output.name.as_str()) {
            return Err(Error::configuration(
                format!("Output '{}'", output.name),
                "output names must be unique within a stack",
            ));
        }
        if !graph.contains(&output.source) {
            return Err(Error::DanglingReference {
                from: output.name.clone(),
                to: output.source.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{Network, StaticNetworkLookup};
    use serde_json::json;

    fn lookup() -> StaticNetworkLookup {
        StaticNetworkLookup::new(vec![Network::new("vpc-1")
            .default_network()
            .with_subnet("subnet-a", "us-east-1a")
            .with_subnet("subnet-b", "us-east-1b")])
    }

    #[tokio::test]
    async fn test_sample_stack_synthesizes() {
        let lookup = lookup();
        let synth = Synthesizer::new(&lookup, ExecutionContext::new());
        let stack = synth.synthesize(&StackConfig::sample()).await.unwrap();

        let template = stack.to_template();
        let resources = template["Resources"].as_object().unwrap();
        assert!(!resources.contains_key("DefaultVPC"));
        assert!(!resources.contains_key("AwsAuth"));
        assert_eq!(resources["EKSCluster"]["Type"], "AWS::EKS::Cluster");
        assert!(resources["EKSCluster"].get("DependsOn").is_none());
        assert_eq!(
            template["Outputs"]["ECRRepoUri"]["Value"],
            json!({ "Fn::GetAtt": ["ECRRepo", "RepositoryUri"] })
        );
        assert!(stack
            .notes
            .iter()
            .any(|n| n.message.contains("no access bindings")));
    }

    #[test]
    fn test_duplicate_output_names() {
        let registry = Registry::declare("ecr-repo").unwrap();
        let graph = ResourceGraph::from_resources(vec![registry.to_resource()]).unwrap();
        let output = StackOutput::registry_uri(&registry, None).unwrap();
        let err = validate_outputs(&[output.clone(), output], &graph).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_output_to_missing_resource() {
        let registry = Registry::declare("ecr-repo").unwrap();
        let graph = ResourceGraph::from_resources(vec![]).unwrap();
        let output = StackOutput::registry_uri(&registry, None).unwrap();
        let err = validate_outputs(&[output], &graph).unwrap_err();
        assert!(matches!(err, Error::DanglingReference { .. }));
    }
}
