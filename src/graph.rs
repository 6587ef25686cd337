//! Resource dependency graph.
//!
//! Nodes are declared resources; an edge `a -> b` means `b` references `a`
//! and must be reconciled after it. The graph is validated on construction:
//! every reference must name a declared resource and the graph must be
//! acyclic, so a [`ResourceGraph`] handed to the engine is always complete.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use tracing::trace;

use crate::error::{Error, Result};
use crate::resources::Resource;

/// Validated, acyclic graph of declared resources
#[derive(Debug, Clone)]
pub struct ResourceGraph {
    graph: DiGraph<Resource, ()>,
    node_indices: HashMap<String, NodeIndex>,
}

impl ResourceGraph {
    /// Build and validate a graph from declared resources.
    ///
    /// Fails with [`Error::DuplicateResource`] when two resources share a
    /// logical id, [`Error::DanglingReference`] when a reference names an
    /// undeclared resource and [`Error::DependencyCycle`] when the
    /// references form a cycle.
    pub fn from_resources(resources: Vec<Resource>) -> Result<Self> {
        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();

        for resource in resources {
            if node_indices.contains_key(&resource.id) {
                return Err(Error::DuplicateResource(resource.id));
            }
            let id = resource.id.clone();
            let idx = graph.add_node(resource);
            node_indices.insert(id, idx);
        }

        let mut edges = Vec::new();
        for idx in graph.node_indices() {
            let resource = &graph[idx];
            for target in resource.references() {
                let from = node_indices
                    .get(&target)
                    .ok_or_else(|| Error::DanglingReference {
                        from: resource.id.clone(),
                        to: target.clone(),
                    })?;
                edges.push((*from, idx));
            }
        }
        for (from, to) in edges {
            trace!(from = %graph[from].id, to = %graph[to].id, "Adding dependency edge");
            graph.update_edge(from, to, ());
        }

        let built = Self {
            graph,
            node_indices,
        };
        built.check_acyclic()?;
        Ok(built)
    }

    fn check_acyclic(&self) -> Result<()> {
        if toposort(&self.graph, None).is_ok() {
            return Ok(());
        }

        let cycle = tarjan_scc(&self.graph)
            .into_iter()
            .find(|scc| {
                scc.len() > 1 || scc.iter().any(|idx| self.graph.contains_edge(*idx, *idx))
            })
            .map(|scc| {
                let mut ids: Vec<&str> = scc.iter().map(|idx| self.graph[*idx].id.as_str()).collect();
                ids.sort_unstable();
                ids.join(" -> ")
            })
            .unwrap_or_default();

        Err(Error::DependencyCycle(cycle))
    }

    /// Resource by logical id
    pub fn get(&self, id: &str) -> Option<&Resource> {
        self.node_indices.get(id).map(|idx| &self.graph[*idx])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node_indices.contains_key(id)
    }

    /// All resources, in declaration order
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.graph.node_indices().map(move |idx| &self.graph[idx])
    }

    /// Number of resources
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of dependency edges
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Groups of resources the engine may reconcile concurrently.
    ///
    /// Every resource appears in the first wave after all of its
    /// dependencies; ids within a wave are sorted.
    pub fn parallel_waves(&self) -> Vec<Vec<String>> {
        let mut in_degree: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|idx| {
                (
                    idx,
                    self.graph.neighbors_directed(idx, Direction::Incoming).count(),
                )
            })
            .collect();

        let mut current: Vec<NodeIndex> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(idx, _)| *idx)
            .collect();
        let mut waves = Vec::new();

        while !current.is_empty() {
            current.sort_by(|a, b| self.graph[*a].id.cmp(&self.graph[*b].id));
            let mut next = Vec::new();
            for idx in &current {
                for dependent in self.graph.neighbors_directed(*idx, Direction::Outgoing) {
                    if let Some(degree) = in_degree.get_mut(&dependent) {
                        *degree -= 1;
                        if *degree == 0 {
                            next.push(dependent);
                        }
                    }
                }
            }
            waves.push(current.iter().map(|idx| self.graph[*idx].id.clone()).collect());
            current = next;
        }

        waves
    }

    /// Deterministic topological order: waves flattened
    pub fn execution_order(&self) -> Vec<String> {
        self.parallel_waves().into_iter().flatten().collect()
    }

    /// Direct dependencies of a resource, sorted
    pub fn direct_dependencies(&self, id: &str) -> Vec<String> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Everything a resource depends on, directly or transitively, sorted
    pub fn dependencies(&self, id: &str) -> Vec<String> {
        self.reachable(id, Direction::Incoming)
    }

    /// Everything that depends on a resource, directly or transitively, sorted
    pub fn dependents(&self, id: &str) -> Vec<String> {
        self.reachable(id, Direction::Outgoing)
    }

    fn neighbors(&self, id: &str, direction: Direction) -> Vec<String> {
        let mut ids: Vec<String> = match self.node_indices.get(id) {
            Some(&idx) => self
                .graph
                .neighbors_directed(idx, direction)
                .map(|n| self.graph[n].id.clone())
                .collect(),
            None => Vec::new(),
        };
        ids.sort();
        ids.dedup();
        ids
    }

    fn reachable(&self, id: &str, direction: Direction) -> Vec<String> {
        let mut found = BTreeSet::new();
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();

        if let Some(&start) = self.node_indices.get(id) {
            queue.push_back(start);
            visited.insert(start);

            while let Some(current) = queue.pop_front() {
                for neighbor in self.graph.neighbors_directed(current, direction) {
                    if visited.insert(neighbor) {
                        found.insert(self.graph[neighbor].id.clone());
                        queue.push_back(neighbor);
                    }
                }
            }
        }

        found.into_iter().collect()
    }

    /// Edges as `dependency -> dependents`, sorted
    pub fn adjacency(&self) -> BTreeMap<String, Vec<String>> {
        self.graph
            .node_indices()
            .map(|idx| {
                let id = self.graph[idx].id.clone();
                let dependents = self.neighbors(&id, Direction::Outgoing);
                (id, dependents)
            })
            .collect()
    }

    /// Graphviz rendering; imported resources are drawn dashed
    pub fn to_dot(&self) -> String {
        let mut output = String::new();
        output.push_str("digraph resources {\n");
        output.push_str("  rankdir=LR;\n");
        output.push_str("  node [shape=box];\n\n");

        for idx in self.graph.node_indices() {
            let resource = &self.graph[idx];
            let style = if resource.imported { ", style=dashed" } else { "" };
            output.push_str(&format!(
                "  \"{}\" [label=\"{}\\n{}\"{}];\n",
                resource.id,
                resource.id,
                resource.resource_type(),
                style
            ));
        }

        output.push('\n');

        let mut edges: Vec<(&str, &str)> = self
            .graph
            .edge_references()
            .map(|edge| {
                (
                    self.graph[edge.source()].id.as_str(),
                    self.graph[edge.target()].id.as_str(),
                )
            })
            .collect();
        edges.sort_unstable();
        for (source, target) in edges {
            output.push_str(&format!("  \"{}\" -> \"{}\";\n", source, target));
        }

        output.push_str("}\n");
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{reference, ResourceKind};

    fn resource(id: &str, refs: &[&str]) -> Resource {
        let tokens: Vec<_> = refs.iter().map(|r| reference(r)).collect();
        Resource::new(id, ResourceKind::Role).with_properties(serde_json::json!({ "Refs": tokens }))
    }

    #[test]
    fn test_execution_order_respects_references() {
        let graph = ResourceGraph::from_resources(vec![
            resource("C", &["B"]),
            resource("B", &["A"]),
            resource("A", &[]),
        ])
        .unwrap();
        assert_eq!(graph.execution_order(), vec!["A", "B", "C"]);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_parallel_waves() {
        let graph = ResourceGraph::from_resources(vec![
            resource("Net", &[]),
            resource("Repo", &[]),
            resource("Cluster", &["Net"]),
            resource("Auth", &["Cluster"]),
            resource("Traffic", &["Cluster"]),
        ])
        .unwrap();
        assert_eq!(
            graph.parallel_waves(),
            vec![
                vec!["Net".to_string(), "Repo".to_string()],
                vec!["Cluster".to_string()],
                vec!["Auth".to_string(), "Traffic".to_string()],
            ]
        );
    }

    #[test]
    fn test_dangling_reference() {
        let err = ResourceGraph::from_resources(vec![resource("A", &["Missing"])]).unwrap_err();
        assert!(matches!(
            err,
            Error::DanglingReference { ref from, ref to } if from == "A" && to == "Missing"
        ));
    }

    #[test]
    fn test_duplicate_resource() {
        let err =
            ResourceGraph::from_resources(vec![resource("A", &[]), resource("A", &[])]).unwrap_err();
        assert!(matches!(err, Error::DuplicateResource(ref id) if id == "A"));
    }

    #[test]
    fn test_cycle_detected() {
        let err = ResourceGraph::from_resources(vec![resource("A", &["B"]), resource("B", &["A"])])
            .unwrap_err();
        match err {
            Error::DependencyCycle(cycle) => assert_eq!(cycle, "A -> B"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_self_reference_is_cycle() {
        let err = ResourceGraph::from_resources(vec![resource("A", &["A"])]).unwrap_err();
        assert!(matches!(err, Error::DependencyCycle(_)));
    }

    #[test]
    fn test_transitive_queries() {
        let graph = ResourceGraph::from_resources(vec![
            resource("A", &[]),
            resource("B", &["A"]),
            resource("C", &["B"]),
        ])
        .unwrap();
        assert_eq!(graph.dependencies("C"), vec!["A", "B"]);
        assert_eq!(graph.dependents("A"), vec!["B", "C"]);
        assert_eq!(graph.direct_dependencies("C"), vec!["B"]);
        assert!(graph.dependencies("Unknown").is_empty());
    }

    #[test]
    fn test_to_dot() {
        let graph =
            ResourceGraph::from_resources(vec![resource("A", &[]), resource("B", &["A"])]).unwrap();
        let dot = graph.to_dot();
        assert!(dot.starts_with("digraph resources {"));
        assert!(dot.contains("\"A\" -> \"B\";"));
    }
}
