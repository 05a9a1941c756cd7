//! Dependency graph view using petgraph.
//!
//! This module mirrors every declared `dependencies` edge of a task snapshot
//! into a directed graph so the whole set can be audited at once for cycles,
//! dangling edges and reverse lookups.

use crate::{TaskIndex, TaskNodeData};
use petgraph::Direction;
use petgraph::algo::{is_cyclic_directed, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Directed graph of dependency edges, `owner -> dependency`.
///
/// Archived and deleted tasks are included: they still carry edges, and an
/// audit has to see them.
#[derive(Debug)]
pub struct DependencyGraph {
    /// The directed graph of task ids.
    graph: DiGraph<String, ()>,
    /// Map from task ids to node indices.
    id_to_node: HashMap<String, NodeIndex>,
    /// Edges whose target does not exist, as (owner, dependency).
    dangling: Vec<(String, String)>,
}

impl DependencyGraph {
    /// Build the graph from a task snapshot.
    #[must_use]
    pub fn from_index<T: TaskNodeData>(index: &TaskIndex<'_, T>) -> Self {
        let mut graph = DiGraph::new();
        let mut id_to_node = HashMap::new();

        for task in index.iter() {
            let node = graph.add_node(task.id().to_string());
            id_to_node.insert(task.id().to_string(), node);
        }

        let mut dangling = Vec::new();
        for task in index.iter() {
            let from = id_to_node[task.id()];
            let mut seen = HashSet::new();
            for dep in task.dependency_ids() {
                if !seen.insert(dep) {
                    continue;
                }
                if let Some(&to) = id_to_node.get(dep) {
                    graph.add_edge(from, to, ());
                } else {
                    dangling.push((task.id().to_string(), dep.to_string()));
                }
            }
        }

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            dangling = dangling.len(),
            "Built dependency graph"
        );

        Self {
            graph,
            id_to_node,
            dangling,
        }
    }

    /// Check if the graph has cycles.
    #[must_use]
    pub fn has_cycles(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    /// Every cycle in the graph, one entry per strongly connected component
    /// (plus single tasks that list themselves).
    #[must_use]
    pub fn cycles(&self) -> Vec<Vec<String>> {
        tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || component
                        .first()
                        .is_some_and(|&node| self.graph.contains_edge(node, node))
            })
            .map(|component| {
                let mut ids: Vec<String> =
                    component.into_iter().map(|n| self.graph[n].clone()).collect();
                ids.sort();
                ids
            })
            .collect()
    }

    /// Edges whose dependency is not in the snapshot, as (owner, dependency).
    #[must_use]
    pub fn dangling_edges(&self) -> &[(String, String)] {
        &self.dangling
    }

    /// Ids of the tasks that declare a dependency on `id`, sorted.
    #[must_use]
    pub fn dependents_of(&self, id: &str) -> Vec<&str> {
        let Some(&node) = self.id_to_node.get(id) else {
            return Vec::new();
        };
        let mut ids: Vec<&str> = self
            .graph
            .neighbors_directed(node, Direction::Incoming)
            .map(|n| self.graph[n].as_str())
            .collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestTask;

    fn graph_of(tasks: &[TestTask]) -> DependencyGraph {
        DependencyGraph::from_index(&TaskIndex::new(tasks))
    }

    #[test]
    fn test_empty_graph() {
        let graph = graph_of(&[]);
        assert!(!graph.has_cycles());
        assert!(graph.cycles().is_empty());
        assert!(graph.dangling_edges().is_empty());
    }

    #[test]
    fn test_chain_is_acyclic() {
        let graph = graph_of(&[
            TestTask::new("ship", &["build", "design"]),
            TestTask::new("build", &["design"]),
            TestTask::new("design", &[]),
        ]);

        assert!(!graph.has_cycles());
        assert_eq!(graph.dependents_of("design"), vec!["build", "ship"]);
        assert!(graph.dependents_of("ship").is_empty());
    }

    #[test]
    fn test_cycle_detection() {
        // a -> b -> c -> a
        let graph = graph_of(&[
            TestTask::new("a", &["b"]),
            TestTask::new("b", &["c"]),
            TestTask::new("c", &["a"]),
            TestTask::new("d", &[]),
        ]);

        assert!(graph.has_cycles());
        assert_eq!(graph.cycles(), vec![vec!["a", "b", "c"]]);
    }

    #[test]
    fn test_self_loop_is_a_cycle() {
        let graph = graph_of(&[TestTask::new("a", &["a"])]);
        assert!(graph.has_cycles());
        assert_eq!(graph.cycles(), vec![vec!["a"]]);
        assert_eq!(graph.dependents_of("a"), vec!["a"]);
    }

    #[test]
    fn test_dangling_edges() {
        let graph = graph_of(&[TestTask::new("a", &["ghost"])]);
        assert_eq!(
            graph.dangling_edges(),
            &[("a".to_string(), "ghost".to_string())]
        );
        assert!(graph.dependents_of("ghost").is_empty());
    }

    #[test]
    fn test_duplicate_declarations_make_one_edge() {
        let graph = graph_of(&[TestTask::new("a", &["b", "b"]), TestTask::new("b", &[])]);
        assert_eq!(graph.dependents_of("b"), vec!["a"]);
    }

    #[test]
    fn test_reverse_lookup() {
        let graph = graph_of(&[
            TestTask::new("a", &["c"]),
            TestTask::new("b", &["c"]),
            TestTask::new("c", &[]),
        ]);
        assert_eq!(graph.dependents_of("c"), vec!["a", "b"]);
        assert!(graph.dependents_of("missing").is_empty());
    }
}
