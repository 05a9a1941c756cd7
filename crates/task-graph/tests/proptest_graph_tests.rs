//! Property-based tests for dependency graph invariants.
//!
//! These tests verify the behavioral contracts of the graph algorithms:
//! - The validator accepts an edge exactly when the result stays acyclic
//! - Accepted edges never build up a cycle
//! - The relationship graph draws every reachable task exactly once

use minions_task_graph::{
    DependencyGraph, LayoutConfig, TaskIndex, TaskNodeData, Validity, build_relationship_graph,
    validate_dependency,
};
use proptest::prelude::*;
use std::collections::HashSet;

// =============================================================================
// Test Task Type
// =============================================================================

/// Simple task type for property testing.
#[derive(Clone, Debug)]
struct PropTask {
    id: String,
    deps: Vec<String>,
    children: Vec<String>,
    parent: Option<String>,
}

impl TaskNodeData for PropTask {
    fn id(&self) -> &str {
        &self.id
    }

    fn dependency_ids(&self) -> impl Iterator<Item = &str> {
        self.deps.iter().map(String::as_str)
    }

    fn child_ids(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(String::as_str)
    }

    fn parent_id(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    fn is_available(&self) -> bool {
        true
    }
}

impl PropTask {
    fn new(id: String, deps: Vec<String>) -> Self {
        Self {
            id,
            deps,
            children: vec![],
            parent: None,
        }
    }
}

/// Ids reachable from `root` along declared dependencies, `root` included.
fn reachable_from(index: &TaskIndex<'_, PropTask>, root: &str) -> HashSet<String> {
    let mut seen = HashSet::from([root.to_string()]);
    let mut stack = vec![root.to_string()];
    while let Some(id) = stack.pop() {
        for dep in index.get(&id).map(|t| t.deps.as_slice()).unwrap_or_default() {
            if seen.insert(dep.clone()) {
                stack.push(dep.clone());
            }
        }
    }
    seen
}

// =============================================================================
// Strategies for generating test data
// =============================================================================

/// Generate a DAG where each task may only depend on tasks with lower indices.
fn dag_strategy(min_tasks: usize, max_tasks: usize) -> impl Strategy<Value = Vec<PropTask>> {
    (min_tasks..=max_tasks).prop_flat_map(|task_count| {
        let dep_strategies: Vec<_> = (0..task_count)
            .map(|i| {
                if i == 0 {
                    Just(vec![]).boxed()
                } else {
                    proptest::collection::vec(0..i, 0..=i.min(3))
                        .prop_map(|deps| {
                            deps.into_iter()
                                .collect::<HashSet<_>>()
                                .into_iter()
                                .map(|d| format!("t{d}"))
                                .collect()
                        })
                        .boxed()
                }
            })
            .collect();

        dep_strategies.prop_map(|all_deps| {
            all_deps
                .into_iter()
                .enumerate()
                .map(|(i, deps)| PropTask::new(format!("t{i}"), deps))
                .collect::<Vec<_>>()
        })
    })
}

/// A sequence of proposed edges between `n` tasks.
fn proposals_strategy(n: usize) -> impl Strategy<Value = Vec<(usize, usize)>> {
    proptest::collection::vec((0..n, 0..n), 0..40)
}

// =============================================================================
// Property Tests: Validator
// =============================================================================

proptest! {
    /// Contract: a proposed edge is valid exactly when adding it keeps the
    /// graph acyclic (for distinct, existing, available tasks).
    #[test]
    fn validator_agrees_with_petgraph(
        tasks in dag_strategy(2, 12),
        pick in (any::<prop::sample::Index>(), any::<prop::sample::Index>()),
    ) {
        let owner = pick.0.get(&tasks).id.clone();
        let candidate = pick.1.get(&tasks).id.clone();
        prop_assume!(owner != candidate);

        let index = TaskIndex::new(&tasks);
        let validity = validate_dependency(&index, &owner, &candidate);

        let mut with_edge = tasks.clone();
        for task in &mut with_edge {
            if task.id == owner && !task.deps.contains(&candidate) {
                task.deps.push(candidate.clone());
            }
        }
        let cyclic = DependencyGraph::from_index(&TaskIndex::new(&with_edge)).has_cycles();

        prop_assert_eq!(validity.is_valid(), !cyclic);
    }

    /// Contract: applying only accepted edges never produces a cycle.
    #[test]
    fn accepted_edges_stay_acyclic(proposals in proposals_strategy(8)) {
        let mut tasks: Vec<PropTask> = (0..8)
            .map(|i| PropTask::new(format!("t{i}"), vec![]))
            .collect();

        for (from, to) in proposals {
            let owner = format!("t{from}");
            let candidate = format!("t{to}");
            let validity = validate_dependency(&TaskIndex::new(&tasks), &owner, &candidate);
            if validity == Validity::Valid {
                tasks[from].deps.push(candidate);
            }
        }

        let graph = DependencyGraph::from_index(&TaskIndex::new(&tasks));
        prop_assert!(!graph.has_cycles());
    }

    /// Contract: already-transitive dependencies are never reported as cycles.
    #[test]
    fn transitive_dependency_is_not_a_cycle(tasks in dag_strategy(3, 15)) {
        let index = TaskIndex::new(&tasks);
        let graph = DependencyGraph::from_index(&index);

        // Any task may additionally depend on anything in its own closure.
        for task in &tasks {
            let closure = reachable_from(&index, &task.id);
            for dep in closure.iter().filter(|d| **d != task.id) {
                prop_assert!(
                    validate_dependency(&index, &task.id, dep).is_valid(),
                    "{} -> {} flagged as cycle", task.id, dep
                );
            }
        }
        prop_assert!(!graph.has_cycles());
    }
}

// =============================================================================
// Property Tests: Relationship Graph
// =============================================================================

proptest! {
    /// Contract: each reachable task becomes exactly one node, and each
    /// declared edge between drawn tasks appears exactly once.
    #[test]
    fn relationship_nodes_are_unique(tasks in dag_strategy(1, 15)) {
        let root = tasks.last().map(|t| t.id.clone()).unwrap_or_default();
        let index = TaskIndex::new(&tasks);
        let graph = build_relationship_graph(&index, &root, &LayoutConfig::default());

        let ids: HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        prop_assert_eq!(ids.len(), graph.nodes.len());

        let reachable = reachable_from(&index, &root);
        prop_assert_eq!(ids.len(), reachable.len());

        let edge_ids: HashSet<&str> = graph.edges.iter().map(|e| e.id.as_str()).collect();
        prop_assert_eq!(edge_ids.len(), graph.edges.len());

        let expected_edges: usize = tasks
            .iter()
            .filter(|t| reachable.contains(&t.id))
            .map(|t| t.deps.len())
            .sum();
        prop_assert_eq!(graph.edges.len(), expected_edges);
    }
}
