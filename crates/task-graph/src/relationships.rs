//! Relationship diagram builder.
//!
//! Produces the positioned node and edge lists for the dependency canvas:
//! everything reachable from a root task through `dependencies` and
//! `children`, each task drawn once.

use crate::{TaskIndex, TaskNodeData};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Spacing constants for the offset layout.
///
/// Dependencies are drawn above their owner, children below. Siblings at the
/// same level are `horizontal_spacing` apart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    /// Distance between siblings of the same relationship level.
    pub horizontal_spacing: f64,
    /// Distance between a task and the row of its dependencies or children.
    pub vertical_step: f64,
    /// Leftward shift of the first dependency relative to its owner.
    pub dependency_offset: f64,
    /// Leftward shift of the first child relative to its parent.
    pub child_offset: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            horizontal_spacing: 350.0,
            vertical_step: 200.0,
            dependency_offset: 400.0,
            child_offset: 200.0,
        }
    }
}

/// Canvas coordinates of a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate; dependencies have smaller values than owners.
    pub y: f64,
}

/// How an edge relates its two endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeKind {
    /// `source` declares a dependency on `target`.
    Dependency,
    /// `source` is the parent of `target`.
    ParentChild,
    /// `source` depends on `target`, which is also its parent or child.
    /// Replaces the [`EdgeKind::ParentChild`] edge for that pair whichever
    /// side holds the dependency.
    ParentDependency,
}

/// A task drawn on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipNode {
    /// Task id.
    pub id: String,
    /// Layout position.
    pub position: Position,
}

/// A directed edge between two drawn tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipEdge {
    /// Stable edge id.
    pub id: String,
    /// Owner or parent.
    pub source: String,
    /// Dependency or child.
    pub target: String,
    /// Relationship classification.
    pub kind: EdgeKind,
}

/// Node and edge lists ready for rendering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipGraph {
    /// One node per reachable available task.
    pub nodes: Vec<RelationshipNode>,
    /// One edge per distinct relationship between drawn tasks.
    pub edges: Vec<RelationshipEdge>,
}

impl RelationshipGraph {
    /// Find a node by task id.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&RelationshipNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Edges of the given kind.
    pub fn edges_of_kind(&self, kind: EdgeKind) -> impl Iterator<Item = &RelationshipEdge> {
        self.edges.iter().filter(move |edge| edge.kind == kind)
    }
}

/// Build the relationship graph rooted at `root_id`.
///
/// The root sits at the origin. Traversal uses an explicit stack and a
/// processed set, so a task reachable through several paths yields one node
/// and every edge is emitted once, by its owner. Unavailable tasks are
/// skipped entirely, along with anything reachable only through them. A
/// missing or unavailable root yields an empty graph.
///
/// Positions are offsets from the owning task only. Siblings never overlap,
/// but rows fanned out from neighbouring owners can: with the default
/// layout the second dependency of one task and the first dependency of the
/// next sibling land on the same point.
#[must_use]
pub fn build_relationship_graph<T: TaskNodeData>(
    index: &TaskIndex<'_, T>,
    root_id: &str,
    layout: &LayoutConfig,
) -> RelationshipGraph {
    let mut graph = RelationshipGraph::default();

    let Some(root) = index.get(root_id).filter(|task| task.is_available()) else {
        debug!(root = root_id, "Root task missing or unavailable, empty graph");
        return graph;
    };

    let mut processed: HashSet<&str> = HashSet::new();
    let mut edge_ids: HashSet<String> = HashSet::new();
    let mut stack: Vec<(&T, Position)> = vec![(root, Position { x: 0.0, y: 0.0 })];

    while let Some((task, position)) = stack.pop() {
        if !processed.insert(task.id()) {
            continue;
        }

        graph.nodes.push(RelationshipNode {
            id: task.id().to_string(),
            position,
        });

        let mut next: Vec<(&T, Position)> = Vec::new();

        let deps = available_targets(index, task.dependency_ids());
        for (i, dep) in deps.into_iter().enumerate() {
            let kind = if is_hierarchy_pair(task, dep) {
                EdgeKind::ParentDependency
            } else {
                EdgeKind::Dependency
            };
            push_edge(&mut graph, &mut edge_ids, task.id(), dep.id(), kind);
            next.push((
                dep,
                Position {
                    x: position.x - layout.dependency_offset + offset(i, layout),
                    y: position.y - layout.vertical_step,
                },
            ));
        }

        let children = available_targets(index, task.child_ids());
        for (i, child) in children.into_iter().enumerate() {
            // Either direction of dependency is drawn as the combined edge
            if !task.depends_on(child.id()) && !child.depends_on(task.id()) {
                push_edge(
                    &mut graph,
                    &mut edge_ids,
                    task.id(),
                    child.id(),
                    EdgeKind::ParentChild,
                );
            }
            next.push((
                child,
                Position {
                    x: position.x - layout.child_offset + offset(i, layout),
                    y: position.y + layout.vertical_step,
                },
            ));
        }

        // Reverse so the first dependency is explored first.
        stack.extend(next.into_iter().rev());
    }

    debug!(
        root = root_id,
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        "Built relationship graph"
    );

    graph
}

fn available_targets<'a, 's, T: TaskNodeData>(
    index: &TaskIndex<'a, T>,
    ids: impl Iterator<Item = &'s str>,
) -> Vec<&'a T> {
    ids.filter_map(|id| index.get(id))
        .filter(|task| task.is_available())
        .collect()
}

fn is_hierarchy_pair<T: TaskNodeData>(task: &T, other: &T) -> bool {
    let lists = |a: &T, b: &T| {
        a.parent_id() == Some(b.id()) || a.child_ids().any(|child| child == b.id())
    };
    lists(task, other) || lists(other, task)
}

#[allow(clippy::cast_precision_loss)]
fn offset(i: usize, layout: &LayoutConfig) -> f64 {
    i as f64 * layout.horizontal_spacing
}

fn push_edge(
    graph: &mut RelationshipGraph,
    edge_ids: &mut HashSet<String>,
    source: &str,
    target: &str,
    kind: EdgeKind,
) {
    let id = match kind {
        EdgeKind::ParentChild => format!("{source}-{target}-child"),
        EdgeKind::Dependency | EdgeKind::ParentDependency => format!("{source}-{target}"),
    };
    if edge_ids.insert(id.clone()) {
        graph.edges.push(RelationshipEdge {
            id,
            source: source.to_string(),
            target: target.to_string(),
            kind,
        });
    }
}
