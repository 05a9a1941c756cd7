//! Dependency graph algorithms for minions.
//!
//! This crate holds the graph side of minion management: deciding whether a
//! new dependency edge keeps the graph acyclic, auditing an existing task set
//! with petgraph, and laying out the relationship diagram rooted at a task.
//!
//! # Key Types
//!
//! - [`TaskNodeData`]: Trait that task types implement to take part in the graph
//! - [`TaskIndex`]: Id lookup over an immutable snapshot of tasks
//! - [`DependencyGraph`]: petgraph view of every declared dependency edge
//! - [`RelationshipGraph`]: Positioned nodes and classified edges for display
//!
//! # Example
//!
//! ```ignore
//! use minions_task_graph::{TaskIndex, validate_dependency};
//!
//! let index = TaskIndex::new(&tasks);
//! let validity = validate_dependency(&index, "a", "b");
//! if let Some(reason) = validity.reason() {
//!     eprintln!("cannot depend on b: {reason}");
//! }
//! ```

mod graph;
mod index;
mod relationships;
mod validation;

pub use graph::DependencyGraph;
pub use index::TaskIndex;
pub use relationships::{
    EdgeKind, LayoutConfig, Position, RelationshipEdge, RelationshipGraph, RelationshipNode,
    build_relationship_graph,
};
pub use validation::{InvalidReason, Validity, validate_dependency};

/// Trait for task data that can be stored in the task graph.
///
/// Implement this trait for your task type to let it participate in
/// dependency validation, auditing and relationship layout.
pub trait TaskNodeData {
    /// Unique identifier of the task.
    fn id(&self) -> &str;

    /// Returns the ids of tasks this task depends on, in declaration order.
    fn dependency_ids(&self) -> impl Iterator<Item = &str>;

    /// Returns the ids of this task's children, in display order.
    fn child_ids(&self) -> impl Iterator<Item = &str>;

    /// Returns the id of this task's parent, if any.
    fn parent_id(&self) -> Option<&str>;

    /// Whether the task may be offered as a dependency or parent and drawn in
    /// the relationship graph. Archived and soft-deleted tasks are not.
    fn is_available(&self) -> bool;

    /// Whether this task declares a dependency on `id`.
    fn depends_on(&self, id: &str) -> bool {
        self.dependency_ids().any(|dep| dep == id)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::TaskNodeData;

    /// Simple test task implementation
    #[derive(Clone, Debug, Default)]
    pub struct TestTask {
        pub id: String,
        pub deps: Vec<String>,
        pub children: Vec<String>,
        pub parent: Option<String>,
        pub archived: bool,
    }

    impl TestTask {
        pub fn new(id: &str, deps: &[&str]) -> Self {
            Self {
                id: id.to_string(),
                deps: deps.iter().map(|s| (*s).to_string()).collect(),
                ..Self::default()
            }
        }

        pub fn with_children(mut self, children: &[&str]) -> Self {
            self.children = children.iter().map(|s| (*s).to_string()).collect();
            self
        }

        pub fn with_parent(mut self, parent: &str) -> Self {
            self.parent = Some(parent.to_string());
            self
        }

        pub fn archived(mut self) -> Self {
            self.archived = true;
            self
        }
    }

    impl TaskNodeData for TestTask {
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
            !self.archived
        }
    }
}
