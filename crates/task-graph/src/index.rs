//! Id lookup over a snapshot of tasks.

use crate::TaskNodeData;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tracing::warn;

/// Read-only index over a task snapshot.
///
/// Keeps the snapshot's original order for iteration and a hash map for
/// id lookups. When ids repeat, the first occurrence wins.
#[derive(Debug)]
pub struct TaskIndex<'a, T> {
    order: Vec<&'a T>,
    by_id: HashMap<&'a str, &'a T>,
}

impl<'a, T: TaskNodeData> TaskIndex<'a, T> {
    /// Build an index over the given tasks.
    #[must_use]
    pub fn new(tasks: impl IntoIterator<Item = &'a T>) -> Self {
        let mut order = Vec::new();
        let mut by_id = HashMap::new();

        for task in tasks {
            match by_id.entry(task.id()) {
                Entry::Vacant(slot) => {
                    slot.insert(task);
                    order.push(task);
                }
                Entry::Occupied(_) => {
                    warn!(task = task.id(), "Duplicate task id in snapshot, ignoring");
                }
            }
        }

        Self { order, by_id }
    }

    /// Look up a task by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&'a T> {
        self.by_id.get(id).copied()
    }

    /// Check if a task exists in the snapshot.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Iterate over tasks in snapshot order.
    pub fn iter(&self) -> impl Iterator<Item = &'a T> + '_ {
        self.order.iter().copied()
    }

    /// Number of distinct tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestTask;

    #[test]
    fn test_lookup_and_order() {
        let tasks = vec![TestTask::new("b", &[]), TestTask::new("a", &["b"])];
        let index = TaskIndex::new(&tasks);

        assert_eq!(index.len(), 2);
        assert!(index.contains("a"));
        assert_eq!(index.get("a").map(|t| t.deps.len()), Some(1));
        let ids: Vec<&str> = index.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let tasks = vec![TestTask::new("a", &[]), TestTask::new("a", &["x"])];
        let index = TaskIndex::new(&tasks);

        assert_eq!(index.len(), 1);
        assert!(index.get("a").is_some_and(|t| t.deps.is_empty()));
    }

    #[test]
    fn test_empty_index() {
        let tasks: Vec<TestTask> = vec![];
        let index = TaskIndex::new(&tasks);
        assert!(index.is_empty());
        assert!(index.get("missing").is_none());
    }
}
