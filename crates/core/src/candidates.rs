//! Option lists for the dependency and parent pickers.

use crate::minion::{Dependency, Minion, Priority, Status};
use minions_task_graph::{TaskIndex, TaskNodeData, validate_dependency};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;

/// A minion that may be added as a dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyOption {
    /// Minion id.
    pub id: String,
    /// Minion title.
    pub label: String,
    /// Live version.
    pub version: String,
    /// Work state.
    pub status: Status,
    /// Priority.
    pub priority: Priority,
}

/// A minion that may become a parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentOption {
    /// Minion id.
    pub id: String,
    /// Minion title.
    pub label: String,
    /// Live version.
    pub version: String,
    /// Work state.
    pub status: Status,
    /// Priority.
    pub priority: Priority,
    /// Number of children it already has.
    pub children: usize,
    /// Whether it has a parent itself.
    pub has_parent: bool,
}

/// Minions `owner_id` could depend on next.
///
/// Skips the owner, unavailable minions, anything in `selected` and anything
/// the validator rejects. Sorted by priority, then open before completed,
/// then label. `search` filters on a case-insensitive label substring; an
/// empty term matches everything.
#[must_use]
pub fn dependency_candidates(
    index: &TaskIndex<'_, Minion>,
    owner_id: &str,
    selected: &[Dependency],
    search: &str,
) -> Vec<DependencyOption> {
    let selected: HashSet<&str> = selected.iter().map(|d| d.id.as_str()).collect();
    let needle = search.to_lowercase();

    let mut options: Vec<DependencyOption> = index
        .iter()
        .filter(|m| m.id != owner_id && m.is_available() && !selected.contains(m.id.as_str()))
        .filter(|m| validate_dependency(index, owner_id, &m.id).is_valid())
        .filter(|m| label_matches(&m.title, &needle))
        .map(|m| DependencyOption {
            id: m.id.clone(),
            label: m.title.clone(),
            version: m.version.to_string(),
            status: m.status,
            priority: m.priority,
        })
        .collect();

    options.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| completed_last(a.status, b.status))
            .then_with(|| compare_labels(&a.label, &b.label))
    });
    options
}

/// Minions `task_id` could be moved under.
///
/// Skips the minion itself, unavailable minions and its descendants. Sorted
/// open before completed, then by priority, then label.
#[must_use]
pub fn parent_candidates(
    index: &TaskIndex<'_, Minion>,
    task_id: &str,
    search: &str,
) -> Vec<ParentOption> {
    let needle = search.to_lowercase();

    let mut options: Vec<ParentOption> = index
        .iter()
        .filter(|m| m.id != task_id && m.is_available())
        .filter(|m| !is_descendant(index, task_id, &m.id))
        .filter(|m| label_matches(&m.title, &needle))
        .map(|m| ParentOption {
            id: m.id.clone(),
            label: m.title.clone(),
            version: m.version.to_string(),
            status: m.status,
            priority: m.priority,
            children: m.children.len(),
            has_parent: m.parent_id.is_some(),
        })
        .collect();

    options.sort_by(|a, b| {
        completed_last(a.status, b.status)
            .then_with(|| a.priority.cmp(&b.priority))
            .then_with(|| compare_labels(&a.label, &b.label))
    });
    options
}

/// Whether `candidate_id` sits below `ancestor_id` in the hierarchy.
///
/// Walks up the parent chain from `candidate_id`. Stops on a repeated id, so
/// a corrupt parent loop cannot hang it.
#[must_use]
pub fn is_descendant(index: &TaskIndex<'_, Minion>, ancestor_id: &str, candidate_id: &str) -> bool {
    let mut visited = HashSet::new();
    let mut current = index.get(candidate_id).and_then(|m| m.parent_id.as_deref());
    while let Some(parent) = current {
        if parent == ancestor_id {
            return true;
        }
        if !visited.insert(parent) {
            tracing::warn!(minion = %candidate_id, at = %parent, "Parent chain loops");
            return false;
        }
        current = index.get(parent).and_then(|m| m.parent_id.as_deref());
    }
    false
}

fn label_matches(label: &str, needle: &str) -> bool {
    needle.is_empty() || label.to_lowercase().contains(needle)
}

fn completed_last(a: Status, b: Status) -> Ordering {
    (a == Status::Completed).cmp(&(b == Status::Completed))
}

fn compare_labels(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}
