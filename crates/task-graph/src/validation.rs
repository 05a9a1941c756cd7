//! Validation of proposed dependency edges.
//!
//! A proposed edge `current -> candidate` is accepted only if the candidate
//! exists, is available, is not `current` itself, and no walk along
//! `dependencies` starting at the candidate comes back onto its own path or
//! onto `current`.

use crate::{TaskIndex, TaskNodeData};
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

/// Why a proposed dependency was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvalidReason {
    /// The candidate is the task itself.
    SelfDependency,
    /// Adding the edge would close a dependency cycle.
    CycleDetected,
    /// The candidate is archived or soft-deleted.
    CandidateUnavailable,
    /// The candidate does not exist.
    NotFound,
}

impl InvalidReason {
    /// Stable kebab-case name of the reason.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SelfDependency => "self-dependency",
            Self::CycleDetected => "cycle-detected",
            Self::CandidateUnavailable => "candidate-unavailable",
            Self::NotFound => "not-found",
        }
    }
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of validating a proposed dependency edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    /// The edge may be added.
    Valid,
    /// The edge must be rejected.
    Invalid(InvalidReason),
}

impl Validity {
    /// Whether the edge may be added.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        matches!(self, Self::Valid)
    }

    /// The rejection reason, if any.
    #[must_use]
    pub const fn reason(self) -> Option<InvalidReason> {
        match self {
            Self::Valid => None,
            Self::Invalid(reason) => Some(reason),
        }
    }
}

/// Decide whether `current_id` may depend on `candidate_id`.
///
/// The cycle walk is an explicit-stack depth-first search. `on_path` holds
/// `current_id` plus the ids on the path being explored and is unwound on
/// backtrack, so a task reached through two independent paths (a diamond)
/// is not mistaken for a cycle. Fully explored tasks are remembered in
/// `finished`; re-entering one cannot reach the current path, so it is
/// skipped.
#[must_use]
pub fn validate_dependency<T: TaskNodeData>(
    index: &TaskIndex<'_, T>,
    current_id: &str,
    candidate_id: &str,
) -> Validity {
    if candidate_id == current_id {
        return Validity::Invalid(InvalidReason::SelfDependency);
    }

    let Some(candidate) = index.get(candidate_id) else {
        return Validity::Invalid(InvalidReason::NotFound);
    };

    if !candidate.is_available() {
        return Validity::Invalid(InvalidReason::CandidateUnavailable);
    }

    if reaches_path(index, current_id, candidate_id) {
        debug!(
            current = current_id,
            candidate = candidate_id,
            "Rejecting dependency that would close a cycle"
        );
        return Validity::Invalid(InvalidReason::CycleDetected);
    }

    Validity::Valid
}

/// Walk `dependencies` from `start`; true if the walk steps onto an id
/// already on the path (seeded with `current_id`).
fn reaches_path<T: TaskNodeData>(index: &TaskIndex<'_, T>, current_id: &str, start: &str) -> bool {
    let mut on_path: HashSet<&str> = HashSet::from([current_id, start]);
    let mut finished: HashSet<&str> = HashSet::new();
    // Each frame: task id and its not-yet-visited dependency ids (reversed for pop order).
    let mut stack: Vec<(&str, Vec<&str>)> = vec![(start, pending_deps(index, start))];

    while let Some((id, pending)) = stack.last_mut() {
        let Some(dep) = pending.pop() else {
            on_path.remove(*id);
            finished.insert(*id);
            stack.pop();
            continue;
        };

        if on_path.contains(dep) {
            return true;
        }
        if finished.contains(dep) {
            continue;
        }

        on_path.insert(dep);
        stack.push((dep, pending_deps(index, dep)));
    }

    false
}

fn pending_deps<'a, T: TaskNodeData>(index: &TaskIndex<'a, T>, id: &str) -> Vec<&'a str> {
    // Unknown ids are leaves: a dangling edge cannot lead anywhere.
    index
        .get(id)
        .map(|task| {
            let mut deps: Vec<&'a str> = task.dependency_ids().collect();
            deps.reverse();
            deps
        })
        .unwrap_or_default()
}
