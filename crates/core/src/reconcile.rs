//! Back reference reconciliation and auditing.
//!
//! `dependencies` and `parentId` are the source of truth. `dependentOn` and
//! `children` are derived from them and can drift after a partial write;
//! [`plan_reconciliation`] computes the rewrite that restores them and
//! [`DependencyManager::reconcile`] applies it.

use crate::dependencies::DependencyManager;
use crate::error::{Error, Result};
use crate::minion::{Dependency, Minion, MinionPatch};
use crate::store::TaskStore;
use crate::version::format_version;
use minions_events::{DependencyEvent, emit_reconciled};
use minions_task_graph::{DependencyGraph, TaskIndex};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Rewrite needed for one minion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileChange {
    /// Minion to rewrite.
    pub minion_id: String,
    /// Dependencies without dangling or duplicate entries, cache refreshed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<Dependency>>,
    /// Recomputed back references.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependent_on: Option<Vec<Dependency>>,
    /// Recomputed children.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<String>>,
    /// The parent is missing or the minion itself.
    pub clear_parent: bool,
}

impl ReconcileChange {
    fn new(minion_id: &str) -> Self {
        Self {
            minion_id: minion_id.to_string(),
            dependencies: None,
            dependent_on: None,
            children: None,
            clear_parent: false,
        }
    }

    fn is_empty(&self) -> bool {
        self.dependencies.is_none()
            && self.dependent_on.is_none()
            && self.children.is_none()
            && !self.clear_parent
    }

    /// The store patch performing this change.
    #[must_use]
    pub fn to_patch(&self) -> MinionPatch {
        let mut patch = MinionPatch::new();
        patch.dependencies.clone_from(&self.dependencies);
        patch.dependent_on.clone_from(&self.dependent_on);
        patch.children.clone_from(&self.children);
        if self.clear_parent {
            patch.parent_id = Some(None);
        }
        patch
    }
}

/// Every rewrite needed to make a snapshot consistent.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ReconciliationPlan {
    /// Changes in snapshot order.
    pub changes: Vec<ReconcileChange>,
}

impl ReconciliationPlan {
    /// Whether the snapshot is already consistent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of minions to rewrite.
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }
}

/// Compute the rewrite that makes every back reference match its forward
/// reference.
///
/// - Dependencies on missing minions are dropped, duplicates collapse to the
///   first entry and `currentVersion` is refreshed.
/// - `dependentOn` holds exactly one mirror per minion depending on it.
/// - `children` holds exactly the minions naming it as parent. Existing order
///   is kept and newcomers are appended in snapshot order.
/// - A parent that is missing or the minion itself is cleared.
#[must_use]
pub fn plan_reconciliation(tasks: &[Minion]) -> ReconciliationPlan {
    let index = TaskIndex::new(tasks);

    let mut dependencies: HashMap<&str, Vec<Dependency>> = HashMap::new();
    let mut back_refs: HashMap<&str, Vec<Dependency>> = HashMap::new();
    for owner in index.iter() {
        let mut seen = HashSet::new();
        let expected: Vec<Dependency> = owner
            .dependencies
            .iter()
            .filter(|d| index.contains(&d.id) && seen.insert(d.id.as_str()))
            .map(|d| Dependency {
                minion_id: owner.id.clone(),
                current_version: format_version(index.get(&d.id)),
                ..d.clone()
            })
            .collect();
        for dependency in &expected {
            if let Some(target) = index.get(&dependency.id) {
                back_refs
                    .entry(target.id.as_str())
                    .or_default()
                    .push(dependency.mirror());
            }
        }
        dependencies.insert(owner.id.as_str(), expected);
    }

    let parent_of = |m: &Minion| -> Option<String> {
        m.parent_id
            .as_ref()
            .filter(|p| **p != m.id && index.contains(p))
            .cloned()
    };
    let mut claimed_children: HashMap<String, Vec<&str>> = HashMap::new();
    for child in index.iter() {
        if let Some(parent) = parent_of(child) {
            claimed_children.entry(parent).or_default().push(child.id.as_str());
        }
    }

    let mut plan = ReconciliationPlan::default();
    for minion in index.iter() {
        let mut change = ReconcileChange::new(&minion.id);

        if let Some(expected) = dependencies.remove(minion.id.as_str())
            && expected != minion.dependencies
        {
            change.dependencies = Some(expected);
        }

        let expected = back_refs.remove(minion.id.as_str()).unwrap_or_default();
        if !same_entries(&expected, &minion.dependent_on) {
            change.dependent_on = Some(expected);
        }

        let claimed = claimed_children.remove(&minion.id).unwrap_or_default();
        let mut children: Vec<String> = Vec::with_capacity(claimed.len());
        for id in minion.children.iter().map(String::as_str).chain(claimed.iter().copied()) {
            if claimed.contains(&id) && !children.iter().any(|c| c == id) {
                children.push(id.to_string());
            }
        }
        if children != minion.children {
            change.children = Some(children);
        }

        change.clear_parent = minion.parent_id.is_some() && parent_of(minion).is_none();

        if !change.is_empty() {
            tracing::debug!(minion = %minion.id, "Reconciliation needed");
            plan.changes.push(change);
        }
    }
    plan
}

fn same_entries(a: &[Dependency], b: &[Dependency]) -> bool {
    let key = |d: &Dependency| (d.id.clone(), d.version.clone(), d.current_version.clone());
    let mut a: Vec<_> = a.iter().map(key).collect();
    let mut b: Vec<_> = b.iter().map(key).collect();
    a.sort();
    b.sort();
    a == b && a.windows(2).all(|w| w[0].0 != w[1].0)
}

/// Inconsistencies found in a snapshot. Nothing is modified.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    /// Minions listing themselves as a dependency.
    pub self_dependencies: Vec<String>,
    /// `(owner, dependency)` edges whose dependency does not exist.
    pub dangling: Vec<(String, String)>,
    /// `(owner, dependency)` edges without a back reference.
    pub missing_back_references: Vec<(String, String)>,
    /// `(holder, owner)` back references with no matching edge.
    pub orphaned_back_references: Vec<(String, String)>,
    /// Dependency cycles of two or more minions, ids sorted.
    pub cycles: Vec<Vec<String>>,
    /// `(parent, child)` pairs where `children` and `parentId` disagree.
    pub hierarchy_mismatches: Vec<(String, String)>,
}

impl AuditReport {
    /// Whether nothing was found.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.self_dependencies.is_empty()
            && self.dangling.is_empty()
            && self.missing_back_references.is_empty()
            && self.orphaned_back_references.is_empty()
            && self.cycles.is_empty()
            && self.hierarchy_mismatches.is_empty()
    }

    /// Total number of findings.
    #[must_use]
    pub fn finding_count(&self) -> usize {
        self.self_dependencies.len()
            + self.dangling.len()
            + self.missing_back_references.len()
            + self.orphaned_back_references.len()
            + self.cycles.len()
            + self.hierarchy_mismatches.len()
    }
}

/// Audit a snapshot for broken invariants.
#[must_use]
pub fn audit(tasks: &[Minion]) -> AuditReport {
    let index = TaskIndex::new(tasks);
    let graph = DependencyGraph::from_index(&index);
    let cycles = if graph.has_cycles() {
        graph.cycles().into_iter().filter(|c| c.len() > 1).collect()
    } else {
        Vec::new()
    };
    let mut report = AuditReport {
        dangling: graph.dangling_edges().to_vec(),
        cycles,
        ..AuditReport::default()
    };

    for minion in index.iter() {
        if minion.dependency(&minion.id).is_some() {
            report.self_dependencies.push(minion.id.clone());
        }
        for dependency in &minion.dependencies {
            if let Some(target) = index.get(&dependency.id)
                && target.dependent(&minion.id).is_none()
            {
                report
                    .missing_back_references
                    .push((minion.id.clone(), dependency.id.clone()));
            }
        }
        let owners = graph.dependents_of(&minion.id);
        for back in &minion.dependent_on {
            if !owners.contains(&back.id.as_str()) {
                report
                    .orphaned_back_references
                    .push((minion.id.clone(), back.id.clone()));
            }
        }
        for child in &minion.children {
            let agrees = index
                .get(child)
                .is_some_and(|c| c.parent_id.as_deref() == Some(minion.id.as_str()));
            if !agrees {
                report
                    .hierarchy_mismatches
                    .push((minion.id.clone(), child.clone()));
            }
        }
        if let Some(parent) = minion.parent_id.as_deref() {
            let listed = index
                .get(parent)
                .is_some_and(|p| p.children.iter().any(|c| *c == minion.id));
            if !listed {
                report
                    .hierarchy_mismatches
                    .push((parent.to_string(), minion.id.clone()));
            }
        }
    }

    if !report.is_clean() {
        tracing::warn!(findings = report.finding_count(), "Audit found inconsistencies");
    }
    report
}

/// Outcome of [`DependencyManager::reconcile`].
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReport {
    /// Ids of the minions rewritten.
    pub updated: Vec<String>,
}

impl<S: TaskStore> DependencyManager<S> {
    /// Rebuild every back reference from a fresh snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] for the first failed write. Earlier writes
    /// stay committed; running `reconcile` again finishes the job.
    pub async fn reconcile(&self) -> Result<ReconciliationReport> {
        let _guard = self.lock().await;
        let tasks = self.snapshot().await?;
        let plan = plan_reconciliation(&tasks);

        let mut report = ReconciliationReport::default();
        for change in plan.changes {
            self.store()
                .update(&change.minion_id, change.to_patch())
                .await
                .map_err(|e| Error::store("update", &change.minion_id, e))?;
            report.updated.push(change.minion_id);
        }

        emit_reconciled!(report.updated.len());
        self.publish(DependencyEvent::Reconciled {
            updated_tasks: report.updated.len(),
        });
        Ok(report)
    }

    /// Audit a fresh snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the store cannot be listed.
    pub async fn audit(&self) -> Result<AuditReport> {
        Ok(audit(&self.snapshot().await?))
    }
}
