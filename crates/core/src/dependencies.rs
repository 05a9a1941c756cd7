//! Dependency manager: validated, two-sided edits of dependency edges.
//!
//! Every mutation reads a fresh snapshot from the store, validates against
//! it, then writes the owner first and the counterpart second. The two
//! writes are not atomic. When the second one fails the caller gets
//! [`Error::PartialWrite`], a warning is logged and a
//! [`DependencyEvent::PartialWrite`] is published; [`DependencyManager::reconcile`]
//! repairs the back references afterwards.
//!
//! Mutations through one manager are serialized, so validation and commit
//! see the same graph.

use crate::candidates::{DependencyOption, dependency_candidates};
use crate::config::DependencyConfig;
use crate::drift::{DependencyDrift, drift_report};
use crate::error::{Error, Result, ValidationError};
use crate::minion::{Dependency, Minion, MinionPatch};
use crate::store::{StoreError, TaskStore};
use crate::version::{Version, format_version};
use minions_events::{
    DependencyEvent, EventBus, MinionEvent, emit_dependency_added, emit_dependency_removed,
    emit_dependency_repinned, emit_partial_write,
};
use minions_task_graph::{
    LayoutConfig, RelationshipGraph, TaskIndex, Validity, build_relationship_graph,
    validate_dependency,
};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// Validated dependency edits over a [`TaskStore`].
#[derive(Debug)]
pub struct DependencyManager<S> {
    store: S,
    config: DependencyConfig,
    events: Arc<EventBus>,
    commit: Mutex<()>,
}

impl<S: TaskStore> DependencyManager<S> {
    /// Create a manager with default settings and a private event bus.
    pub fn new(store: S) -> Self {
        Self {
            store,
            config: DependencyConfig::default(),
            events: Arc::new(EventBus::new()),
            commit: Mutex::new(()),
        }
    }

    /// Use `config` instead of the defaults.
    #[must_use]
    pub fn with_config(mut self, config: DependencyConfig) -> Self {
        self.config = config;
        self
    }

    /// Publish dependency events on `events`.
    #[must_use]
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    /// The underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// The bus dependency events are published on.
    pub fn events(&self) -> Arc<EventBus> {
        Arc::clone(&self.events)
    }

    /// Configured dependency cap.
    pub const fn max_dependencies(&self) -> usize {
        self.config.max_dependencies
    }

    /// Add `owner_id -> candidate_id`, pinned at the candidate's live version.
    ///
    /// Adding an edge that already exists returns the existing entry and
    /// writes nothing.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::NotFound`] if the owner or candidate is missing
    /// - [`ValidationError::LimitExceeded`] if the owner already has
    ///   `max_dependencies` dependencies
    /// - [`ValidationError::SelfDependency`], [`ValidationError::CandidateUnavailable`]
    ///   or [`ValidationError::CycleDetected`] from validation
    /// - [`Error::Store`] if the owner write fails (nothing committed)
    /// - [`Error::PartialWrite`] if the back reference write fails
    pub async fn add_dependency(
        &self,
        owner_id: &str,
        candidate_id: &str,
        max_dependencies: usize,
    ) -> Result<Dependency> {
        let _guard = self.lock().await;
        let tasks = self.snapshot().await?;
        let index = TaskIndex::new(&tasks);
        let owner = require(&index, owner_id)?;

        // Self edges are rejected whatever the cap or the current list holds
        if owner_id == candidate_id {
            return Err(ValidationError::SelfDependency {
                task: owner_id.to_string(),
            }
            .into());
        }
        if let Some(existing) = owner.dependency(candidate_id) {
            tracing::debug!(owner = %owner_id, dependency = %candidate_id, "Dependency already present");
            return Ok(existing.clone());
        }
        if owner.dependencies.len() >= max_dependencies {
            return Err(ValidationError::LimitExceeded {
                task: owner_id.to_string(),
                max: max_dependencies,
            }
            .into());
        }
        check(&index, owner_id, candidate_id)?;

        let candidate = index.get(candidate_id);
        let dependency = Dependency::pinned(candidate_id, owner_id, format_version(candidate));

        let mut dependencies = owner.dependencies.clone();
        dependencies.push(dependency.clone());
        self.store
            .update(owner_id, MinionPatch::new().dependencies(dependencies))
            .await
            .map_err(|e| Error::store("update", owner_id, e))?;

        if let Some(candidate) = candidate {
            let dependent_on = with_back_reference(&candidate.dependent_on, &dependency);
            self.store
                .update(candidate_id, MinionPatch::new().dependent_on(dependent_on))
                .await
                .map_err(|e| self.partial_write(owner_id, candidate_id, candidate_id, e))?;
        }

        emit_dependency_added!(owner_id, candidate_id, dependency.version);
        self.publish(DependencyEvent::Added {
            owner: owner_id.to_string(),
            dependency: candidate_id.to_string(),
            version: dependency.version.clone(),
        });
        Ok(dependency)
    }

    /// Remove `owner_id -> candidate_id` and its back reference.
    ///
    /// Removing an edge that does not exist is not an error. Returns whether
    /// anything was written.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::NotFound`] if the owner is missing
    /// - [`Error::Store`] if the owner write fails
    /// - [`Error::PartialWrite`] if the back reference write fails
    pub async fn remove_dependency(&self, owner_id: &str, candidate_id: &str) -> Result<bool> {
        let _guard = self.lock().await;
        let tasks = self.snapshot().await?;
        let index = TaskIndex::new(&tasks);
        let owner = require(&index, owner_id)?;

        let owner_changed = owner.dependency(candidate_id).is_some();
        if owner_changed {
            let dependencies = without_reference(&owner.dependencies, candidate_id);
            self.store
                .update(owner_id, MinionPatch::new().dependencies(dependencies))
                .await
                .map_err(|e| Error::store("update", owner_id, e))?;
        }

        let mut mirror_changed = false;
        if let Some(candidate) = index.get(candidate_id)
            && candidate.dependent(owner_id).is_some()
        {
            let dependent_on = without_reference(&candidate.dependent_on, owner_id);
            let result = self
                .store
                .update(candidate_id, MinionPatch::new().dependent_on(dependent_on))
                .await;
            match result {
                Ok(()) => mirror_changed = true,
                Err(e) if owner_changed => {
                    return Err(self.partial_write(owner_id, candidate_id, candidate_id, e));
                }
                Err(e) => return Err(Error::store("update", candidate_id, e)),
            }
        }

        if owner_changed {
            emit_dependency_removed!(owner_id, candidate_id);
            self.publish(DependencyEvent::Removed {
                owner: owner_id.to_string(),
                dependency: candidate_id.to_string(),
            });
        }
        Ok(owner_changed || mirror_changed)
    }

    /// Replace the owner's whole dependency list.
    ///
    /// Entries are de-duplicated by id (first wins) and re-owned by
    /// `owner_id`. New edges are validated before anything is written and
    /// their pins default to the live version; entries for edges that already
    /// exist are stored as given. Back references are added for new edges and
    /// removed for dropped ones.
    ///
    /// # Errors
    ///
    /// - [`ValidationError`] for the first invalid new edge (nothing written)
    /// - [`Error::VersionParse`] if a pinned version is malformed
    /// - [`Error::Store`] if the owner write fails
    /// - [`Error::PartialWrite`] for the first failed back reference write;
    ///   the remaining back references are still attempted
    pub async fn replace_dependencies(
        &self,
        owner_id: &str,
        new_dependencies: Vec<Dependency>,
    ) -> Result<Vec<Dependency>> {
        let _guard = self.lock().await;
        let tasks = self.snapshot().await?;
        let index = TaskIndex::new(&tasks);
        let owner = require(&index, owner_id)?;

        let old_ids: HashSet<&str> = owner.dependencies.iter().map(|d| d.id.as_str()).collect();
        let mut seen = HashSet::new();
        let mut dependencies = Vec::with_capacity(new_dependencies.len());
        for mut dependency in new_dependencies {
            if !seen.insert(dependency.id.clone()) {
                continue;
            }
            dependency.minion_id = owner_id.to_string();
            if !old_ids.contains(dependency.id.as_str()) {
                check(&index, owner_id, &dependency.id)?;
                let live = format_version(index.get(&dependency.id));
                if dependency.version.is_empty() {
                    dependency.version.clone_from(&live);
                }
                dependency.current_version = live;
            }
            dependency.version.parse::<Version>()?;
            dependencies.push(dependency);
        }

        let added: Vec<Dependency> = dependencies
            .iter()
            .filter(|d| !old_ids.contains(d.id.as_str()))
            .cloned()
            .collect();
        let removed: Vec<String> = owner
            .dependencies
            .iter()
            .filter(|d| !seen.contains(&d.id))
            .map(|d| d.id.clone())
            .collect();

        self.store
            .update(owner_id, MinionPatch::new().dependencies(dependencies.clone()))
            .await
            .map_err(|e| Error::store("update", owner_id, e))?;

        let mut first_failure = None;
        for former in &removed {
            emit_dependency_removed!(owner_id, former);
            self.publish(DependencyEvent::Removed {
                owner: owner_id.to_string(),
                dependency: former.clone(),
            });
            let Some(target) = index.get(former) else {
                continue;
            };
            if target.dependent(owner_id).is_none() {
                continue;
            }
            let patch = MinionPatch::new().dependent_on(without_reference(&target.dependent_on, owner_id));
            if let Err(e) = self.store.update(former, patch).await {
                let err = self.partial_write(owner_id, former, former, e);
                first_failure.get_or_insert(err);
            }
        }
        for dependency in &added {
            emit_dependency_added!(owner_id, dependency.id, dependency.version);
            self.publish(DependencyEvent::Added {
                owner: owner_id.to_string(),
                dependency: dependency.id.clone(),
                version: dependency.version.clone(),
            });
            let Some(target) = index.get(&dependency.id) else {
                continue;
            };
            let patch = MinionPatch::new().dependent_on(with_back_reference(&target.dependent_on, dependency));
            if let Err(e) = self.store.update(&dependency.id, patch).await {
                let err = self.partial_write(owner_id, &dependency.id, &dependency.id, e);
                first_failure.get_or_insert(err);
            }
        }

        match first_failure {
            Some(err) => Err(err),
            None => Ok(dependencies),
        }
    }

    /// Re-pin `owner_id -> candidate_id` to `version`.
    ///
    /// Only the pin and the cached live version change; the graph does not.
    ///
    /// # Errors
    ///
    /// - [`Error::VersionParse`] if `version` is malformed
    /// - [`ValidationError::NotFound`] if the owner is missing or has no such edge
    /// - [`Error::Store`] if the write fails
    pub async fn change_version(
        &self,
        owner_id: &str,
        candidate_id: &str,
        version: &str,
    ) -> Result<Dependency> {
        let version = version.parse::<Version>()?.to_string();
        let _guard = self.lock().await;
        let tasks = self.snapshot().await?;
        let index = TaskIndex::new(&tasks);
        let owner = require(&index, owner_id)?;

        if owner.dependency(candidate_id).is_none() {
            return Err(ValidationError::not_found(candidate_id).into());
        }
        let live = format_version(index.get(candidate_id));
        let mut repinned = None;
        let dependencies: Vec<Dependency> = owner
            .dependencies
            .iter()
            .map(|d| {
                if d.id == candidate_id {
                    let updated = Dependency {
                        version: version.clone(),
                        current_version: live.clone(),
                        ..d.clone()
                    };
                    repinned.get_or_insert_with(|| updated.clone());
                    updated
                } else {
                    d.clone()
                }
            })
            .collect();
        let repinned = repinned.ok_or_else(|| ValidationError::not_found(candidate_id))?;

        self.store
            .update(owner_id, MinionPatch::new().dependencies(dependencies))
            .await
            .map_err(|e| Error::store("update", owner_id, e))?;

        emit_dependency_repinned!(owner_id, candidate_id, version);
        self.publish(DependencyEvent::Repinned {
            owner: owner_id.to_string(),
            dependency: candidate_id.to_string(),
            version,
        });
        Ok(repinned)
    }

    /// Delete a minion and every reference to it.
    ///
    /// Edges in both directions are removed, the minion is detached from its
    /// parent and its children lose their parent. The minion itself is
    /// deleted last.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::NotFound`] if the minion is missing
    /// - [`Error::Store`] for the first failed write; earlier writes stay
    ///   committed and `reconcile` repairs the rest
    pub async fn delete_minion(&self, id: &str) -> Result<()> {
        let _guard = self.lock().await;
        let tasks = self.snapshot().await?;
        let index = TaskIndex::new(&tasks);
        let doomed = require(&index, id)?;
        let parent_id = doomed.parent_id.as_deref();

        for other in tasks.iter().filter(|m| m.id != id) {
            let mut patch = MinionPatch::new();
            if other.dependency(id).is_some() {
                patch = patch.dependencies(without_reference(&other.dependencies, id));
            }
            if other.dependent(id).is_some() {
                patch = patch.dependent_on(without_reference(&other.dependent_on, id));
            }
            if parent_id == Some(other.id.as_str()) || other.children.iter().any(|c| c == id) {
                let children: Vec<String> = other.children.iter().filter(|c| *c != id).cloned().collect();
                patch = patch.children(children);
            }
            if other.parent_id.as_deref() == Some(id) {
                patch = patch.parent_id(None);
            }
            if patch.is_empty() {
                continue;
            }
            let removes_edge = patch.dependencies.is_some();
            self.store
                .update(&other.id, patch)
                .await
                .map_err(|e| Error::store("update", &other.id, e))?;
            if removes_edge {
                emit_dependency_removed!(other.id, id);
                self.publish(DependencyEvent::Removed {
                    owner: other.id.clone(),
                    dependency: id.to_string(),
                });
            }
        }

        self.store
            .delete(id)
            .await
            .map_err(|e| Error::store("delete", id, e))?;
        tracing::info!(minion = %id, "Deleted minion and its references");
        Ok(())
    }

    /// Minions `owner_id` may add as dependencies, filtered by `search`.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::NotFound`] if the owner is missing
    /// - [`Error::Store`] if the store cannot be listed
    pub async fn available_dependencies(
        &self,
        owner_id: &str,
        search: &str,
    ) -> Result<Vec<DependencyOption>> {
        let tasks = self.snapshot().await?;
        let index = TaskIndex::new(&tasks);
        let owner = require(&index, owner_id)?;
        Ok(dependency_candidates(
            &index,
            owner_id,
            &owner.dependencies,
            search,
        ))
    }

    /// Drift of every dependency `owner_id` declares.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::NotFound`] if the owner is missing
    /// - [`Error::VersionParse`] if a pin is malformed
    /// - [`Error::Store`] if the store cannot be listed
    pub async fn drift(&self, owner_id: &str) -> Result<Vec<DependencyDrift>> {
        let tasks = self.snapshot().await?;
        let index = TaskIndex::new(&tasks);
        let owner = require(&index, owner_id)?;
        Ok(drift_report(owner, &index)?)
    }

    /// Relationship diagram rooted at `root_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the store cannot be listed.
    pub async fn relationships(&self, root_id: &str, layout: &LayoutConfig) -> Result<RelationshipGraph> {
        let tasks = self.snapshot().await?;
        Ok(build_relationship_graph(&TaskIndex::new(&tasks), root_id, layout))
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, ()> {
        self.commit.lock().await
    }

    pub(crate) async fn snapshot(&self) -> Result<Vec<Minion>> {
        self.store
            .list()
            .await
            .map_err(|e| Error::store("list", "*", e))
    }

    pub(crate) fn publish(&self, event: DependencyEvent) {
        if let Err(e) = self.events.publish(MinionEvent::dependency(event)) {
            tracing::debug!(error = %e, "Dependency event dropped");
        }
    }

    fn partial_write(
        &self,
        owner: &str,
        dependency: &str,
        failed_task: &str,
        source: StoreError,
    ) -> Error {
        emit_partial_write!(owner, dependency, failed_task);
        self.publish(DependencyEvent::PartialWrite {
            owner: owner.to_string(),
            dependency: dependency.to_string(),
            failed_task: failed_task.to_string(),
        });
        Error::PartialWrite {
            owner: owner.to_string(),
            counterpart: dependency.to_string(),
            failed_task: failed_task.to_string(),
            source,
        }
    }
}

pub(crate) fn require<'a>(index: &TaskIndex<'a, Minion>, id: &str) -> Result<&'a Minion> {
    index
        .get(id)
        .ok_or_else(|| ValidationError::not_found(id).into())
}

fn check(index: &TaskIndex<'_, Minion>, owner_id: &str, candidate_id: &str) -> Result<()> {
    match validate_dependency(index, owner_id, candidate_id) {
        Validity::Valid => Ok(()),
        Validity::Invalid(reason) => {
            tracing::debug!(owner = %owner_id, candidate = %candidate_id, %reason, "Dependency rejected");
            Err(ValidationError::from_reason(reason, owner_id, candidate_id).into())
        }
    }
}

/// `entries` with any reference to `id` removed.
pub(crate) fn without_reference(entries: &[Dependency], id: &str) -> Vec<Dependency> {
    entries.iter().filter(|d| d.id != id).cloned().collect()
}

/// `dependent_on` with a fresh back reference for `dependency`.
fn with_back_reference(dependent_on: &[Dependency], dependency: &Dependency) -> Vec<Dependency> {
    let mut entries = without_reference(dependent_on, &dependency.minion_id);
    entries.push(dependency.mirror());
    entries
}
