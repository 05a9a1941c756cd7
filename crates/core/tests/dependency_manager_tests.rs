//! Integration tests for the dependency manager over a task store.
//!
//! Covers the full add / bump / drift / reject flow, limit enforcement,
//! mirror consistency and the partial write path with a store that fails on
//! demand.

#![allow(clippy::unwrap_used, clippy::panic)]

use async_trait::async_trait;
use minions_core::{
    Dependency, DependencyManager, Error, InMemoryStore, Minion, MinionPatch, StoreError,
    TaskStore, ValidationError, Version, audit, is_outdated, version_diff,
};
use minions_events::{DependencyEvent, EventCategory};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

fn minions(ids: &[&str]) -> Vec<Minion> {
    ids.iter().map(|id| Minion::new(*id, id.to_uppercase())).collect()
}

fn validation_kind(err: &Error) -> Option<&'static str> {
    err.as_validation().map(ValidationError::kind)
}

/// Store wrapper whose updates fail for selected minion ids.
struct FlakyStore {
    inner: InMemoryStore,
    fail_updates_for: Mutex<HashSet<String>>,
}

impl FlakyStore {
    fn new(minions: Vec<Minion>) -> Self {
        Self {
            inner: InMemoryStore::with_minions(minions),
            fail_updates_for: Mutex::default(),
        }
    }

    fn fail_updates_for(&self, id: &str) {
        self.fail_updates_for.lock().unwrap().insert(id.to_string());
    }

    fn heal(&self) {
        self.fail_updates_for.lock().unwrap().clear();
    }
}

#[async_trait]
impl TaskStore for FlakyStore {
    async fn list(&self) -> Result<Vec<Minion>, StoreError> {
        self.inner.list().await
    }

    async fn create(&self, minion: Minion) -> Result<(), StoreError> {
        self.inner.create(minion).await
    }

    async fn update(&self, id: &str, patch: MinionPatch) -> Result<(), StoreError> {
        if self.fail_updates_for.lock().unwrap().contains(id) {
            return Err(StoreError::backend(format!("injected failure for {id}")));
        }
        self.inner.update(id, patch).await
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.inner.delete(id).await
    }
}

#[tokio::test]
async fn test_end_to_end_drift_scenario() {
    let manager = DependencyManager::new(InMemoryStore::with_minions(minions(&["a", "b", "c"])));

    let dep = manager.add_dependency("a", "b", 10).await.unwrap();
    assert_eq!(dep.version, "0.0.0");

    // External edit bumps B
    manager
        .store()
        .update("b", MinionPatch::new().version(Version::new(0, 0, 1)))
        .await
        .unwrap();

    let a = manager.store().get("a").await.unwrap().unwrap();
    let b = manager.store().get("b").await.unwrap().unwrap();
    let pinned = a.dependency("b").unwrap();
    assert!(is_outdated(pinned, Some(&b)).unwrap());
    assert_eq!(
        version_diff(pinned, Some(&b)).unwrap().as_deref(),
        Some("Minor version change")
    );

    let drift = manager.drift("a").await.unwrap();
    assert_eq!(drift.len(), 1);
    assert!(drift[0].is_outdated);

    let err = manager.add_dependency("b", "a", 10).await.unwrap_err();
    assert_eq!(validation_kind(&err), Some("cycle-detected"));
}

#[tokio::test]
async fn test_limit_enforcement() {
    let manager = DependencyManager::new(InMemoryStore::with_minions(minions(&[
        "owner", "d1", "d2", "d3",
    ])));

    manager.add_dependency("owner", "d1", 2).await.unwrap();
    manager.add_dependency("owner", "d2", 2).await.unwrap();

    let err = manager.add_dependency("owner", "d3", 2).await.unwrap_err();
    assert_eq!(validation_kind(&err), Some("limit-exceeded"));

    // Re-adding at the limit is a no-op, not an error
    let again = manager.add_dependency("owner", "d2", 2).await.unwrap();
    assert_eq!(again.id, "d2");
    let owner = manager.store().get("owner").await.unwrap().unwrap();
    assert_eq!(owner.dependencies.len(), 2);
}

#[tokio::test]
async fn test_mirror_consistency() {
    let manager = DependencyManager::new(InMemoryStore::with_minions(minions(&["a", "b"])));

    manager.add_dependency("a", "b", 10).await.unwrap();
    let b = manager.store().get("b").await.unwrap().unwrap();
    assert!(b.dependent("a").is_some());

    manager.remove_dependency("a", "b").await.unwrap();
    let b = manager.store().get("b").await.unwrap().unwrap();
    assert!(b.dependent("a").is_none());
    assert!(audit(&manager.store().list().await.unwrap()).is_clean());
}

#[tokio::test]
async fn test_diamond_is_not_a_cycle() {
    let manager = DependencyManager::new(InMemoryStore::with_minions(minions(&["a", "b", "c", "d"])));
    manager.add_dependency("a", "b", 10).await.unwrap();
    manager.add_dependency("a", "c", 10).await.unwrap();
    manager.add_dependency("b", "d", 10).await.unwrap();
    manager.add_dependency("c", "d", 10).await.unwrap();

    manager.add_dependency("a", "d", 10).await.unwrap();
    let err = manager.add_dependency("d", "a", 10).await.unwrap_err();
    assert_eq!(validation_kind(&err), Some("cycle-detected"));
}

#[tokio::test]
async fn test_validation_failure_writes_nothing() {
    let store = Arc::new(InMemoryStore::with_minions(minions(&["a", "b"])));
    let manager = DependencyManager::new(Arc::clone(&store));
    manager.add_dependency("a", "b", 10).await.unwrap();

    let mut events = store.subscribe();
    let before = store.list().await.unwrap();

    assert!(manager.add_dependency("b", "a", 10).await.is_err());
    assert!(manager.add_dependency("a", "a", 10).await.is_err());

    assert_eq!(store.list().await.unwrap(), before);
    assert!(events.drain().is_empty());
}

#[tokio::test]
async fn test_partial_write_then_reconcile() {
    let store = Arc::new(FlakyStore::new(minions(&["a", "b"])));
    let manager = DependencyManager::new(Arc::clone(&store));
    let mut events = manager.events().subscribe();

    store.fail_updates_for("b");
    let err = manager.add_dependency("a", "b", 10).await.unwrap_err();
    match &err {
        Error::PartialWrite {
            owner,
            counterpart,
            failed_task,
            ..
        } => {
            assert_eq!(owner, "a");
            assert_eq!(counterpart, "b");
            assert_eq!(failed_task, "b");
        }
        other => panic!("expected partial write, got {other:?}"),
    }
    assert!(validation_kind(&err).is_none());

    // Forward edge committed, back reference missing
    let snapshot = store.list().await.unwrap();
    let report = audit(&snapshot);
    assert_eq!(
        report.missing_back_references,
        vec![("a".to_string(), "b".to_string())]
    );

    let published: Vec<_> = events.drain().into_iter().map(|e| e.category).collect();
    assert!(published.contains(&EventCategory::Dependency(DependencyEvent::PartialWrite {
        owner: "a".to_string(),
        dependency: "b".to_string(),
        failed_task: "b".to_string(),
    })));

    store.heal();
    let reconciled = manager.reconcile().await.unwrap();
    assert_eq!(reconciled.updated, vec!["b".to_string()]);
    assert!(audit(&store.list().await.unwrap()).is_clean());

    // A second pass has nothing left to do
    assert!(manager.reconcile().await.unwrap().updated.is_empty());
}

#[tokio::test]
async fn test_owner_write_failure_commits_nothing() {
    let store = Arc::new(FlakyStore::new(minions(&["a", "b"])));
    let manager = DependencyManager::new(Arc::clone(&store));

    store.fail_updates_for("a");
    let err = manager.add_dependency("a", "b", 10).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Store {
            operation: "update",
            ..
        }
    ));
    assert!(audit(&store.list().await.unwrap()).is_clean());
    let b = store.get("b").await.unwrap().unwrap();
    assert!(b.dependent_on.is_empty());
}

#[tokio::test]
async fn test_remove_partial_write() {
    let store = Arc::new(FlakyStore::new(minions(&["a", "b"])));
    let manager = DependencyManager::new(Arc::clone(&store));
    manager.add_dependency("a", "b", 10).await.unwrap();

    store.fail_updates_for("b");
    let err = manager.remove_dependency("a", "b").await.unwrap_err();
    assert!(matches!(err, Error::PartialWrite { .. }));

    let report = audit(&store.list().await.unwrap());
    assert_eq!(
        report.orphaned_back_references,
        vec![("b".to_string(), "a".to_string())]
    );
}

#[tokio::test]
async fn test_replace_then_delete() {
    let manager = DependencyManager::new(InMemoryStore::with_minions(minions(&["a", "b", "c"])));
    manager.add_dependency("a", "b", 10).await.unwrap();

    manager
        .replace_dependencies(
            "a",
            vec![
                Dependency::pinned("b", "a", "0.0.0"),
                Dependency::pinned("c", "a", ""),
            ],
        )
        .await
        .unwrap();
    manager.add_dependency("b", "c", 10).await.unwrap();
    assert!(audit(&manager.store().list().await.unwrap()).is_clean());

    manager.delete_minion("c").await.unwrap();
    let snapshot = manager.store().list().await.unwrap();
    assert_eq!(snapshot.len(), 2);
    assert!(audit(&snapshot).is_clean());
    assert!(snapshot.iter().all(|m| m.dependency("c").is_none()));
}
