//! Core types and operations for minions.
//!
//! A minion is a task that can depend on other minions at a pinned version
//! and sit in a parent/child hierarchy. This crate owns:
//!
//! - the [`Minion`] record and its three-part [`Version`]
//! - the [`TaskStore`] abstraction and an [`InMemoryStore`]
//! - the [`DependencyManager`], which validates and commits edge edits
//! - version drift reporting and back reference reconciliation
//!
//! Graph algorithms live in `minions-task-graph`; change notifications in
//! `minions-events`.

pub mod candidates;
pub mod config;
pub mod dependencies;
pub mod drift;
pub mod error;
pub mod hierarchy;
pub mod minion;
pub mod reconcile;
pub mod search;
pub mod store;
pub mod version;

pub use candidates::{
    DependencyOption, ParentOption, dependency_candidates, is_descendant, parent_candidates,
};
pub use config::{Config, DependencyConfig};
pub use dependencies::DependencyManager;
pub use drift::{
    DependencyDrift, VersionHistoryEntry, drift_report, is_outdated, version_diff, version_history,
};
pub use error::{Error, Result, ValidationError};
pub use minion::{Dependency, Frequency, Minion, MinionPatch, Priority, Recurring, Status};
pub use reconcile::{
    AuditReport, ReconcileChange, ReconciliationPlan, ReconciliationReport, audit,
    plan_reconciliation,
};
pub use search::search_minions;
pub use store::{InMemoryStore, StoreError, TaskStore};
pub use version::{
    BumpKind, Version, VersionBump, VersionComponent, VersionParseError, compare_versions,
    format_version,
};
