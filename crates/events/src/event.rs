//! Event type definitions for minion change notifications.
//!
//! Events are categorized by domain (store mutations, dependency edges) and
//! carry an id and timestamp so subscribers can de-duplicate and order them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A change notification with metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinionEvent {
    /// Unique event identifier.
    pub id: Uuid,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// The event category and data.
    pub category: EventCategory,
}

impl MinionEvent {
    /// Create a new event with the given category.
    #[must_use]
    pub fn new(category: EventCategory) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            category,
        }
    }

    /// Create a store mutation event.
    #[must_use]
    pub fn store(event: StoreEvent) -> Self {
        Self::new(EventCategory::Store(event))
    }

    /// Create a dependency edge event.
    #[must_use]
    pub fn dependency(event: DependencyEvent) -> Self {
        Self::new(EventCategory::Dependency(event))
    }

    /// Id of the minion this event is primarily about, if any.
    #[must_use]
    pub fn minion_id(&self) -> Option<&str> {
        match &self.category {
            EventCategory::Store(
                StoreEvent::Created { minion_id }
                | StoreEvent::Updated { minion_id, .. }
                | StoreEvent::Deleted { minion_id },
            ) => Some(minion_id),
            EventCategory::Dependency(
                DependencyEvent::Added { owner, .. }
                | DependencyEvent::Removed { owner, .. }
                | DependencyEvent::Repinned { owner, .. }
                | DependencyEvent::PartialWrite { owner, .. },
            ) => Some(owner),
            EventCategory::Dependency(DependencyEvent::Reconciled { .. }) => None,
        }
    }
}

/// Event categories organized by domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum EventCategory {
    /// A record changed in the task store.
    Store(StoreEvent),
    /// A dependency edge changed.
    Dependency(DependencyEvent),
}

/// Task store mutations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StoreEvent {
    /// A minion was created.
    Created {
        /// Created minion.
        minion_id: String,
    },
    /// A minion was updated.
    Updated {
        /// Updated minion.
        minion_id: String,
        /// Names of the fields present in the patch.
        fields: Vec<String>,
    },
    /// A minion was deleted.
    Deleted {
        /// Deleted minion.
        minion_id: String,
    },
}

/// Dependency edge changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DependencyEvent {
    /// `owner` now depends on `dependency`, pinned at `version`.
    Added {
        /// Depending minion.
        owner: String,
        /// Depended-upon minion.
        dependency: String,
        /// Pinned version.
        version: String,
    },
    /// The edge `owner -> dependency` was removed.
    Removed {
        /// Depending minion.
        owner: String,
        /// Formerly depended-upon minion.
        dependency: String,
    },
    /// The pin of `owner -> dependency` moved to `version`.
    Repinned {
        /// Depending minion.
        owner: String,
        /// Depended-upon minion.
        dependency: String,
        /// New pinned version.
        version: String,
    },
    /// Only one side of a two-sided edge write was committed.
    PartialWrite {
        /// Depending minion.
        owner: String,
        /// Depended-upon minion.
        dependency: String,
        /// Minion whose update failed.
        failed_task: String,
    },
    /// Back references were recomputed.
    Reconciled {
        /// Number of minions rewritten.
        updated_tasks: usize,
    },
}
