//! Task store abstraction.
//!
//! The dependency manager only sees minions through [`TaskStore`]. Writes to
//! different minions are separate calls; nothing here is transactional.

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use crate::minion::{Minion, MinionPatch};
use async_trait::async_trait;
use chrono::Utc;
use miette::Diagnostic;
use minions_events::{EventBus, EventReceiver, MinionEvent, StoreEvent};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Failure reported by a task store.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum StoreError {
    /// No minion with this id.
    #[error("minion '{id}' does not exist")]
    #[diagnostic(code(minions::store::not_found))]
    NotFound {
        /// The missing id.
        id: String,
    },

    /// A minion with this id already exists.
    #[error("minion '{id}' already exists")]
    #[diagnostic(code(minions::store::already_exists))]
    AlreadyExists {
        /// The duplicate id.
        id: String,
    },

    /// The backend failed.
    #[error("store backend error: {message}")]
    #[diagnostic(code(minions::store::backend))]
    Backend {
        /// Backend message.
        message: String,
    },
}

impl StoreError {
    /// Create a backend error
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// Persistent collection of minions.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Every minion, archived and soft-deleted ones included.
    async fn list(&self) -> Result<Vec<Minion>, StoreError>;

    /// A single minion.
    async fn get(&self, id: &str) -> Result<Option<Minion>, StoreError> {
        Ok(self.list().await?.into_iter().find(|m| m.id == id))
    }

    /// Insert a new minion.
    async fn create(&self, minion: Minion) -> Result<(), StoreError>;

    /// Apply `patch` to the minion `id`.
    async fn update(&self, id: &str, patch: MinionPatch) -> Result<(), StoreError>;

    /// Remove the minion `id`.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

#[async_trait]
impl<S: TaskStore + ?Sized> TaskStore for Arc<S> {
    async fn list(&self) -> Result<Vec<Minion>, StoreError> {
        (**self).list().await
    }

    async fn get(&self, id: &str) -> Result<Option<Minion>, StoreError> {
        (**self).get(id).await
    }

    async fn create(&self, minion: Minion) -> Result<(), StoreError> {
        (**self).create(minion).await
    }

    async fn update(&self, id: &str, patch: MinionPatch) -> Result<(), StoreError> {
        (**self).update(id, patch).await
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        (**self).delete(id).await
    }
}

/// In-memory store that publishes a [`StoreEvent`] for every mutation.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    minions: RwLock<Vec<Minion>>,
    events: Arc<EventBus>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `minions`, in order.
    #[must_use]
    pub fn with_minions(minions: Vec<Minion>) -> Self {
        Self {
            minions: RwLock::new(minions),
            events: Arc::new(EventBus::new()),
        }
    }

    /// Publish on `events` instead of a private bus.
    #[must_use]
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    /// The bus this store publishes on.
    #[must_use]
    pub fn events(&self) -> Arc<EventBus> {
        Arc::clone(&self.events)
    }

    /// Subscribe to store events.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    /// Consume the store, returning its minions.
    #[must_use]
    pub fn into_minions(self) -> Vec<Minion> {
        self.minions.into_inner()
    }

    fn publish(&self, event: StoreEvent) {
        if let Err(e) = self.events.publish(MinionEvent::store(event)) {
            tracing::debug!(error = %e, "Store event dropped");
        }
    }
}

#[async_trait]
impl TaskStore for InMemoryStore {
    async fn list(&self) -> Result<Vec<Minion>, StoreError> {
        Ok(self.minions.read().await.clone())
    }

    async fn get(&self, id: &str) -> Result<Option<Minion>, StoreError> {
        Ok(self.minions.read().await.iter().find(|m| m.id == id).cloned())
    }

    async fn create(&self, minion: Minion) -> Result<(), StoreError> {
        let id = minion.id.clone();
        {
            let mut minions = self.minions.write().await;
            if minions.iter().any(|m| m.id == id) {
                return Err(StoreError::AlreadyExists { id });
            }
            minions.push(minion);
        }
        tracing::debug!(minion = %id, "Created minion");
        self.publish(StoreEvent::Created { minion_id: id });
        Ok(())
    }

    async fn update(&self, id: &str, patch: MinionPatch) -> Result<(), StoreError> {
        let fields = patch
            .field_names()
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        {
            let mut minions = self.minions.write().await;
            let minion = minions
                .iter_mut()
                .find(|m| m.id == id)
                .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
            patch.apply(minion);
            minion.updated_at = Utc::now();
        }
        tracing::debug!(minion = %id, ?fields, "Updated minion");
        self.publish(StoreEvent::Updated {
            minion_id: id.to_string(),
            fields,
        });
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        {
            let mut minions = self.minions.write().await;
            let position = minions
                .iter()
                .position(|m| m.id == id)
                .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
            minions.remove(position);
        }
        tracing::debug!(minion = %id, "Deleted minion");
        self.publish(StoreEvent::Deleted {
            minion_id: id.to_string(),
        });
        Ok(())
    }
}
