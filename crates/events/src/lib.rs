//! Change notifications for minions.
//!
//! This crate provides the observer interface between the task store, the
//! dependency manager and whatever renders them. Mutations publish typed
//! [`MinionEvent`]s on an [`EventBus`]; views subscribe and refresh when a
//! relevant event arrives instead of listening for a global "data updated"
//! broadcast.
//!
//! It also provides `emit_*!` macros that log dependency changes as
//! structured `tracing` events under the `minions::dependency` target.
//!
//! # Usage
//!
//! ```rust,ignore
//! use minions_events::{EventBus, MinionEvent, StoreEvent};
//!
//! let bus = EventBus::new();
//! let mut receiver = bus.subscribe();
//!
//! bus.publish(MinionEvent::store(StoreEvent::Deleted { minion_id: "a".into() }))?;
//! let event = receiver.recv().await;
//! ```

pub mod bus;
pub mod event;

// Re-exports for convenience
pub use bus::{EventBus, EventReceiver, SendError};
pub use event::{DependencyEvent, EventCategory, MinionEvent, StoreEvent};

// ============================================================================
// Emit Macros
// ============================================================================

/// Emit a dependency added event.
///
/// # Example
/// ```rust,ignore
/// emit_dependency_added!("a", "b", "0.1.0");
/// ```
#[macro_export]
macro_rules! emit_dependency_added {
    ($owner:expr, $dependency:expr, $version:expr) => {
        ::tracing::info!(
            target: "minions::dependency",
            event_type = "dependency.added",
            owner = %$owner,
            dependency = %$dependency,
            version = %$version,
        )
    };
}

/// Emit a dependency removed event.
#[macro_export]
macro_rules! emit_dependency_removed {
    ($owner:expr, $dependency:expr) => {
        ::tracing::info!(
            target: "minions::dependency",
            event_type = "dependency.removed",
            owner = %$owner,
            dependency = %$dependency,
        )
    };
}

/// Emit a dependency repinned event.
///
/// # Example
/// ```rust,ignore
/// emit_dependency_repinned!("a", "b", "0.2.0");
/// ```
#[macro_export]
macro_rules! emit_dependency_repinned {
    ($owner:expr, $dependency:expr, $version:expr) => {
        ::tracing::info!(
            target: "minions::dependency",
            event_type = "dependency.repinned",
            owner = %$owner,
            dependency = %$dependency,
            version = %$version,
        )
    };
}

/// Emit a partial write warning: one side of an edge was committed and the
/// other was not.
#[macro_export]
macro_rules! emit_partial_write {
    ($owner:expr, $dependency:expr, $failed_task:expr) => {
        ::tracing::warn!(
            target: "minions::dependency",
            event_type = "dependency.partial_write",
            owner = %$owner,
            dependency = %$dependency,
            failed_task = %$failed_task,
            "Edge write only partially committed; run reconciliation"
        )
    };
}

/// Emit a reconciliation completed event.
#[macro_export]
macro_rules! emit_reconciled {
    ($updated_tasks:expr) => {
        ::tracing::info!(
            target: "minions::dependency",
            event_type = "dependency.reconciled",
            updated_tasks = $updated_tasks,
        )
    };
}
