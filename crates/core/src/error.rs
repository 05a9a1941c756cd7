//! Error types for minion operations

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use crate::store::StoreError;
use crate::version::VersionParseError;
use miette::Diagnostic;
use minions_task_graph::InvalidReason;
use std::path::Path;
use thiserror::Error;

/// A rejected action. Raised before anything is written.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ValidationError {
    /// A minion may not depend on itself.
    #[error("Minion '{task}' cannot depend on itself")]
    #[diagnostic(code(minions::validation::self_dependency))]
    SelfDependency {
        /// The minion that named itself.
        task: String,
    },

    /// The new edge would close a dependency cycle.
    #[error("Depending on '{candidate}' from '{task}' would create a circular dependency")]
    #[diagnostic(
        code(minions::validation::cycle_detected),
        help("'{candidate}' already depends on '{task}', directly or transitively")
    )]
    CycleDetected {
        /// The depending minion.
        task: String,
        /// The rejected dependency.
        candidate: String,
    },

    /// Archived or deleted minions cannot be depended upon or adopted as parents.
    #[error("Minion '{candidate}' is archived or deleted")]
    #[diagnostic(code(minions::validation::candidate_unavailable))]
    CandidateUnavailable {
        /// The unavailable minion.
        candidate: String,
    },

    /// A referenced minion (or dependency entry) does not exist.
    #[error("Minion '{id}' not found")]
    #[diagnostic(code(minions::validation::not_found))]
    NotFound {
        /// The missing id.
        id: String,
    },

    /// The owner already has the maximum number of dependencies.
    #[error("Maximum {max} dependencies allowed for '{task}'")]
    #[diagnostic(
        code(minions::validation::limit_exceeded),
        help("Remove a dependency or raise dependencies.maxDependencies")
    )]
    LimitExceeded {
        /// The owning minion.
        task: String,
        /// The configured limit.
        max: usize,
    },

    /// A minion may not be its own parent.
    #[error("Minion '{task}' cannot be its own parent")]
    #[diagnostic(code(minions::validation::self_parent))]
    SelfParent {
        /// The minion.
        task: String,
    },

    /// The proposed parent is a descendant of the minion.
    #[error("Minion '{parent}' is a descendant of '{task}' and cannot become its parent")]
    #[diagnostic(code(minions::validation::hierarchy_cycle))]
    HierarchyCycle {
        /// The minion being re-parented.
        task: String,
        /// The rejected parent.
        parent: String,
    },
}

impl ValidationError {
    /// Convert a validator rejection into an error.
    #[must_use]
    pub fn from_reason(reason: InvalidReason, task: &str, candidate: &str) -> Self {
        match reason {
            InvalidReason::SelfDependency => Self::SelfDependency {
                task: task.to_string(),
            },
            InvalidReason::CycleDetected => Self::CycleDetected {
                task: task.to_string(),
                candidate: candidate.to_string(),
            },
            InvalidReason::CandidateUnavailable => Self::CandidateUnavailable {
                candidate: candidate.to_string(),
            },
            InvalidReason::NotFound => Self::NotFound {
                id: candidate.to_string(),
            },
        }
    }

    /// Create a not found error
    #[must_use]
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Stable kebab-case name of the error kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SelfDependency { .. } => "self-dependency",
            Self::CycleDetected { .. } => "cycle-detected",
            Self::CandidateUnavailable { .. } => "candidate-unavailable",
            Self::NotFound { .. } => "not-found",
            Self::LimitExceeded { .. } => "limit-exceeded",
            Self::SelfParent { .. } => "self-parent",
            Self::HierarchyCycle { .. } => "hierarchy-cycle",
        }
    }
}

/// Main error type for minion operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The action was rejected; nothing was written.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),

    /// One side of a two-sided write was committed, the other failed.
    #[error("Edge '{owner}' -> '{counterpart}' only partially written: update of '{failed_task}' failed")]
    #[diagnostic(
        code(minions::partial_write),
        help("Back references are now inconsistent; run `minions reconcile` to rebuild them")
    )]
    PartialWrite {
        /// Minion that owns the edge.
        owner: String,
        /// Other endpoint of the edge.
        counterpart: String,
        /// Minion whose update failed.
        failed_task: String,
        /// The store failure.
        #[source]
        source: StoreError,
    },

    /// The task store failed; nothing from this operation was committed.
    #[error("Store {operation} failed for '{task_id}'")]
    #[diagnostic(code(minions::store))]
    Store {
        /// Store operation (list, create, update, delete).
        operation: &'static str,
        /// Minion the operation targeted.
        task_id: String,
        /// The store failure.
        #[source]
        source: StoreError,
    },

    /// A version string could not be parsed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    VersionParse(#[from] VersionParseError),

    /// Configuration or validation error
    #[error("Configuration error: {message}")]
    #[diagnostic(code(minions::config))]
    Configuration {
        /// Error message describing the configuration issue
        message: String,
    },

    /// I/O error while loading configuration
    #[error("I/O {operation} failed: {}", path.display())]
    #[diagnostic(
        code(minions::io),
        help("Check file permissions and ensure the path exists")
    )]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Path that caused the error
        path: Box<Path>,
        /// Operation that failed (e.g., "read")
        operation: String,
    },
}

impl Error {
    /// Create a configuration error
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
        }
    }

    /// Create a store error with operation context
    #[must_use]
    pub fn store(operation: &'static str, task_id: impl Into<String>, source: StoreError) -> Self {
        Self::Store {
            operation,
            task_id: task_id.into(),
            source,
        }
    }

    /// Create an I/O error with path context
    #[must_use]
    pub fn io(
        source: std::io::Error,
        path: impl AsRef<Path>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Io {
            source,
            path: path.as_ref().into(),
            operation: operation.into(),
        }
    }

    /// The validation failure, if this is one.
    #[must_use]
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

/// Result type for minion operations
pub type Result<T> = std::result::Result<T, Error>;
