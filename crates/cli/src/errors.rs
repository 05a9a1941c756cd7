//! Error types for the minions CLI

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by the `minions` binary.
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error("File operation failed: {operation} on {}", path.display())]
    #[diagnostic(
        code(minions::cli::file_error),
        help("Check the path exists and is readable/writable")
    )]
    FileError {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Snapshot {} is not a valid minion list", path.display())]
    #[diagnostic(
        code(minions::cli::snapshot_parse),
        help("The snapshot must be a JSON array of minion objects")
    )]
    SnapshotParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to render output")]
    #[diagnostic(code(minions::cli::render))]
    Render {
        #[source]
        source: serde_json::Error,
    },

    #[error("Audit found {findings} problem(s)")]
    #[diagnostic(
        code(minions::cli::check_failed),
        help("Run `minions reconcile` to rebuild back references; cycles must be broken by hand")
    )]
    CheckFailed { findings: usize },

    /// The command failed and the snapshot could not be written afterwards.
    /// The command's error is the source; `save` is what stopped the write.
    #[error("Snapshot was not saved after a failed command: {save}")]
    #[diagnostic(
        code(minions::cli::unsaved),
        help("Changes made before the failure are lost; rerun the command once the file is writable")
    )]
    Unsaved {
        #[source]
        command: Box<CliError>,
        save: Box<CliError>,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Core(#[from] minions_core::Error),
}

impl CliError {
    pub fn file_error(
        operation: impl Into<String>,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::FileError {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }

    pub fn snapshot_parse(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::SnapshotParse {
            path: path.into(),
            source,
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::CheckFailed { .. } => 2,
            Self::Unsaved { command, .. } => command.exit_code(),
            _ => 1,
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(source: serde_json::Error) -> Self {
        Self::Render { source }
    }
}

pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;
    use minions_core::ValidationError;

    #[test]
    fn test_file_error() {
        let error = CliError::file_error(
            "read",
            "/tmp/missing.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(error.to_string().contains("read on /tmp/missing.json"));
        assert_eq!(error.exit_code(), 1);
    }

    #[test]
    fn test_core_error_is_transparent() {
        let core = minions_core::Error::from(ValidationError::SelfDependency {
            task: "a".to_string(),
        });
        let message = core.to_string();
        let error = CliError::from(core);
        assert_eq!(error.to_string(), message);
        assert!(error.code().is_some());
    }

    #[test]
    fn test_check_failed_exit_code() {
        assert_eq!(CliError::CheckFailed { findings: 3 }.exit_code(), 2);
    }
}
