pub mod dependencies;
pub mod graph;
pub mod hierarchy;
pub mod maintenance;
pub mod search;
pub mod snapshot;
pub mod version;

use crate::cli::OutputFormat;
use crate::errors::{CliError, CliResult};
use minions_core::{Config, DependencyManager, InMemoryStore};
use minions_events::{EventCategory, EventReceiver};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::instrument;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Version,
    Graph {
        root: String,
    },
    AddDependency {
        owner: String,
        dependency: String,
        max: Option<usize>,
    },
    RemoveDependency {
        owner: String,
        dependency: String,
    },
    Pin {
        owner: String,
        dependency: String,
        version: String,
    },
    Candidates {
        owner: String,
        search: String,
    },
    Outdated {
        owner: String,
        only_outdated: bool,
    },
    Parents {
        task: String,
        search: String,
    },
    SetParent {
        task: String,
        parent: Option<String>,
    },
    Search {
        term: String,
    },
    Check,
    Reconcile {
        dry_run: bool,
    },
    Delete {
        task: String,
    },
}

impl Command {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Version => "version",
            Self::Graph { .. } => "graph",
            Self::AddDependency { .. } => "deps add",
            Self::RemoveDependency { .. } => "deps rm",
            Self::Pin { .. } => "deps pin",
            Self::Candidates { .. } => "deps candidates",
            Self::Outdated { .. } => "deps outdated",
            Self::Parents { .. } => "parents",
            Self::SetParent { .. } => "set-parent",
            Self::Search { .. } => "search",
            Self::Check => "check",
            Self::Reconcile { .. } => "reconcile",
            Self::Delete { .. } => "delete",
        }
    }
}

/// A loaded snapshot plus the manager operating on it.
pub struct Session {
    path: PathBuf,
    config: Config,
    manager: DependencyManager<InMemoryStore>,
    changes: EventReceiver,
}

impl Session {
    /// Load the snapshot at `file` and the configuration at `config`, or
    /// `minions.toml` in the working directory when present.
    pub fn open(file: &Path, config: Option<&Path>) -> CliResult<Self> {
        let config = Config::discover(config, Path::new("."))?;
        let minions = snapshot::load(file)?;
        tracing::debug!(path = %file.display(), minions = minions.len(), "Snapshot loaded");

        let store = InMemoryStore::with_minions(minions);
        let changes = store.subscribe();
        let manager = DependencyManager::new(store).with_config(config.dependencies);

        Ok(Self {
            path: file.to_path_buf(),
            config,
            manager,
            changes,
        })
    }

    pub const fn manager(&self) -> &DependencyManager<InMemoryStore> {
        &self.manager
    }

    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Write the snapshot back if the store changed. Returns the number of
    /// store changes observed since the last save.
    pub async fn save(&mut self) -> CliResult<usize> {
        let changes = self.changes.drain();
        for event in &changes {
            if let EventCategory::Store(change) = &event.category {
                tracing::debug!(event_id = %event.id, ?change, "Store changed");
            }
        }
        if changes.is_empty() {
            return Ok(0);
        }

        let minions = minions_core::TaskStore::list(self.manager.store())
            .await
            .map_err(|e| minions_core::Error::store("list", "*", e))?;
        snapshot::save(&self.path, &minions)?;
        tracing::info!(path = %self.path.display(), changes = changes.len(), "Snapshot saved");
        Ok(changes.len())
    }
}

/// Runs commands against the snapshot named on the command line.
pub struct CommandExecutor {
    file: PathBuf,
    config: Option<PathBuf>,
    format: OutputFormat,
}

impl CommandExecutor {
    pub fn new(file: PathBuf, config: Option<PathBuf>, format: OutputFormat) -> Self {
        Self {
            file,
            config,
            format,
        }
    }

    /// Execute `command` and return what should be printed on stdout.
    ///
    /// Mutating commands write the snapshot back even when they fail part
    /// way, so a partially committed edit is persisted for `reconcile`.
    #[instrument(name = "command", skip(self), fields(command = command.name()))]
    pub async fn execute(&self, command: Command) -> CliResult<String> {
        if command == Command::Version {
            return Ok(version::get_version_info());
        }

        let mut session = Session::open(&self.file, self.config.as_deref())?;
        let format = self.format;
        let result = match command {
            Command::Version => Ok(version::get_version_info()),
            Command::Graph { root } => graph::execute(&session, &root, format).await,
            Command::AddDependency {
                owner,
                dependency,
                max,
            } => dependencies::add(&session, &owner, &dependency, max, format).await,
            Command::RemoveDependency { owner, dependency } => {
                dependencies::remove(&session, &owner, &dependency, format).await
            }
            Command::Pin {
                owner,
                dependency,
                version,
            } => dependencies::pin(&session, &owner, &dependency, &version, format).await,
            Command::Candidates { owner, search } => {
                dependencies::candidates(&session, &owner, &search, format).await
            }
            Command::Outdated {
                owner,
                only_outdated,
            } => dependencies::outdated(&session, &owner, only_outdated, format).await,
            Command::Parents { task, search } => {
                hierarchy::parents(&session, &task, &search, format).await
            }
            Command::SetParent { task, parent } => {
                hierarchy::set_parent(&session, &task, parent.as_deref(), format).await
            }
            Command::Search { term } => search::execute(&session, &term, format).await,
            Command::Check => maintenance::check(&session, format).await,
            Command::Reconcile { dry_run } => maintenance::reconcile(&session, dry_run, format).await,
            Command::Delete { task } => maintenance::delete(&session, &task, format).await,
        };

        settle(result, session.save().await)
    }
}

/// Combine a command's outcome with the save that follows it. A save failure
/// never hides the command's own error.
fn settle(result: CliResult<String>, saved: CliResult<usize>) -> CliResult<String> {
    match (result, saved) {
        (result, Ok(_)) => result,
        (Ok(_), Err(save)) => Err(save),
        (Err(command), Err(save)) => {
            tracing::error!(error = %command, save_error = %save, "Command failed and the snapshot could not be saved");
            Err(CliError::Unsaved {
                command: Box::new(command),
                save: Box::new(save),
            })
        }
    }
}

/// Render `value` as pretty JSON, or through `text` for the text format.
pub fn render<T: Serialize + ?Sized>(
    format: OutputFormat,
    value: &T,
    text: impl FnOnce(&T) -> String,
) -> CliResult<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Text => Ok(text(value)),
    }
}
