use crate::commands::Command;
use crate::tracing::{LogLevel, TracingFormat};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Default snapshot file, relative to the working directory.
pub const DEFAULT_SNAPSHOT_FILE: &str = "minions.json";

#[derive(Parser, Debug)]
#[command(name = "minions")]
#[command(about = "Inspect and edit minion dependencies and hierarchy")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// JSON snapshot of the minion list
    #[arg(
        long,
        global = true,
        env = "MINIONS_FILE",
        default_value = DEFAULT_SNAPSHOT_FILE
    )]
    pub file: PathBuf,

    /// Configuration file (defaults to ./minions.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, default_value = "warn")]
    pub level: LogLevel,

    /// Log line format
    #[arg(long, global = true, value_enum, default_value_t = TracingFormat::Compact)]
    pub log_format: TracingFormat,

    /// Emit logs as JSON (same as `--log-format json`)
    #[arg(long, global = true)]
    pub json: bool,

    /// Output format for command results
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// How command results are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One line per item
    Text,
    /// Pretty-printed JSON
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Show version information")]
    Version,

    #[command(about = "Print the relationship diagram rooted at a minion")]
    Graph {
        /// Root minion id
        root: String,
    },

    #[command(about = "Edit and inspect pinned dependencies")]
    Deps {
        #[command(subcommand)]
        subcommand: DepsCommands,
    },

    #[command(about = "List minions a task could be moved under")]
    Parents {
        task: String,

        /// Filter by label
        #[arg(long, short)]
        search: Option<String>,
    },

    #[command(name = "set-parent", about = "Move a minion under a parent, or to the top level")]
    SetParent {
        task: String,

        /// New parent; omit to detach
        parent: Option<String>,
    },

    #[command(about = "Search titles and descriptions")]
    Search { term: String },

    #[command(about = "Audit back references and cycles; exits non-zero on findings")]
    Check,

    #[command(about = "Rebuild back references from forward edges")]
    Reconcile {
        /// Print the plan without writing
        #[arg(long)]
        dry_run: bool,
    },

    #[command(about = "Delete a minion and every edge touching it")]
    Delete { task: String },
}

#[derive(Subcommand, Debug)]
pub enum DepsCommands {
    #[command(about = "Pin a dependency at its live version")]
    Add {
        owner: String,
        dependency: String,

        /// Override the configured dependency cap
        #[arg(long)]
        max: Option<usize>,
    },

    #[command(about = "Remove a dependency")]
    Rm { owner: String, dependency: String },

    #[command(about = "Re-pin a dependency at an explicit version")]
    Pin {
        owner: String,
        dependency: String,
        version: String,
    },

    #[command(about = "List minions that can be added as dependencies")]
    Candidates {
        owner: String,

        /// Filter by label
        #[arg(long, short)]
        search: Option<String>,
    },

    #[command(about = "Show pinned versus live versions")]
    Outdated {
        owner: String,

        /// Only list dependencies behind their live version
        #[arg(long)]
        only_outdated: bool,
    },
}

impl From<Commands> for Command {
    fn from(cmd: Commands) -> Self {
        match cmd {
            Commands::Version => Self::Version,
            Commands::Graph { root } => Self::Graph { root },
            Commands::Deps { subcommand } => match subcommand {
                DepsCommands::Add {
                    owner,
                    dependency,
                    max,
                } => Self::AddDependency {
                    owner,
                    dependency,
                    max,
                },
                DepsCommands::Rm { owner, dependency } => Self::RemoveDependency { owner, dependency },
                DepsCommands::Pin {
                    owner,
                    dependency,
                    version,
                } => Self::Pin {
                    owner,
                    dependency,
                    version,
                },
                DepsCommands::Candidates { owner, search } => Self::Candidates {
                    owner,
                    search: search.unwrap_or_default(),
                },
                DepsCommands::Outdated {
                    owner,
                    only_outdated,
                } => Self::Outdated {
                    owner,
                    only_outdated,
                },
            },
            Commands::Parents { task, search } => Self::Parents {
                task,
                search: search.unwrap_or_default(),
            },
            Commands::SetParent { task, parent } => Self::SetParent { task, parent },
            Commands::Search { term } => Self::Search { term },
            Commands::Check => Self::Check,
            Commands::Reconcile { dry_run } => Self::Reconcile { dry_run },
            Commands::Delete { task } => Self::Delete { task },
        }
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_graph_with_globals() {
        let cli = Cli::try_parse_from([
            "minions", "--file", "tasks.json", "graph", "root", "--format", "json", "-l", "debug",
        ])
        .unwrap();

        assert_eq!(cli.file, PathBuf::from("tasks.json"));
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(matches!(cli.level, LogLevel::Debug));
        assert!(matches!(cli.command, Commands::Graph { ref root } if root == "root"));
    }

    #[test]
    fn test_default_file() {
        let cli = Cli::try_parse_from(["minions", "check"]).unwrap();
        // MINIONS_FILE may be set in the environment running the tests
        if std::env::var_os("MINIONS_FILE").is_none() {
            assert_eq!(cli.file, PathBuf::from(DEFAULT_SNAPSHOT_FILE));
        }
        assert_eq!(cli.format, OutputFormat::Text);
        assert!(!cli.json);
        assert_eq!(cli.log_format, TracingFormat::Compact);
    }

    #[test]
    fn test_deps_add_converts() {
        let cli = Cli::try_parse_from(["minions", "deps", "add", "a", "b", "--max", "3"]).unwrap();
        let command: Command = cli.command.into();
        assert!(matches!(
            command,
            Command::AddDependency { ref owner, ref dependency, max: Some(3) }
                if owner == "a" && dependency == "b"
        ));
    }

    #[test]
    fn test_set_parent_optional_parent() {
        let cli = Cli::try_parse_from(["minions", "set-parent", "child"]).unwrap();
        let command: Command = cli.command.into();
        assert!(matches!(command, Command::SetParent { parent: None, .. }));

        let cli = Cli::try_parse_from(["minions", "set-parent", "child", "root"]).unwrap();
        let command: Command = cli.command.into();
        assert!(matches!(command, Command::SetParent { parent: Some(ref p), .. } if p == "root"));
    }

    #[test]
    fn test_pin_requires_version() {
        assert!(Cli::try_parse_from(["minions", "deps", "pin", "a", "b"]).is_err());
        assert!(Cli::try_parse_from(["minions", "deps", "pin", "a", "b", "1.2.3"]).is_ok());
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(Cli::try_parse_from(["minions", "--format", "yaml", "check"]).is_err());
    }
}
