//! Configuration types for minions
//!
//! Loaded from `minions.toml`:
//!
//! ```toml
//! [dependencies]
//! maxDependencies = 10
//!
//! [layout]
//! horizontalSpacing = 350.0
//! verticalStep = 200.0
//! dependencyOffset = 400.0
//! childOffset = 200.0
//! ```

use crate::{Error, Result};
use minions_task_graph::LayoutConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "minions.toml";

/// Default cap on dependencies per minion.
pub const DEFAULT_MAX_DEPENDENCIES: usize = 10;

/// Main configuration structure for minions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Dependency manager settings
    pub dependencies: DependencyConfig,

    /// Relationship diagram layout
    pub layout: LayoutConfig,
}

/// Dependency manager settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct DependencyConfig {
    /// Maximum number of dependencies a minion may declare.
    pub max_dependencies: usize,
}

impl Default for DependencyConfig {
    fn default() -> Self {
        Self {
            max_dependencies: DEFAULT_MAX_DEPENDENCIES,
        }
    }
}

impl Config {
    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the document does not parse or a
    /// value is out of range.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)
            .map_err(|e| Error::configuration(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate the config file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, or
    /// [`Error::Configuration`] if its contents are invalid.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| Error::io(e, path, "read"))?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Self::from_toml_str(&source)
    }

    /// Load `path` if given, else `minions.toml` in `dir` if it exists, else defaults.
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`]. An explicitly given path must exist.
    pub fn discover(path: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        let default_path = dir.join(CONFIG_FILE_NAME);
        if default_path.is_file() {
            Self::load(&default_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] describing the first bad value.
    pub fn validate(&self) -> Result<()> {
        if self.dependencies.max_dependencies == 0 {
            return Err(Error::configuration(
                "dependencies.maxDependencies must be at least 1",
            ));
        }
        let layout = &self.layout;
        for (name, value) in [
            ("layout.horizontalSpacing", layout.horizontal_spacing),
            ("layout.verticalStep", layout.vertical_step),
            ("layout.dependencyOffset", layout.dependency_offset),
            ("layout.childOffset", layout.child_offset),
        ] {
            if !value.is_finite() {
                return Err(Error::configuration(format!("{name} must be a finite number")));
            }
        }
        Ok(())
    }
}
