//! JSON snapshot of the minion list.
//!
//! A missing file is an empty list, so `minions` works in a fresh directory.

use crate::errors::{CliError, CliResult};
use minions_core::Minion;
use std::io::ErrorKind;
use std::path::Path;

pub fn load(path: &Path) -> CliResult<Vec<Minion>> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "No snapshot, starting empty");
            return Ok(Vec::new());
        }
        Err(e) => return Err(CliError::file_error("read", path, e)),
    };
    serde_json::from_str(&contents).map_err(|e| CliError::snapshot_parse(path, e))
}

/// Write `minions` to `path` through a sibling temp file and a rename.
pub fn save(path: &Path, minions: &[Minion]) -> CliResult<()> {
    let mut contents = serde_json::to_string_pretty(minions)?;
    contents.push('\n');

    let staging = path.with_extension("json.tmp");
    std::fs::write(&staging, contents).map_err(|e| CliError::file_error("write", &staging, e))?;
    std::fs::rename(&staging, path).map_err(|e| CliError::file_error("rename", path, e))
}
