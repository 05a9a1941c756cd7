//! Version drift between a pinned dependency and the live minion.
//!
//! Every decision here recomputes the live version from the minion itself;
//! the cached `currentVersion` on the dependency entry is never consulted.

use crate::minion::{Dependency, Minion};
use crate::version::{Version, VersionComponent, VersionParseError};
use minions_task_graph::TaskIndex;
use serde::Serialize;
use std::cmp::Ordering;

/// Whether `candidate` has moved past the pinned version.
///
/// A pin newer than the live version is not outdated. A missing candidate
/// is never outdated.
///
/// # Errors
///
/// Returns [`VersionParseError`] if the pinned version is malformed.
pub fn is_outdated(dependency: &Dependency, candidate: Option<&Minion>) -> Result<bool, VersionParseError> {
    let Some(candidate) = candidate else {
        return Ok(false);
    };
    let pinned: Version = dependency.version.parse()?;
    Ok(candidate.version.cmp(&pinned) == Ordering::Greater)
}

/// Which components differ between the pin and the live version, e.g.
/// `"Major version change, Minor version change"`.
///
/// Returns `None` for a missing candidate and an empty string when nothing
/// differs.
///
/// # Errors
///
/// Returns [`VersionParseError`] if the pinned version is malformed.
pub fn version_diff(
    dependency: &Dependency,
    candidate: Option<&Minion>,
) -> Result<Option<String>, VersionParseError> {
    let Some(candidate) = candidate else {
        return Ok(None);
    };
    let pinned: Version = dependency.version.parse()?;
    let labels: Vec<&str> = pinned
        .changed_components(&candidate.version)
        .into_iter()
        .map(VersionComponent::change_label)
        .collect();
    Ok(Some(labels.join(", ")))
}

/// One selectable version of a dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionHistoryEntry {
    /// The version.
    pub version: Version,
    /// It is the minion's live version.
    pub is_current: bool,
    /// It is the version currently pinned.
    pub is_selected: bool,
}

/// Versions of `candidate` a dependent could pin: the live version plus the
/// pin found in `dependencies`, newest first.
///
/// # Errors
///
/// Returns [`VersionParseError`] if the pin is malformed.
pub fn version_history(
    candidate: &Minion,
    dependencies: &[Dependency],
) -> Result<Vec<VersionHistoryEntry>, VersionParseError> {
    let current = candidate.version;
    let pinned = dependencies
        .iter()
        .find(|d| d.id == candidate.id)
        .map(|d| d.version.parse::<Version>())
        .transpose()?;

    let mut entries = vec![VersionHistoryEntry {
        version: current,
        is_current: true,
        is_selected: pinned == Some(current),
    }];
    if let Some(pinned) = pinned.filter(|p| *p != current) {
        entries.push(VersionHistoryEntry {
            version: pinned,
            is_current: false,
            is_selected: true,
        });
    }
    entries.sort_by(|a, b| b.version.cmp(&a.version));
    Ok(entries)
}

/// Drift of one dependency edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyDrift {
    /// Depended-upon minion.
    pub id: String,
    /// Its title.
    pub title: String,
    /// Pinned version.
    pub pinned: String,
    /// Live version.
    pub live: String,
    /// Live is newer than pinned.
    pub is_outdated: bool,
    /// Changed components, see [`version_diff`].
    pub diff: String,
    /// Pinnable versions, see [`version_history`].
    pub history: Vec<VersionHistoryEntry>,
}

/// Drift of every dependency of `owner` whose minion still exists.
///
/// # Errors
///
/// Returns [`VersionParseError`] if a pin is malformed.
pub fn drift_report(
    owner: &Minion,
    index: &TaskIndex<'_, Minion>,
) -> Result<Vec<DependencyDrift>, VersionParseError> {
    owner
        .dependencies
        .iter()
        .filter_map(|dependency| index.get(&dependency.id).map(|candidate| (dependency, candidate)))
        .map(|(dependency, candidate)| {
            Ok(DependencyDrift {
                id: candidate.id.clone(),
                title: candidate.title.clone(),
                pinned: dependency.version.clone(),
                live: candidate.version.to_string(),
                is_outdated: is_outdated(dependency, Some(candidate))?,
                diff: version_diff(dependency, Some(candidate))?.unwrap_or_default(),
                history: version_history(candidate, &owner.dependencies)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pinned(version: &str) -> Dependency {
        Dependency::pinned("b", "a", version)
    }

    fn live(version: Version) -> Minion {
        Minion::new("b", "B").with_version(version)
    }

    #[test]
    fn test_outdated_detection() {
        assert!(is_outdated(&pinned("1.0.0"), Some(&live(Version::new(1, 0, 1)))).unwrap());
        assert!(!is_outdated(&pinned("1.0.1"), Some(&live(Version::new(1, 0, 1)))).unwrap());
        assert!(!is_outdated(&pinned("1.1.0"), Some(&live(Version::new(1, 0, 0)))).unwrap());
        assert!(!is_outdated(&pinned("1.0.0"), None).unwrap());
    }

    #[test]
    fn test_outdated_ignores_cached_current_version() {
        let mut dep = pinned("0.1.0");
        dep.current_version = "9.9.9".to_string();
        assert!(!is_outdated(&dep, Some(&live(Version::new(0, 1, 0)))).unwrap());
    }

    #[test]
    fn test_malformed_pin_fails() {
        let b = live(Version::new(0, 0, 1));
        assert!(is_outdated(&pinned("1.0"), Some(&b)).is_err());
        assert!(version_diff(&pinned("x.y.z"), Some(&b)).is_err());
    }

    #[test]
    fn test_version_diff() {
        let b = live(Version::new(0, 2, 3));
        assert_eq!(
            version_diff(&pinned("0.1.0"), Some(&b)).unwrap().as_deref(),
            Some("Major version change, Minor version change")
        );
        assert_eq!(version_diff(&pinned("0.2.3"), Some(&b)).unwrap().as_deref(), Some(""));
        assert_eq!(version_diff(&pinned("0.2.3"), None).unwrap(), None);
    }

    #[test]
    fn test_version_history() {
        let b = live(Version::new(0, 1, 2));
        let history = version_history(&b, &[pinned("0.1.0")]).unwrap();
        assert_eq!(
            history,
            vec![
                VersionHistoryEntry {
                    version: Version::new(0, 1, 2),
                    is_current: true,
                    is_selected: false
                },
                VersionHistoryEntry {
                    version: Version::new(0, 1, 0),
                    is_current: false,
                    is_selected: true
                },
            ]
        );

        let history = version_history(&b, &[pinned("0.1.2")]).unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].is_current && history[0].is_selected);

        let history = version_history(&b, &[]).unwrap();
        assert!(!history[0].is_selected);
    }

    #[test]
    fn test_drift_report_skips_missing() {
        let mut a = Minion::new("a", "A");
        a.dependencies.push(pinned("0.0.0"));
        a.dependencies.push(Dependency::pinned("ghost", "a", "0.0.0"));
        let tasks = vec![a, live(Version::new(0, 0, 1))];
        let index = TaskIndex::new(&tasks);

        let report = drift_report(&tasks[0], &index).unwrap();
        assert_eq!(report.len(), 1);
        assert!(report[0].is_outdated);
        assert_eq!(report[0].diff, "Minor version change");
        assert_eq!(report[0].live, "0.0.1");
    }
}
