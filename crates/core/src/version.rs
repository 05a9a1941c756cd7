//! Three-part minion versions.
//!
//! A version is `user.major.minor`. `user` only moves when a person sets it;
//! `major` and `minor` are bumped automatically when fields change, following
//! [`VersionBump::classify`]. Ordering is lexicographic over
//! `(user, major, minor)` and never uses string comparison.
//!
//! On the wire each component is a decimal string (`{"user": "0", "major":
//! "1", "minor": "4"}`); numbers are accepted when reading.

use crate::minion::{Minion, MinionPatch};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Version reported for a missing minion.
pub const MISSING_VERSION: &str = "0.0.0";

/// A version string or component that is not a non-negative integer triple.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
#[error("Invalid version '{input}': {reason}")]
#[diagnostic(
    code(minions::version::parse),
    help("Versions have the form <user>.<major>.<minor>, e.g. 0.2.11")
)]
pub struct VersionParseError {
    /// The rejected input.
    pub input: String,
    /// What was wrong with it.
    pub reason: String,
}

impl VersionParseError {
    fn new(input: &str, reason: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// A minion version.
///
/// Field order matters: the derived `Ord` compares `user`, then `major`,
/// then `minor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "RawVersion", into = "RawVersion")]
pub struct Version {
    /// Manually controlled component.
    pub user: u64,
    /// Bumped on structural changes.
    pub major: u64,
    /// Bumped on content changes.
    pub minor: u64,
}

impl Version {
    /// Create a version from its components.
    #[must_use]
    pub const fn new(user: u64, major: u64, minor: u64) -> Self {
        Self { user, major, minor }
    }

    /// Components in which `other` differs from `self`, most significant first.
    #[must_use]
    pub fn changed_components(&self, other: &Self) -> Vec<VersionComponent> {
        let mut changed = Vec::new();
        if self.user != other.user {
            changed.push(VersionComponent::User);
        }
        if self.major != other.major {
            changed.push(VersionComponent::Major);
        }
        if self.minor != other.minor {
            changed.push(VersionComponent::Minor);
        }
        changed
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.user, self.major, self.minor)
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        let [user, major, minor] = parts.as_slice() else {
            return Err(VersionParseError::new(
                s,
                format!("expected 3 components, found {}", parts.len()),
            ));
        };
        Ok(Self {
            user: parse_component(s, user)?,
            major: parse_component(s, major)?,
            minor: parse_component(s, minor)?,
        })
    }
}

fn parse_component(input: &str, component: &str) -> Result<u64, VersionParseError> {
    if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VersionParseError::new(
            input,
            format!("component '{component}' is not a non-negative integer"),
        ));
    }
    component
        .parse()
        .map_err(|e| VersionParseError::new(input, format!("component '{component}': {e}")))
}

/// One component of a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionComponent {
    /// The `user` component.
    User,
    /// The `major` component.
    Major,
    /// The `minor` component.
    Minor,
}

impl VersionComponent {
    /// Human readable description of a change in this component.
    #[must_use]
    pub const fn change_label(self) -> &'static str {
        match self {
            Self::User => "User version change",
            Self::Major => "Major version change",
            Self::Minor => "Minor version change",
        }
    }
}

/// Live version string of a minion, or `"0.0.0"` when it does not exist.
#[must_use]
pub fn format_version(minion: Option<&Minion>) -> String {
    minion.map_or_else(|| MISSING_VERSION.to_string(), |m| m.version.to_string())
}

/// Compare two version strings by numeric components.
///
/// # Errors
///
/// Returns [`VersionParseError`] if either string is malformed.
pub fn compare_versions(a: &str, b: &str) -> Result<Ordering, VersionParseError> {
    Ok(a.parse::<Version>()?.cmp(&b.parse::<Version>()?))
}

/// Which component a changed field bumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpKind {
    /// Structural change: status, priority, hierarchy, dependencies, recurrence.
    Major,
    /// Content change: everything else a person can edit.
    Minor,
}

/// Bump rule for a patch field, or `None` for fields that never bump.
///
/// Back references, timestamps and the version itself are maintained by the
/// system and do not count as edits.
#[must_use]
pub fn bump_kind(field: &str) -> Option<BumpKind> {
    match field {
        "status" | "priority" | "parentId" | "dependencies" | "recurring" => Some(BumpKind::Major),
        "children" | "dependentOn" | "version" | "createdAt" | "updatedAt" | "deletedAt" => None,
        _ => Some(BumpKind::Minor),
    }
}

/// Automatic version increments caused by an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VersionBump {
    /// Increment applied to `major`.
    pub major: u64,
    /// Increment applied to `minor`.
    pub minor: u64,
}

impl VersionBump {
    /// Classify the fields `patch` actually changes on `original`.
    ///
    /// Each changed field contributes one increment to the component its rule
    /// names. Fields set to their current value are ignored.
    #[must_use]
    pub fn classify(original: &Minion, patch: &MinionPatch) -> Self {
        patch
            .changed_fields(original)
            .into_iter()
            .filter_map(bump_kind)
            .fold(Self::default(), |mut bump, kind| {
                match kind {
                    BumpKind::Major => bump.major += 1,
                    BumpKind::Minor => bump.minor += 1,
                }
                bump
            })
    }

    /// Whether nothing is bumped.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.major == 0 && self.minor == 0
    }

    /// Apply the increments to `version`. `user` is left alone.
    #[must_use]
    pub const fn apply(self, version: Version) -> Version {
        Version {
            user: version.user,
            major: version.major + self.major,
            minor: version.minor + self.minor,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RawVersion {
    user: RawComponent,
    major: RawComponent,
    minor: RawComponent,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawComponent {
    Number(u64),
    Text(String),
}

impl RawComponent {
    fn into_u64(self) -> Result<u64, VersionParseError> {
        match self {
            Self::Number(n) => Ok(n),
            Self::Text(s) => parse_component(&s, s.trim()),
        }
    }
}

impl TryFrom<RawVersion> for Version {
    type Error = VersionParseError;

    fn try_from(raw: RawVersion) -> Result<Self, Self::Error> {
        Ok(Self {
            user: raw.user.into_u64()?,
            major: raw.major.into_u64()?,
            minor: raw.minor.into_u64()?,
        })
    }
}

impl From<Version> for RawVersion {
    fn from(v: Version) -> Self {
        Self {
            user: RawComponent::Text(v.user.to_string()),
            major: RawComponent::Text(v.major.to_string()),
            minor: RawComponent::Text(v.minor.to_string()),
        }
    }
}
