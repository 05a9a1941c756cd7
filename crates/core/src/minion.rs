//! The minion record and partial updates to it.

use crate::version::Version;
use chrono::{DateTime, Utc};
use minions_task_graph::TaskNodeData;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Work state of a minion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    /// Not started yet.
    #[default]
    NotStarted,
    /// Being worked on.
    InProgress,
    /// Waiting on something else.
    Blocked,
    /// Done.
    Completed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotStarted => "not-started",
            Self::InProgress => "in-progress",
            Self::Blocked => "blocked",
            Self::Completed => "completed",
        })
    }
}

/// Priority of a minion.
///
/// Declaration order is display order: `Urgent < High < Medium < Low`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Needs attention now.
    Urgent,
    /// Important.
    High,
    /// Normal.
    #[default]
    Medium,
    /// Whenever.
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Urgent => "urgent",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        })
    }
}

/// How often a recurring minion repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// Every n days.
    Daily,
    /// Every n weeks.
    Weekly,
    /// Every n months.
    Monthly,
    /// Every n years.
    Yearly,
}

/// Recurrence settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recurring {
    /// Repeat unit.
    pub frequency: Frequency,
    /// Units between occurrences.
    #[serde(default = "default_interval")]
    pub interval: u32,
    /// Last date an occurrence may fall on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

const fn default_interval() -> u32 {
    1
}

/// A pinned dependency edge.
///
/// Stored in the owner's `dependencies` with `id` naming the depended-upon
/// minion and `minion_id` naming the owner. The mirror copy in the other
/// minion's `dependentOn` swaps the two ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    /// The referenced minion.
    pub id: String,
    /// The minion holding this entry.
    pub minion_id: String,
    /// Pinned version of `id`.
    pub version: String,
    /// Cached live version of `id` when the entry was last refreshed.
    #[serde(default)]
    pub current_version: String,
}

impl Dependency {
    /// Create an entry pinned and cached at `version`.
    #[must_use]
    pub fn pinned(id: impl Into<String>, minion_id: impl Into<String>, version: impl Into<String>) -> Self {
        let version = version.into();
        Self {
            id: id.into(),
            minion_id: minion_id.into(),
            current_version: version.clone(),
            version,
        }
    }

    /// The back reference stored on the depended-upon minion.
    #[must_use]
    pub fn mirror(&self) -> Self {
        Self {
            id: self.minion_id.clone(),
            minion_id: self.id.clone(),
            version: self.version.clone(),
            current_version: self.current_version.clone(),
        }
    }
}

/// A task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Minion {
    /// Unique id.
    pub id: String,
    /// Free-form kind, e.g. "task" or "bug".
    #[serde(rename = "type", default)]
    pub minion_type: String,
    /// Display title.
    pub title: String,
    /// Long description.
    #[serde(default)]
    pub description: String,
    /// Work state.
    #[serde(default)]
    pub status: Status,
    /// Priority.
    #[serde(default)]
    pub priority: Priority,
    /// Due date (ISO 8601).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    /// Estimated effort in hours.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<f64>,
    /// Tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Labels.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Parent in the hierarchy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Children in the hierarchy, in display order.
    #[serde(default)]
    pub children: Vec<String>,
    /// Minions this one depends on.
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    /// Back references from minions that depend on this one.
    #[serde(default)]
    pub dependent_on: Vec<Dependency>,
    /// Current version.
    #[serde(default)]
    pub version: Version,
    /// Recurrence settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring: Option<Recurring>,
    /// Starred by the user.
    #[serde(default)]
    pub favorite: bool,
    /// Archived minions stay in the store but are no longer offered.
    #[serde(default)]
    pub archived: bool,
    /// Set when soft-deleted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    /// Creation time.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Last update time.
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Minion {
    /// Create a minion with default fields.
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            minion_type: "task".to_string(),
            title: title.into(),
            description: String::new(),
            status: Status::default(),
            priority: Priority::default(),
            due_date: None,
            estimated_time: None,
            tags: Vec::new(),
            labels: Vec::new(),
            parent_id: None,
            children: Vec::new(),
            dependencies: Vec::new(),
            dependent_on: Vec::new(),
            version: Version::default(),
            recurring: None,
            favorite: false,
            archived: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the status.
    #[must_use]
    pub const fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    /// Set the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the version.
    #[must_use]
    pub const fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Set the parent.
    #[must_use]
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Set the children.
    #[must_use]
    pub fn with_children(mut self, children: &[&str]) -> Self {
        self.children = children.iter().map(|c| (*c).to_string()).collect();
        self
    }

    /// Mark as archived.
    #[must_use]
    pub const fn archived(mut self) -> Self {
        self.archived = true;
        self
    }

    /// Whether the status is completed.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == Status::Completed
    }

    /// The dependency entry referencing `id`, if declared.
    #[must_use]
    pub fn dependency(&self, id: &str) -> Option<&Dependency> {
        self.dependencies.iter().find(|d| d.id == id)
    }

    /// The back reference from `owner_id`, if present.
    #[must_use]
    pub fn dependent(&self, owner_id: &str) -> Option<&Dependency> {
        self.dependent_on.iter().find(|d| d.id == owner_id)
    }
}

impl TaskNodeData for Minion {
    fn id(&self) -> &str {
        &self.id
    }

    fn dependency_ids(&self) -> impl Iterator<Item = &str> {
        self.dependencies.iter().map(|d| d.id.as_str())
    }

    fn child_ids(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(String::as_str)
    }

    fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    fn is_available(&self) -> bool {
        !self.archived && self.deleted_at.is_none()
    }
}

/// A partial update. `None` leaves a field alone.
///
/// Nullable fields use `Option<Option<_>>`: `Some(None)` clears them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MinionPatch {
    /// New title.
    pub title: Option<String>,
    /// New kind.
    pub minion_type: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New status.
    pub status: Option<Status>,
    /// New priority.
    pub priority: Option<Priority>,
    /// New or cleared due date.
    pub due_date: Option<Option<String>>,
    /// New or cleared estimate.
    pub estimated_time: Option<Option<f64>>,
    /// New tags.
    pub tags: Option<Vec<String>>,
    /// New labels.
    pub labels: Option<Vec<String>>,
    /// New or cleared parent.
    pub parent_id: Option<Option<String>>,
    /// New children list.
    pub children: Option<Vec<String>>,
    /// New dependency list.
    pub dependencies: Option<Vec<Dependency>>,
    /// New back reference list.
    pub dependent_on: Option<Vec<Dependency>>,
    /// New version.
    pub version: Option<Version>,
    /// New or cleared recurrence.
    pub recurring: Option<Option<Recurring>>,
    /// New favorite flag.
    pub favorite: Option<bool>,
    /// New archived flag.
    pub archived: Option<bool>,
    /// New or cleared soft-delete time.
    pub deleted_at: Option<Option<DateTime<Utc>>>,
}

/// Invokes `$m!` with every patch field and its wire name.
macro_rules! for_each_field {
    ($m:ident) => {
        $m! {
            title => "title",
            minion_type => "type",
            description => "description",
            status => "status",
            priority => "priority",
            due_date => "dueDate",
            estimated_time => "estimatedTime",
            tags => "tags",
            labels => "labels",
            parent_id => "parentId",
            children => "children",
            dependencies => "dependencies",
            dependent_on => "dependentOn",
            version => "version",
            recurring => "recurring",
            favorite => "favorite",
            archived => "archived",
            deleted_at => "deletedAt",
        }
    };
}

impl MinionPatch {
    /// An empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the status.
    #[must_use]
    pub const fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    /// Set the priority.
    #[must_use]
    pub const fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Set the tags.
    #[must_use]
    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    /// Set or clear the parent.
    #[must_use]
    pub fn parent_id(mut self, parent_id: Option<String>) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Replace the children list.
    #[must_use]
    pub fn children(mut self, children: Vec<String>) -> Self {
        self.children = Some(children);
        self
    }

    /// Replace the dependency list.
    #[must_use]
    pub fn dependencies(mut self, dependencies: Vec<Dependency>) -> Self {
        self.dependencies = Some(dependencies);
        self
    }

    /// Replace the back reference list.
    #[must_use]
    pub fn dependent_on(mut self, dependent_on: Vec<Dependency>) -> Self {
        self.dependent_on = Some(dependent_on);
        self
    }

    /// Set the version.
    #[must_use]
    pub const fn version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    /// Set the archived flag.
    #[must_use]
    pub const fn archived(mut self, archived: bool) -> Self {
        self.archived = Some(archived);
        self
    }

    /// Wire names of every field the patch sets.
    #[must_use]
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        macro_rules! present {
            ($($field:ident => $name:literal),* $(,)?) => {
                $(if self.$field.is_some() { names.push($name); })*
            };
        }
        for_each_field!(present);
        names
    }

    /// Wire names of the fields whose patched value differs from `original`.
    #[must_use]
    pub fn changed_fields(&self, original: &Minion) -> Vec<&'static str> {
        let mut names = Vec::new();
        macro_rules! changed {
            ($($field:ident => $name:literal),* $(,)?) => {
                $(if self.$field.as_ref().is_some_and(|v| *v != original.$field) {
                    names.push($name);
                })*
            };
        }
        for_each_field!(changed);
        names
    }

    /// Whether the patch sets nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.field_names().is_empty()
    }

    /// Write every set field into `minion`.
    pub fn apply(self, minion: &mut Minion) {
        macro_rules! assign {
            ($($field:ident => $name:literal),* $(,)?) => {
                $(if let Some(value) = self.$field { minion.$field = value; })*
            };
        }
        for_each_field!(assign);
    }

    /// Set `version` to `original`'s version bumped for this edit.
    ///
    /// A `user` component already present in the patch is kept; `major` and
    /// `minor` always start from `original`.
    #[must_use]
    pub fn with_version_bump(mut self, original: &Minion) -> Self {
        let bump = crate::version::VersionBump::classify(original, &self);
        let base = Version {
            user: self.version.map_or(original.version.user, |v| v.user),
            ..original.version
        };
        self.version = Some(bump.apply(base));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minion_wire_format() {
        let mut m = Minion::new("a", "Write report").with_priority(Priority::High);
        m.dependencies.push(Dependency::pinned("b", "a", "0.1.0"));

        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["type"], "task");
        assert_eq!(json["priority"], "high");
        assert_eq!(json["status"], "not-started");
        assert_eq!(json["dependencies"][0]["minionId"], "a");
        assert_eq!(json["dependencies"][0]["currentVersion"], "0.1.0");
        assert_eq!(json["version"]["major"], "0");
        assert!(json.get("parentId").is_none());

        let parsed: Minion = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, m);
    }

    #[test]
    fn test_minion_minimal_json() {
        let m: Minion = serde_json::from_str(r#"{"id": "x", "title": "X"}"#).unwrap();
        assert_eq!(m.version, Version::default());
        assert!(m.dependencies.is_empty());
        assert!(m.is_available());
    }

    #[test]
    fn test_mirror_swaps_ids() {
        let dep = Dependency::pinned("b", "a", "0.2.0");
        let mirror = dep.mirror();
        assert_eq!(mirror.id, "a");
        assert_eq!(mirror.minion_id, "b");
        assert_eq!(mirror.version, "0.2.0");
    }

    #[test]
    fn test_availability() {
        assert!(!Minion::new("a", "A").archived().is_available());
        let mut deleted = Minion::new("b", "B");
        deleted.deleted_at = Some(Utc::now());
        assert!(!deleted.is_available());
    }

    #[test]
    fn test_patch_apply_and_fields() {
        let mut m = Minion::new("a", "Old");
        let patch = MinionPatch::new()
            .title("New")
            .parent_id(None)
            .children(vec!["c".to_string()]);
        assert_eq!(patch.field_names(), vec!["title", "parentId", "children"]);
        assert_eq!(patch.changed_fields(&m), vec!["title", "children"]);

        patch.apply(&mut m);
        assert_eq!(m.title, "New");
        assert_eq!(m.children, vec!["c"]);
        assert!(MinionPatch::new().is_empty());
    }

    #[test]
    fn test_with_version_bump() {
        let original = Minion::new("a", "A").with_version(Version::new(0, 1, 1));
        let patch = MinionPatch::new()
            .status(Status::Completed)
            .title("B")
            .with_version_bump(&original);
        assert_eq!(patch.version, Some(Version::new(0, 2, 2)));

        // User component set by hand survives the bump
        let patch = MinionPatch::new()
            .version(Version::new(3, 0, 0))
            .title("C")
            .with_version_bump(&original);
        assert_eq!(patch.version, Some(Version::new(3, 1, 2)));
    }
}
