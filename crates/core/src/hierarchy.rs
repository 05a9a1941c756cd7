//! Parent/child hierarchy edits.

use crate::candidates::{ParentOption, is_descendant, parent_candidates};
use crate::dependencies::{DependencyManager, require};
use crate::error::{Error, Result, ValidationError};
use crate::minion::MinionPatch;
use crate::store::{StoreError, TaskStore};
use minions_task_graph::{TaskIndex, TaskNodeData};

impl<S: TaskStore> DependencyManager<S> {
    /// Minions `task_id` could be moved under, filtered by `search`.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::NotFound`] if the minion is missing
    /// - [`Error::Store`] if the store cannot be listed
    pub async fn available_parents(&self, task_id: &str, search: &str) -> Result<Vec<ParentOption>> {
        let tasks = self.snapshot().await?;
        let index = TaskIndex::new(&tasks);
        require(&index, task_id)?;
        Ok(parent_candidates(&index, task_id, search))
    }

    /// Move `task_id` under `parent_id`, or to the top level with `None`.
    ///
    /// The minion's `parentId` is written first, then the old parent's and
    /// the new parent's `children`.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::NotFound`] if either minion is missing
    /// - [`ValidationError::SelfParent`] if `parent_id == task_id`
    /// - [`ValidationError::CandidateUnavailable`] if the parent is archived or deleted
    /// - [`ValidationError::HierarchyCycle`] if the parent is a descendant
    /// - [`Error::Store`] if the minion write fails
    /// - [`Error::PartialWrite`] if a parent's `children` write fails
    pub async fn set_parent(&self, task_id: &str, parent_id: Option<&str>) -> Result<()> {
        let _guard = self.lock().await;
        let tasks = self.snapshot().await?;
        let index = TaskIndex::new(&tasks);
        let task = require(&index, task_id)?;

        let new_parent = match parent_id {
            Some(id) if id == task_id => {
                return Err(ValidationError::SelfParent {
                    task: task_id.to_string(),
                }
                .into());
            }
            Some(id) => {
                let parent = require(&index, id)?;
                if !parent.is_available() {
                    return Err(ValidationError::CandidateUnavailable {
                        candidate: id.to_string(),
                    }
                    .into());
                }
                if is_descendant(&index, task_id, id) {
                    return Err(ValidationError::HierarchyCycle {
                        task: task_id.to_string(),
                        parent: id.to_string(),
                    }
                    .into());
                }
                Some(parent)
            }
            None => None,
        };

        let old_parent_id = task.parent_id.as_deref();
        if old_parent_id == parent_id {
            tracing::debug!(minion = %task_id, "Parent unchanged");
            return Ok(());
        }

        self.store()
            .update(
                task_id,
                MinionPatch::new().parent_id(parent_id.map(str::to_string)),
            )
            .await
            .map_err(|e| Error::store("update", task_id, e))?;

        if let Some(old) = old_parent_id.and_then(|id| index.get(id)) {
            let children: Vec<String> = old.children.iter().filter(|c| *c != task_id).cloned().collect();
            self.store()
                .update(&old.id, MinionPatch::new().children(children))
                .await
                .map_err(|e| hierarchy_partial_write(task_id, &old.id, e))?;
        }
        if let Some(parent) = new_parent {
            let mut children = parent.children.clone();
            if !children.iter().any(|c| c == task_id) {
                children.push(task_id.to_string());
            }
            self.store()
                .update(&parent.id, MinionPatch::new().children(children))
                .await
                .map_err(|e| hierarchy_partial_write(task_id, &parent.id, e))?;
        }

        tracing::info!(minion = %task_id, parent = ?parent_id, "Parent changed");
        Ok(())
    }
}

fn hierarchy_partial_write(task_id: &str, parent_id: &str, source: StoreError) -> Error {
    tracing::warn!(
        minion = %task_id,
        parent = %parent_id,
        "Hierarchy write only partially committed; run reconciliation"
    );
    Error::PartialWrite {
        owner: task_id.to_string(),
        counterpart: parent_id.to_string(),
        failed_task: parent_id.to_string(),
        source,
    }
}
