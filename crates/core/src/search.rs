//! Jump-to-node search over a snapshot.

use crate::minion::Minion;
use minions_task_graph::TaskNodeData;

/// Available minions whose title or description contains `term`, ignoring
/// case. An empty term matches every available minion.
#[must_use]
pub fn search_minions<'a>(tasks: &'a [Minion], term: &str) -> Vec<&'a Minion> {
    let needle = term.to_lowercase();
    tasks
        .iter()
        .filter(|m| m.is_available())
        .filter(|m| {
            m.title.to_lowercase().contains(&needle) || m.description.to_lowercase().contains(&needle)
        })
        .collect()
}
