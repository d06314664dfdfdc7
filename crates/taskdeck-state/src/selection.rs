//! Which task is shown in the detail and output panes.
//!
//! Registry reconciliation never mutates the selection. A selection whose
//! task vanished from the latest snapshot is "stale": kept, but skipped by
//! dependent refreshes until the task shows up again.

use taskdeck_protocol::TaskId;

use crate::error::StateError;
use crate::registry::TaskRegistry;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionTracker {
    selected: Option<TaskId>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Select a task that exists in the current snapshot. Leaves the prior
    /// selection untouched on failure.
    pub fn select(&mut self, registry: &TaskRegistry, task_id: &str) -> Result<(), StateError> {
        if !registry.contains(task_id) {
            return Err(StateError::NotFound(task_id.to_string()));
        }
        self.selected = Some(task_id.to_string());
        Ok(())
    }

    /// Point at a task the registry may not know yet, e.g. one just launched.
    pub fn assign(&mut self, task_id: impl Into<TaskId>) {
        self.selected = Some(task_id.into());
    }

    /// Selected id if it is present in `registry`.
    pub fn live<'a>(&'a self, registry: &TaskRegistry) -> Option<&'a str> {
        self.selected().filter(|id| registry.contains(id))
    }

    pub fn is_stale(&self, registry: &TaskRegistry) -> bool {
        self.selected().is_some_and(|id| !registry.contains(id))
    }
}
