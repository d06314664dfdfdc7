//! Local mirror of the remote task set.
//!
//! Always replaced wholesale from a snapshot, never patched. Counters are
//! derived from whatever the latest snapshot holds.

use std::collections::HashMap;

use chrono::{DateTime, Local};

use taskdeck_protocol::{TaskId, TaskListResponse, TaskStatus, TaskSummary};

/// What the registry currently represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryView {
    /// Nothing fetched yet.
    Empty,
    /// Mirrors the latest successful snapshot.
    Live,
    /// Cleared because the server is unreachable.
    Offline,
}

/// Summary of one snapshot replacement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaceReport {
    pub running: usize,
    pub total: usize,
    /// Tasks that went from completed back to running under the same id.
    pub reopened: Vec<TaskId>,
}

#[derive(Debug, Clone)]
pub struct TaskRegistry {
    tasks: HashMap<TaskId, TaskSummary>,
    view: RegistryView,
    last_updated: Option<DateTime<Local>>,
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
            view: RegistryView::Empty,
            last_updated: None,
        }
    }

    /// Replace the whole mapping with `snapshot`.
    pub fn replace(&mut self, snapshot: TaskListResponse, now: DateTime<Local>) -> ReplaceReport {
        let mut next = HashMap::with_capacity(snapshot.tasks.len());
        let mut reopened = Vec::new();
        for task in snapshot.tasks {
            let was_completed = self
                .tasks
                .get(&task.task_id)
                .is_some_and(|prev| prev.status == TaskStatus::Completed);
            if was_completed && task.is_running() {
                tracing::warn!(task_id = %task.task_id, "Completed task reported running again");
                reopened.push(task.task_id.clone());
            }
            next.insert(task.task_id.clone(), task);
        }

        self.tasks = next;
        self.view = RegistryView::Live;
        self.last_updated = Some(now);

        ReplaceReport {
            running: self.running_count(),
            total: self.total(),
            reopened,
        }
    }

    /// Drop everything and show the explicit offline view.
    pub fn set_offline(&mut self) {
        self.tasks.clear();
        self.view = RegistryView::Offline;
    }

    pub fn view(&self) -> RegistryView {
        self.view
    }

    pub fn last_updated(&self) -> Option<DateTime<Local>> {
        self.last_updated
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.tasks.contains_key(task_id)
    }

    pub fn get(&self, task_id: &str) -> Option<&TaskSummary> {
        self.tasks.get(task_id)
    }

    pub fn running_count(&self) -> usize {
        self.tasks.values().filter(|t| t.is_running()).count()
    }

    pub fn total(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// All tasks, newest start first, ties broken by id.
    pub fn tasks_sorted(&self) -> Vec<&TaskSummary> {
        let mut tasks: Vec<&TaskSummary> = self.tasks.values().collect();
        tasks.sort_by(|a, b| {
            let a_start = a.start_time.unwrap_or(0.0);
            let b_start = b.start_time.unwrap_or(0.0);
            b_start
                .total_cmp(&a_start)
                .then_with(|| a.task_id.cmp(&b.task_id))
        });
        tasks
    }

    /// Running tasks only, in the same order as [`Self::tasks_sorted`].
    pub fn running(&self) -> Vec<&TaskSummary> {
        self.tasks_sorted()
            .into_iter()
            .filter(|t| t.is_running())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, status: TaskStatus, start: f64) -> TaskSummary {
        TaskSummary {
            task_id: id.to_string(),
            status,
            start_time: Some(start),
            end_time: None,
            has_error: false,
        }
    }

    #[test]
    fn replace_counts_running() {
        let mut reg = TaskRegistry::new();
        let report = reg.replace(
            TaskListResponse {
                tasks: vec![
                    task("a", TaskStatus::Running, 1.0),
                    task("b", TaskStatus::Completed, 2.0),
                    task("c", TaskStatus::Running, 3.0),
                ],
                total: 3,
            },
            Local::now(),
        );
        assert_eq!(report.running, 2);
        assert_eq!(report.total, 3);
        assert_eq!(reg.view(), RegistryView::Live);
        assert!(reg.last_updated().is_some());
    }

    #[test]
    fn sorted_newest_first() {
        let mut reg = TaskRegistry::new();
        reg.replace(
            TaskListResponse {
                tasks: vec![
                    task("old", TaskStatus::Completed, 1.0),
                    task("new", TaskStatus::Running, 9.0),
                    task("mid", TaskStatus::Running, 5.0),
                ],
                total: 3,
            },
            Local::now(),
        );
        let ids: Vec<&str> = reg.tasks_sorted().iter().map(|t| t.task_id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
        let running: Vec<&str> = reg.running().iter().map(|t| t.task_id.as_str()).collect();
        assert_eq!(running, vec!["new", "mid"]);
    }

    #[test]
    fn reopened_task_is_reported() {
        let mut reg = TaskRegistry::new();
        reg.replace(
            TaskListResponse { tasks: vec![task("a", TaskStatus::Completed, 1.0)], total: 1 },
            Local::now(),
        );
        let report = reg.replace(
            TaskListResponse { tasks: vec![task("a", TaskStatus::Running, 1.0)], total: 1 },
            Local::now(),
        );
        assert_eq!(report.reopened, vec!["a".to_string()]);
        assert_eq!(report.running, 1);
    }

    #[test]
    fn offline_clears_everything() {
        let mut reg = TaskRegistry::new();
        reg.replace(
            TaskListResponse { tasks: vec![task("a", TaskStatus::Running, 1.0)], total: 1 },
            Local::now(),
        );
        reg.set_offline();
        assert!(reg.is_empty());
        assert_eq!(reg.running_count(), 0);
        assert_eq!(reg.view(), RegistryView::Offline);
    }
}
