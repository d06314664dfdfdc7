//! Request and response shapes of the remote worker API.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::STDERR_MARKER;

/// Opaque task identifier assigned by the worker.
pub type TaskId = String;

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// Lifecycle status of a remote task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Running,
    Completed,
}

impl TaskStatus {
    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
        }
    }
}

/// One entry of the `/api/tasks` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub task_id: TaskId,
    pub status: TaskStatus,
    /// Unix seconds.
    #[serde(default)]
    pub start_time: Option<f64>,
    /// Unix seconds. Absent while running.
    #[serde(default)]
    pub end_time: Option<f64>,
    #[serde(default)]
    pub has_error: bool,
}

impl TaskSummary {
    pub fn is_running(&self) -> bool {
        self.status == TaskStatus::Running
    }
}

/// Body of `GET /api/tasks`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskListResponse {
    #[serde(default)]
    pub tasks: Vec<TaskSummary>,
    #[serde(default)]
    pub total: u64,
}

/// Outcome of a task that exited normally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub returncode: i64,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
}

/// Outcome of a task that ended abnormally (crash, timeout, user stop).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskFailure {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub stderr: Option<String>,
}

impl TaskFailure {
    /// Most specific human-readable description available.
    pub fn describe(&self) -> &str {
        self.stderr
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.message.as_deref().filter(|s| !s.is_empty()))
            .unwrap_or("unknown error")
    }
}

/// Body of `GET /api/status/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskDetail {
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub start_time: Option<f64>,
    #[serde(default)]
    pub end_time: Option<f64>,
    #[serde(default)]
    pub last_result: Option<TaskResult>,
    #[serde(default)]
    pub last_error: Option<TaskFailure>,
    /// Output recorded so far, when the worker embeds it in the status.
    #[serde(default)]
    pub output: Vec<OutputLine>,
}

impl TaskDetail {
    pub fn has_output(&self) -> bool {
        !self.output.is_empty()
    }

    /// Whether the output buffer is worth refreshing for this task.
    ///
    /// A finished task with an empty `output` list is skipped; the field
    /// being present is not enough.
    pub fn wants_output(&self) -> bool {
        self.running || self.has_output()
    }

    /// Elapsed seconds, measured to `end_time` or to `now` while running.
    pub fn duration_secs(&self, now: f64) -> f64 {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => (end - start).max(0.0),
            (Some(start), None) => (now - start).max(0.0),
            _ => 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Stream a line of output came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Stdout,
    Stderr,
}

/// One line of task output. Immutable once received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawOutputLine")]
pub struct OutputLine {
    #[serde(rename = "type")]
    pub kind: OutputKind,
    pub content: String,
}

impl OutputLine {
    pub fn stdout(content: impl Into<String>) -> Self {
        Self { kind: OutputKind::Stdout, content: content.into() }
    }

    pub fn stderr(content: impl Into<String>) -> Self {
        Self { kind: OutputKind::Stderr, content: content.into() }
    }
}

/// Accepted wire forms: a tagged object, or a bare string as the worker
/// emits when it flattens both streams into one list.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawOutputLine {
    Text(String),
    Tagged {
        #[serde(rename = "type", default)]
        kind: Option<OutputKind>,
        #[serde(default)]
        content: String,
    },
}

impl From<RawOutputLine> for OutputLine {
    fn from(raw: RawOutputLine) -> Self {
        match raw {
            RawOutputLine::Text(content) => {
                let kind = if content.starts_with(STDERR_MARKER) {
                    OutputKind::Stderr
                } else {
                    OutputKind::Stdout
                };
                OutputLine { kind, content }
            }
            RawOutputLine::Tagged { kind, content } => OutputLine {
                kind: kind.unwrap_or(OutputKind::Stdout),
                content,
            },
        }
    }
}

/// Body of `GET /api/output/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputResponse {
    #[serde(default)]
    pub output: Vec<OutputLine>,
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Body of `POST /api/run`. Build through [`crate::validate_launch`].
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchRequest {
    pub username: String,
    pub password: String,
    pub list_id: String,
}

impl fmt::Debug for LaunchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaunchRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("list_id", &self.list_id)
            .finish()
    }
}

/// Body returned by `POST /api/run`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchResponse {
    pub task_id: TaskId,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body returned by `POST /api/cleanup`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanupResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub remaining_tasks: Option<u64>,
}

/// Generic acknowledgement (`POST /api/stop/{id}`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_line_accepts_tagged_objects() {
        let line: OutputLine =
            serde_json::from_str(r#"{"type":"stderr","content":"boom"}"#).unwrap();
        assert_eq!(line, OutputLine::stderr("boom"));
    }

    #[test]
    fn output_line_accepts_bare_strings() {
        let lines: Vec<OutputLine> =
            serde_json::from_str(r#"["[10:00:01] start", "错误: bad cookie"]"#).unwrap();
        assert_eq!(lines[0], OutputLine::stdout("[10:00:01] start"));
        assert_eq!(lines[1].kind, OutputKind::Stderr);
        assert_eq!(lines[1].content, "错误: bad cookie");
    }

    #[test]
    fn output_line_serializes_with_type_field() {
        let json = serde_json::to_value(OutputLine::stdout("x")).unwrap();
        assert_eq!(json["type"], "stdout");
        assert_eq!(json["content"], "x");
    }

    #[test]
    fn task_list_decodes_worker_payload() {
        let body = r#"{
            "tasks": [
                {"task_id": "a", "status": "running", "start_time": 1700000000.5,
                 "end_time": null, "has_error": false},
                {"task_id": "b", "status": "completed", "start_time": 1700000000.0,
                 "end_time": 1700000060.0, "has_error": true}
            ],
            "total": 2
        }"#;
        let list: TaskListResponse = serde_json::from_str(body).unwrap();
        assert_eq!(list.total, 2);
        assert!(list.tasks[0].is_running());
        assert!(list.tasks[1].has_error);
        assert_eq!(list.tasks[1].end_time, Some(1700000060.0));
    }

    #[test]
    fn task_detail_wants_output_when_running_or_has_output() {
        let mut detail = TaskDetail::default();
        assert!(!detail.wants_output());
        detail.output.push(OutputLine::stdout("x"));
        assert!(detail.wants_output());
        let running = TaskDetail { running: true, ..Default::default() };
        assert!(running.wants_output());
    }

    #[test]
    fn task_detail_duration_uses_end_or_now() {
        let done = TaskDetail {
            start_time: Some(100.0),
            end_time: Some(160.0),
            ..Default::default()
        };
        assert_eq!(done.duration_secs(1_000.0), 60.0);
        let running = TaskDetail { running: true, start_time: Some(100.0), ..Default::default() };
        assert_eq!(running.duration_secs(130.0), 30.0);
    }

    #[test]
    fn failure_prefers_stderr_then_message() {
        let f = TaskFailure { message: Some("m".into()), stderr: Some("stopped by user".into()) };
        assert_eq!(f.describe(), "stopped by user");
        let f = TaskFailure { message: Some("m".into()), stderr: Some(String::new()) };
        assert_eq!(f.describe(), "m");
        let f = TaskFailure { message: None, stderr: None };
        assert_eq!(f.describe(), "unknown error");
    }

    #[test]
    fn launch_request_debug_redacts_password() {
        let req = LaunchRequest {
            username: "13812345678".into(),
            password: "hunter2".into(),
            list_id: "101".into(),
        };
        let dbg = format!("{req:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("13812345678"));
    }
}
