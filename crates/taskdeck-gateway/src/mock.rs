//! Scripted in-memory worker for tests and dry runs.
//!
//! Behaves like the real worker (tasks, per-task status and output, stop,
//! cleanup), records every call it receives, and lets tests inject failures
//! per endpoint or hold a probe pending until released.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::Notify;

use taskdeck_protocol::{
    Ack, CleanupResponse, GatewayError, LaunchRequest, LaunchResponse, OutputLine,
    OutputResponse, TaskDetail, TaskFailure, TaskListResponse, TaskResult, TaskStatus,
    TaskSummary,
};

use crate::gateway::{Gateway, GatewayFuture, ProbeReply};

const CLEANUP_AGE_SECS: f64 = 24.0 * 60.0 * 60.0;

/// Endpoint selector for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Probe,
    Launch,
    ListTasks,
    TaskStatus,
    TaskOutput,
    StopTask,
    Cleanup,
}

/// A call received by the mock.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Probe,
    Launch(LaunchRequest),
    ListTasks,
    TaskStatus(String),
    TaskOutput(String),
    StopTask(String),
    Cleanup,
}

impl MockCall {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            MockCall::Probe => Endpoint::Probe,
            MockCall::Launch(_) => Endpoint::Launch,
            MockCall::ListTasks => Endpoint::ListTasks,
            MockCall::TaskStatus(_) => Endpoint::TaskStatus,
            MockCall::TaskOutput(_) => Endpoint::TaskOutput,
            MockCall::StopTask(_) => Endpoint::StopTask,
            MockCall::Cleanup => Endpoint::Cleanup,
        }
    }
}

/// A call together with the base URL it was addressed to.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub base: String,
    pub call: MockCall,
}

/// Holds probes pending until [`ProbeGate::release`] is called.
#[derive(Debug, Clone, Default)]
pub struct ProbeGate {
    notify: Arc<Notify>,
}

impl ProbeGate {
    /// Let exactly one held probe complete.
    pub fn release(&self) {
        self.notify.notify_one();
    }

    async fn wait(&self) {
        self.notify.notified().await;
    }
}

struct MockRemote {
    tasks: Vec<TaskSummary>,
    details: HashMap<String, TaskDetail>,
    outputs: HashMap<String, Vec<OutputLine>>,
    failures: HashMap<Endpoint, GatewayError>,
    probe_status: u16,
    probe_latency_ms: u64,
    probe_gate: Option<ProbeGate>,
    next_task_ids: VecDeque<String>,
    calls: Vec<RecordedCall>,
}

/// In-memory implementation of [`Gateway`].
pub struct MockGateway {
    remote: Mutex<MockRemote>,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            remote: Mutex::new(MockRemote {
                tasks: Vec::new(),
                details: HashMap::new(),
                outputs: HashMap::new(),
                failures: HashMap::new(),
                probe_status: 200,
                probe_latency_ms: 1,
                probe_gate: None,
                next_task_ids: VecDeque::new(),
                calls: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockRemote> {
        self.remote.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -- scripting ----------------------------------------------------------

    /// Add or replace a task in the remote list.
    pub fn with_task(self, summary: TaskSummary) -> Self {
        self.upsert_task(summary);
        self
    }

    pub fn upsert_task(&self, summary: TaskSummary) {
        let mut remote = self.lock();
        let detail = remote.details.entry(summary.task_id.clone()).or_default();
        detail.running = summary.is_running();
        detail.start_time = summary.start_time;
        detail.end_time = summary.end_time;
        match remote.tasks.iter_mut().find(|t| t.task_id == summary.task_id) {
            Some(existing) => *existing = summary,
            None => remote.tasks.push(summary),
        }
    }

    /// Drop a task from the remote list (its output and detail go with it).
    pub fn remove_task(&self, task_id: &str) {
        let mut remote = self.lock();
        remote.tasks.retain(|t| t.task_id != task_id);
        remote.details.remove(task_id);
        remote.outputs.remove(task_id);
    }

    /// Replace the full output of a task. The status detail embeds it too.
    pub fn set_output(&self, task_id: &str, lines: Vec<OutputLine>) {
        let mut remote = self.lock();
        remote
            .details
            .entry(task_id.to_string())
            .or_default()
            .output = lines.clone();
        remote.outputs.insert(task_id.to_string(), lines);
    }

    /// Mark a task as finished with the given return code.
    pub fn complete_task(&self, task_id: &str, returncode: i64) {
        let now = now_secs();
        let mut remote = self.lock();
        let stdout = remote
            .outputs
            .get(task_id)
            .map(|lines| {
                lines.iter().map(|l| l.content.as_str()).collect::<Vec<_>>().join("\n")
            })
            .unwrap_or_default();
        if let Some(task) = remote.tasks.iter_mut().find(|t| t.task_id == task_id) {
            task.status = TaskStatus::Completed;
            task.end_time = Some(now);
            task.has_error = returncode != 0;
        }
        let detail = remote.details.entry(task_id.to_string()).or_default();
        detail.running = false;
        detail.end_time = Some(now);
        detail.last_result = Some(TaskResult { returncode, stdout, stderr: String::new() });
        if returncode != 0 {
            detail.last_error = Some(TaskFailure {
                message: Some(format!("exited with code {returncode}")),
                stderr: None,
            });
        }
    }

    /// Make every call to `endpoint` fail with `err` until cleared.
    pub fn fail(&self, endpoint: Endpoint, err: GatewayError) {
        self.lock().failures.insert(endpoint, err);
    }

    pub fn clear_failure(&self, endpoint: Endpoint) {
        self.lock().failures.remove(&endpoint);
    }

    /// HTTP status the probe answers with.
    pub fn set_probe_status(&self, status: u16) {
        self.lock().probe_status = status;
    }

    pub fn set_probe_latency(&self, latency_ms: u64) {
        self.lock().probe_latency_ms = latency_ms;
    }

    /// Hold every probe until released through the returned gate.
    pub fn hold_probes(&self) -> ProbeGate {
        let gate = ProbeGate::default();
        self.lock().probe_gate = Some(gate.clone());
        gate
    }

    pub fn stop_holding_probes(&self) {
        self.lock().probe_gate = None;
    }

    /// Id assigned to the next launched task. Random v4 UUIDs otherwise.
    pub fn push_task_id(&self, task_id: impl Into<String>) {
        self.lock().next_task_ids.push_back(task_id.into());
    }

    // -- inspection ---------------------------------------------------------

    pub fn recorded(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.iter().map(|r| r.call.clone()).collect()
    }

    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    /// Number of calls that hit `endpoint`.
    pub fn count(&self, endpoint: Endpoint) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|r| r.call.endpoint() == endpoint)
            .count()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    // -- internals ----------------------------------------------------------

    /// Record the call, then return the injected failure for it, if any.
    fn record(&self, base: &str, call: MockCall) -> Result<(), GatewayError> {
        let mut remote = self.lock();
        let endpoint = call.endpoint();
        remote.calls.push(RecordedCall { base: base.to_string(), call });
        match remote.failures.get(&endpoint) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    async fn probe_inner(&self, base: &str) -> Result<ProbeReply, GatewayError> {
        self.record(base, MockCall::Probe)?;
        let gate = self.lock().probe_gate.clone();
        if let Some(gate) = gate {
            gate.wait().await;
        }
        let remote = self.lock();
        if let Some(err) = remote.failures.get(&Endpoint::Probe) {
            return Err(err.clone());
        }
        Ok(ProbeReply { status: remote.probe_status, latency_ms: remote.probe_latency_ms })
    }

    fn launch_inner(&self, base: &str, request: &LaunchRequest) -> Result<LaunchResponse, GatewayError> {
        self.record(base, MockCall::Launch(request.clone()))?;
        let task_id = self
            .lock()
            .next_task_ids
            .pop_front()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        self.upsert_task(TaskSummary {
            task_id: task_id.clone(),
            status: TaskStatus::Running,
            start_time: Some(now_secs()),
            end_time: None,
            has_error: false,
        });
        Ok(LaunchResponse { task_id, message: Some("task started".to_string()) })
    }

    fn list_inner(&self, base: &str) -> Result<TaskListResponse, GatewayError> {
        self.record(base, MockCall::ListTasks)?;
        let remote = self.lock();
        Ok(TaskListResponse {
            tasks: remote.tasks.clone(),
            total: remote.tasks.len() as u64,
        })
    }

    fn status_inner(&self, base: &str, task_id: &str) -> Result<TaskDetail, GatewayError> {
        self.record(base, MockCall::TaskStatus(task_id.to_string()))?;
        self.lock()
            .details
            .get(task_id)
            .cloned()
            .ok_or_else(not_found)
    }

    fn output_inner(&self, base: &str, task_id: &str) -> Result<OutputResponse, GatewayError> {
        self.record(base, MockCall::TaskOutput(task_id.to_string()))?;
        let remote = self.lock();
        if !remote.details.contains_key(task_id) {
            return Err(not_found());
        }
        Ok(OutputResponse {
            output: remote.outputs.get(task_id).cloned().unwrap_or_default(),
        })
    }

    fn stop_inner(&self, base: &str, task_id: &str) -> Result<Ack, GatewayError> {
        self.record(base, MockCall::StopTask(task_id.to_string()))?;
        let now = now_secs();
        let mut remote = self.lock();
        let Some(detail) = remote.details.get_mut(task_id) else {
            return Err(not_found());
        };
        if !detail.running {
            return Err(GatewayError::Http { code: 400, message: "task is not running".to_string() });
        }
        detail.running = false;
        detail.end_time = Some(now);
        detail.last_error = Some(TaskFailure {
            message: None,
            stderr: Some("task stopped by user".to_string()),
        });
        if let Some(task) = remote.tasks.iter_mut().find(|t| t.task_id == task_id) {
            task.status = TaskStatus::Completed;
            task.end_time = Some(now);
            task.has_error = true;
        }
        Ok(Ack {
            status: Some("success".to_string()),
            message: Some("stop request sent".to_string()),
        })
    }

    fn cleanup_inner(&self, base: &str) -> Result<CleanupResponse, GatewayError> {
        self.record(base, MockCall::Cleanup)?;
        let cutoff = now_secs() - CLEANUP_AGE_SECS;
        let mut remote = self.lock();
        let before = remote.tasks.len();
        let (keep, dropped): (Vec<_>, Vec<_>) = remote
            .tasks
            .drain(..)
            .partition(|t| t.is_running() || t.start_time.unwrap_or(0.0) > cutoff);
        remote.tasks = keep;
        for task in &dropped {
            remote.details.remove(&task.task_id);
            remote.outputs.remove(&task.task_id);
        }
        let cleaned = before - remote.tasks.len();
        Ok(CleanupResponse {
            message: format!("cleaned {cleaned} old task records"),
            remaining_tasks: Some(remote.tasks.len() as u64),
        })
    }
}

impl Gateway for MockGateway {
    fn probe<'a>(&'a self, base: &'a str) -> GatewayFuture<'a, ProbeReply> {
        Box::pin(self.probe_inner(base))
    }

    fn launch<'a>(
        &'a self,
        base: &'a str,
        request: &'a LaunchRequest,
    ) -> GatewayFuture<'a, LaunchResponse> {
        Box::pin(async move { self.launch_inner(base, request) })
    }

    fn list_tasks<'a>(&'a self, base: &'a str) -> GatewayFuture<'a, TaskListResponse> {
        Box::pin(async move { self.list_inner(base) })
    }

    fn task_status<'a>(&'a self, base: &'a str, task_id: &'a str) -> GatewayFuture<'a, TaskDetail> {
        Box::pin(async move { self.status_inner(base, task_id) })
    }

    fn task_output<'a>(
        &'a self,
        base: &'a str,
        task_id: &'a str,
    ) -> GatewayFuture<'a, OutputResponse> {
        Box::pin(async move { self.output_inner(base, task_id) })
    }

    fn stop_task<'a>(&'a self, base: &'a str, task_id: &'a str) -> GatewayFuture<'a, Ack> {
        Box::pin(async move { self.stop_inner(base, task_id) })
    }

    fn cleanup<'a>(&'a self, base: &'a str) -> GatewayFuture<'a, CleanupResponse> {
        Box::pin(async move { self.cleanup_inner(base) })
    }
}

fn not_found() -> GatewayError {
    GatewayError::Http { code: 404, message: "task id not found".to_string() }
}

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://mock";

    fn running(id: &str) -> TaskSummary {
        TaskSummary {
            task_id: id.to_string(),
            status: TaskStatus::Running,
            start_time: Some(now_secs()),
            end_time: None,
            has_error: false,
        }
    }

    #[tokio::test]
    async fn launch_assigns_scripted_id_and_lists_task() {
        let mock = MockGateway::new();
        mock.push_task_id("abc123");
        let req = LaunchRequest {
            username: "13812345678".into(),
            password: "pw".into(),
            list_id: "101".into(),
        };
        let resp = mock.launch(BASE, &req).await.unwrap();
        assert_eq!(resp.task_id, "abc123");

        let list = mock.list_tasks(BASE).await.unwrap();
        assert_eq!(list.total, 1);
        assert_eq!(list.tasks[0].task_id, "abc123");
        assert!(list.tasks[0].is_running());
    }

    #[tokio::test]
    async fn unknown_task_is_404() {
        let mock = MockGateway::new();
        let err = mock.task_status(BASE, "nope").await.unwrap_err();
        assert!(matches!(err, GatewayError::Http { code: 404, .. }));
    }

    #[tokio::test]
    async fn stop_twice_is_rejected() {
        let mock = MockGateway::new().with_task(running("t1"));
        mock.stop_task(BASE, "t1").await.unwrap();
        let err = mock.stop_task(BASE, "t1").await.unwrap_err();
        assert!(matches!(err, GatewayError::Http { code: 400, .. }));
        let detail = mock.task_status(BASE, "t1").await.unwrap();
        assert!(!detail.running);
        assert_eq!(detail.last_error.unwrap().describe(), "task stopped by user");
    }

    #[tokio::test]
    async fn cleanup_drops_old_completed_tasks_only() {
        let old = TaskSummary {
            task_id: "old".into(),
            status: TaskStatus::Completed,
            start_time: Some(1.0),
            end_time: Some(2.0),
            has_error: false,
        };
        let mock = MockGateway::new().with_task(old).with_task(running("fresh"));
        let resp = mock.cleanup(BASE).await.unwrap();
        assert_eq!(resp.message, "cleaned 1 old task records");
        assert_eq!(resp.remaining_tasks, Some(1));
    }

    #[tokio::test]
    async fn injected_failure_is_recorded_and_returned() {
        let mock = MockGateway::new();
        mock.fail(Endpoint::ListTasks, GatewayError::Timeout);
        assert_eq!(mock.list_tasks(BASE).await.unwrap_err(), GatewayError::Timeout);
        assert_eq!(mock.count(Endpoint::ListTasks), 1);
        mock.clear_failure(Endpoint::ListTasks);
        assert!(mock.list_tasks(BASE).await.is_ok());
    }

    #[tokio::test]
    async fn held_probe_completes_after_release() {
        let mock = Arc::new(MockGateway::new());
        let gate = mock.hold_probes();
        let pending = {
            let mock = mock.clone();
            tokio::spawn(async move { mock.probe(BASE).await })
        };
        while mock.count(Endpoint::Probe) == 0 {
            tokio::task::yield_now().await;
        }
        assert!(!pending.is_finished());
        gate.release();
        let reply = pending.await.unwrap().unwrap();
        assert_eq!(reply.status, 200);
    }
}
