use std::future::Future;
use std::pin::Pin;

use taskdeck_protocol::{
    Ack, CleanupResponse, GatewayError, LaunchRequest, LaunchResponse, OutputResponse,
    TaskDetail, TaskListResponse,
};

/// Boxed future returned by every [`Gateway`] method.
pub type GatewayFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, GatewayError>> + Send + 'a>>;

/// Answer to a reachability probe: whatever HTTP status came back, and how
/// long it took. Deciding whether that status means "reachable" is up to
/// the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeReply {
    pub status: u16,
    pub latency_ms: u64,
}

/// Typed access to the remote task worker.
///
/// Every method takes the base URL of the selected server so the same
/// gateway can serve any configured target. No method retries; callers
/// decide when to try again.
pub trait Gateway: Send + Sync {
    /// Lightweight `GET` of the server root, not a JSON API call.
    fn probe<'a>(&'a self, base: &'a str) -> GatewayFuture<'a, ProbeReply>;

    /// `POST /api/run`
    fn launch<'a>(
        &'a self,
        base: &'a str,
        request: &'a LaunchRequest,
    ) -> GatewayFuture<'a, LaunchResponse>;

    /// `GET /api/tasks`
    fn list_tasks<'a>(&'a self, base: &'a str) -> GatewayFuture<'a, TaskListResponse>;

    /// `GET /api/status/{id}`
    fn task_status<'a>(&'a self, base: &'a str, task_id: &'a str) -> GatewayFuture<'a, TaskDetail>;

    /// `GET /api/output/{id}`
    fn task_output<'a>(
        &'a self,
        base: &'a str,
        task_id: &'a str,
    ) -> GatewayFuture<'a, OutputResponse>;

    /// `POST /api/stop/{id}`
    fn stop_task<'a>(&'a self, base: &'a str, task_id: &'a str) -> GatewayFuture<'a, Ack>;

    /// `POST /api/cleanup`
    fn cleanup<'a>(&'a self, base: &'a str) -> GatewayFuture<'a, CleanupResponse>;
}
