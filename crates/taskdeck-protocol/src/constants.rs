//! Default timings, caps and server targets.

/// Interval of the general poll tick (ms).
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;
/// Interval of the registry auto-refresh loop (ms).
pub const DEFAULT_AUTO_REFRESH_INTERVAL_MS: u64 = 5_000;
/// Interval of the background health loop (ms).
pub const DEFAULT_HEALTH_CHECK_INTERVAL_MS: u64 = 30_000;
/// Hard timeout applied to every JSON API call (ms).
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
/// Timeout of the reachability probe (ms). Shorter than the API timeout.
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 3_000;
/// Display cap applied to the rendered output of a task.
pub const DEFAULT_MAX_OUTPUT_LINES: usize = 500;

/// Name of the server target selected when none is configured.
pub const DEFAULT_SERVER: &str = "local";

/// Built-in named server targets: (name, base URL).
pub const DEFAULT_SERVERS: &[(&str, &str)] = &[
    ("remote", "http://154.36.158.140:5001"),
    ("local", "http://127.0.0.1:5000"),
    ("localhost", "http://localhost:5000"),
];

/// Prefix the worker puts on stderr lines when it flattens output to strings.
pub const STDERR_MARKER: &str = "错误: ";

/// Message attached to `GatewayError::Network`.
pub const NETWORK_UNREACHABLE_MESSAGE: &str =
    "unable to reach server, check the address and port";

pub const ENDPOINT_RUN: &str = "/api/run";
pub const ENDPOINT_TASKS: &str = "/api/tasks";
pub const ENDPOINT_CLEANUP: &str = "/api/cleanup";

/// `/api/status/{id}`
pub fn status_endpoint(task_id: &str) -> String {
    format!("/api/status/{task_id}")
}

/// `/api/output/{id}`
pub fn output_endpoint(task_id: &str) -> String {
    format!("/api/output/{task_id}")
}

/// `/api/stop/{id}`
pub fn stop_endpoint(task_id: &str) -> String {
    format!("/api/stop/{task_id}")
}
