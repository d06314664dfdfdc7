//! The task monitor.
//!
//! [`Monitor`] is the composition root: it owns the view-state behind one
//! `Arc<RwLock<_>>`, drives it from [`Gateway`] results, runs the health and
//! registry loops on a [`PollScheduler`], and publishes [`MonitorEvent`]s.
//!
//! Locking rule: the state lock is never held across an `.await`. Every
//! write that follows a gateway call re-checks what it depends on (online
//! phase, selected server, selected task) because it may have changed while
//! the call was in flight.

use std::sync::Arc;

use chrono::{DateTime, Local};
use tokio::sync::{broadcast, RwLock};

use taskdeck_gateway::{Gateway, HttpGateway};
use taskdeck_protocol::display::shorten_id;
use taskdeck_protocol::{
    validate_launch, CleanupResponse, GatewayError, TaskDetail, TaskId, TaskSummary,
};
use taskdeck_state::{
    HealthPhase, HealthState, OutputFilter, OutputStore, OutputView, ProbeOutcome, RegistryView,
    ReplaceReport, SelectionTracker, TaskRegistry,
};

use crate::config::{MonitorConfig, ServerTarget};
use crate::error::MonitorError;
use crate::events::{LoopKind, MonitorEvent, Notice, NoticeLevel};
use crate::scheduler::PollScheduler;

const EVENT_CAPACITY: usize = 256;

/// Which detail pane is in front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewTab {
    #[default]
    Status,
    Output,
}

impl ViewTab {
    pub fn toggle(self) -> Self {
        match self {
            ViewTab::Status => ViewTab::Output,
            ViewTab::Output => ViewTab::Status,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ViewTab::Status => "status",
            ViewTab::Output => "output",
        }
    }
}

/// Result of a registry refresh that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryRefresh {
    /// Not attempted: the server is not online.
    Skipped,
    Refreshed(ReplaceReport),
}

/// Point-in-time copy of everything a presentation layer needs.
#[derive(Debug, Clone)]
pub struct MonitorSnapshot {
    pub server: ServerTarget,
    pub health: HealthState,
    pub registry_view: RegistryView,
    pub last_updated: Option<DateTime<Local>>,
    /// Newest first.
    pub tasks: Vec<TaskSummary>,
    pub running: usize,
    pub total: usize,
    pub selected: Option<TaskId>,
    /// Selected task is absent from the latest snapshot.
    pub selection_stale: bool,
    pub detail: Option<TaskDetail>,
    pub output: Option<OutputView>,
    pub filter: OutputFilter,
    pub view: ViewTab,
    pub auto_refresh: bool,
    pub auto_refresh_active: bool,
}

struct MonitorState {
    server: ServerTarget,
    health: HealthState,
    registry: TaskRegistry,
    selection: SelectionTracker,
    output: OutputStore,
    /// Last status fetched for the selected task.
    detail: Option<(TaskId, TaskDetail)>,
    filter: OutputFilter,
    view: ViewTab,
    auto_refresh: bool,
    visible: bool,
}

impl MonitorState {
    fn online_base(&self) -> Option<String> {
        self.health
            .is_online()
            .then(|| self.server.base_url.clone())
    }

    fn forget_detail_unless(&mut self, task_id: &str) {
        if self.detail.as_ref().is_some_and(|(id, _)| id != task_id) {
            self.detail = None;
        }
    }
}

#[derive(Clone)]
pub struct Monitor {
    config: Arc<MonitorConfig>,
    gateway: Arc<dyn Gateway>,
    state: Arc<RwLock<MonitorState>>,
    scheduler: Arc<PollScheduler>,
    events: broadcast::Sender<MonitorEvent>,
}

impl Monitor {
    pub fn new(config: MonitorConfig, gateway: Arc<dyn Gateway>) -> Result<Self, MonitorError> {
        let server = config
            .selected_target()
            .ok_or_else(|| MonitorError::UnknownServer(config.server.clone()))?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let state = MonitorState {
            server,
            health: HealthState::new(),
            registry: TaskRegistry::new(),
            selection: SelectionTracker::new(),
            output: OutputStore::new(),
            detail: None,
            filter: OutputFilter::default(),
            view: ViewTab::default(),
            auto_refresh: config.auto_refresh,
            visible: true,
        };

        Ok(Self {
            config: Arc::new(config),
            gateway,
            state: Arc::new(RwLock::new(state)),
            scheduler: Arc::new(PollScheduler::new()),
            events,
        })
    }

    /// Monitor backed by a real HTTP gateway using the configured timeouts.
    pub fn with_http(config: MonitorConfig) -> Result<Self, MonitorError> {
        let gateway = HttpGateway::new(config.request_timeout(), config.probe_timeout())?;
        Self::new(config, Arc::new(gateway))
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: MonitorEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn notify(&self, level: NoticeLevel, message: impl Into<String>) {
        self.emit(MonitorEvent::Notice(Notice { level, message: message.into() }));
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Probe once, then keep probing on the health interval. The registry
    /// loop follows from the first successful probe if auto-refresh is on.
    pub async fn initialize(&self) -> HealthPhase {
        {
            let state = self.state.read().await;
            tracing::info!(
                server = %state.server.name,
                base_url = %state.server.base_url,
                auto_refresh = state.auto_refresh,
                "Starting task monitor"
            );
        }
        let phase = match self.probe_health(false).await {
            Some(phase) => phase,
            None => self.state.read().await.health.phase(),
        };
        self.start_health_loop();
        phase
    }

    pub async fn shutdown(&self) {
        for kind in self.scheduler.stop_all() {
            self.emit(MonitorEvent::LoopStopped(kind));
        }
        tracing::info!("Task monitor stopped");
    }

    fn start_health_loop(&self) {
        let monitor = self.clone();
        let started = self.scheduler.start(
            LoopKind::Health,
            self.config.health_check_interval(),
            move || {
                let monitor = monitor.clone();
                async move {
                    monitor.probe_health(false).await;
                }
            },
        );
        if started {
            self.emit(MonitorEvent::LoopStarted(LoopKind::Health));
        }
    }

    /// Start the registry loop when auto-refresh is on, the view is visible
    /// and the server is online. Returns whether those conditions hold.
    async fn ensure_registry_loop(&self) -> bool {
        let eligible = {
            let state = self.state.read().await;
            state.auto_refresh && state.visible && state.health.is_online()
        };
        if eligible {
            self.spawn_registry_loop();
        }
        eligible
    }

    fn spawn_registry_loop(&self) {
        let monitor = self.clone();
        let started = self.scheduler.start(
            LoopKind::Registry,
            self.config.auto_refresh_interval(),
            move || {
                let monitor = monitor.clone();
                async move {
                    if let Err(e) = monitor.refresh_registry().await {
                        tracing::debug!(error = %e, "Scheduled task refresh failed");
                    }
                }
            },
        );
        if started {
            self.emit(MonitorEvent::LoopStarted(LoopKind::Registry));
        }
    }

    fn stop_registry_loop(&self) {
        if self.scheduler.stop(LoopKind::Registry) {
            self.emit(MonitorEvent::LoopStopped(LoopKind::Registry));
        }
    }

    pub fn loop_running(&self, kind: LoopKind) -> bool {
        self.scheduler.is_running(kind)
    }

    // -----------------------------------------------------------------------
    // Health
    // -----------------------------------------------------------------------

    /// Probe the selected server. Returns `None` without any network call
    /// if a probe is already in flight.
    ///
    /// `announce` turns the outcome into a user-facing notice; routine
    /// loop ticks pass `false`.
    pub async fn probe_health(&self, announce: bool) -> Option<HealthPhase> {
        loop {
            let (previous, base) = {
                let mut state = self.state.write().await;
                let previous = state.health.settled();
                if !state.health.begin_probe() {
                    tracing::debug!("Health probe already in flight, skipping");
                    return None;
                }
                (previous, state.server.base_url.clone())
            };
            self.emit(MonitorEvent::HealthChanged {
                phase: HealthPhase::Checking,
                latency_ms: None,
                message: None,
            });

            let outcome = match self.gateway.probe(&base).await {
                Ok(reply) => ProbeOutcome::Answered {
                    status: reply.status,
                    latency_ms: reply.latency_ms,
                },
                Err(e) => ProbeOutcome::Unreachable { message: e.to_string() },
            };

            let (phase, message, event) = {
                let mut state = self.state.write().await;
                if state.server.base_url != base {
                    // Server switched mid-probe; probe the new one instead.
                    state.health.cancel_probe();
                    continue;
                }
                let phase = state.health.finish_probe(outcome);
                if phase == HealthPhase::Offline {
                    state.registry.set_offline();
                }
                let message = state.health.last_message().unwrap_or_default().to_string();
                (phase, message, health_event(&state.health))
            };
            self.emit(event);

            if phase != previous {
                tracing::info!(
                    server = %base,
                    from = previous.label(),
                    to = phase.label(),
                    detail = %message,
                    "Server health changed"
                );
            }

            if phase == HealthPhase::Online {
                if announce {
                    self.notify(NoticeLevel::Success, message);
                }
                if let Err(e) = self.refresh_registry().await {
                    tracing::debug!(error = %e, "Task refresh after probe failed");
                }
                self.ensure_registry_loop().await;
            } else {
                self.emit(MonitorEvent::RegistryOffline);
                self.stop_registry_loop();
                if announce {
                    self.notify(NoticeLevel::Error, format!("server connection failed: {message}"));
                }
            }
            return Some(phase);
        }
    }

    /// Record that a data call could not reach the server.
    async fn demote(&self, err: &GatewayError) {
        let event = {
            let mut state = self.state.write().await;
            state.health.mark_offline(err.to_string());
            state.registry.set_offline();
            health_event(&state.health)
        };
        tracing::warn!(error = %err, "Server unreachable, marking offline");
        self.emit(event);
        self.emit(MonitorEvent::RegistryOffline);
        self.stop_registry_loop();
    }

    /// Connectivity failures demote health; anything else is the caller's
    /// problem only.
    async fn data_call_failed(&self, err: GatewayError) -> MonitorError {
        if err.is_connectivity() {
            self.demote(&err).await;
        } else {
            tracing::warn!(error = %err, "Request rejected by server");
        }
        err.into()
    }

    // -----------------------------------------------------------------------
    // Registry
    // -----------------------------------------------------------------------

    /// Replace the registry with a fresh snapshot, then refresh the
    /// selected task if it is still listed. No call is made unless online.
    pub async fn refresh_registry(&self) -> Result<RegistryRefresh, MonitorError> {
        let Some(base) = self.state.read().await.online_base() else {
            tracing::debug!("Server not online, skipping task refresh");
            return Ok(RegistryRefresh::Skipped);
        };

        let snapshot = match self.gateway.list_tasks(&base).await {
            Ok(snapshot) => snapshot,
            Err(e) => return Err(self.data_call_failed(e).await),
        };

        let (report, selected) = {
            let mut state = self.state.write().await;
            if state.online_base().as_deref() != Some(base.as_str()) {
                return Ok(RegistryRefresh::Skipped);
            }
            let state = &mut *state;
            let report = state.registry.replace(snapshot, Local::now());
            let selected = state.selection.live(&state.registry).map(str::to_string);
            (report, selected)
        };
        tracing::debug!(running = report.running, total = report.total, "Task registry refreshed");
        self.emit(MonitorEvent::RegistryUpdated {
            running: report.running,
            total: report.total,
        });

        if let Some(task_id) = selected {
            self.refresh_selected(&task_id).await;
        }
        Ok(RegistryRefresh::Refreshed(report))
    }

    /// User-initiated refresh. Rejected without a network call when the
    /// server is not online.
    pub async fn manual_refresh(&self) -> Result<RegistryRefresh, MonitorError> {
        if !self.is_online().await {
            self.notify(NoticeLevel::Warning, "server offline, cannot refresh tasks");
            return Err(MonitorError::Offline);
        }
        let result = self.refresh_registry().await;
        match &result {
            Ok(RegistryRefresh::Refreshed(_)) => self.notify(NoticeLevel::Info, "task list refreshed"),
            Ok(RegistryRefresh::Skipped) => {}
            Err(e) => self.notify(NoticeLevel::Error, format!("failed to refresh tasks: {e}")),
        }
        result
    }

    async fn refresh_selected(&self, task_id: &str) {
        match self.refresh_task_status(task_id).await {
            Ok(detail) if detail.wants_output() => {
                if let Err(e) = self.refresh_output(task_id).await {
                    tracing::debug!(task_id, error = %e, "Output refresh failed");
                }
            }
            Ok(_) => {}
            Err(e) => tracing::debug!(task_id, error = %e, "Status refresh failed"),
        }
    }

    // -----------------------------------------------------------------------
    // Selection, status and output
    // -----------------------------------------------------------------------

    /// Select a listed task and fetch its status and output. An unknown id
    /// fails with not-found and leaves the prior selection in place.
    pub async fn select_task(&self, task_id: &str) -> Result<(), MonitorError> {
        let selected = {
            let mut state = self.state.write().await;
            let state = &mut *state;
            let result = state.selection.select(&state.registry, task_id);
            if result.is_ok() {
                state.forget_detail_unless(task_id);
            }
            result
        };
        if let Err(e) = selected {
            self.notify(NoticeLevel::Warning, "task not found or expired");
            return Err(e.into());
        }
        self.selection_changed(task_id).await;
        Ok(())
    }

    async fn selection_changed(&self, task_id: &str) {
        tracing::info!(task_id, "Task selected");
        self.emit(MonitorEvent::SelectionChanged { task_id: Some(task_id.to_string()) });
        self.notify(NoticeLevel::Info, format!("selected task {}", shorten_id(task_id)));
        if let Err(e) = self.refresh_task_status(task_id).await {
            tracing::debug!(task_id, error = %e, "Status refresh failed");
        }
        if let Err(e) = self.refresh_output(task_id).await {
            tracing::debug!(task_id, error = %e, "Output refresh failed");
        }
    }

    /// Fetch `GET /api/status/{id}`. Stored only if the task is still the
    /// selected one when the answer arrives.
    pub async fn refresh_task_status(&self, task_id: &str) -> Result<TaskDetail, MonitorError> {
        let base = self.state.read().await.online_base().ok_or(MonitorError::Offline)?;
        let detail = match self.gateway.task_status(&base, task_id).await {
            Ok(detail) => detail,
            Err(e) => return Err(self.data_call_failed(e).await),
        };

        let stored = {
            let mut state = self.state.write().await;
            let current = state.selection.selected() == Some(task_id);
            if current {
                state.detail = Some((task_id.to_string(), detail.clone()));
            }
            current
        };
        if stored {
            self.emit(MonitorEvent::DetailUpdated { task_id: task_id.to_string() });
        }
        Ok(detail)
    }

    /// Replace the task's output buffer with `GET /api/output/{id}` and
    /// return the filtered, capped view of it.
    pub async fn refresh_output(&self, task_id: &str) -> Result<OutputView, MonitorError> {
        let base = self.state.read().await.online_base().ok_or(MonitorError::Offline)?;
        let response = match self.gateway.task_output(&base, task_id).await {
            Ok(response) => response,
            Err(e) => return Err(self.data_call_failed(e).await),
        };

        let view = {
            let mut state = self.state.write().await;
            state.output.replace(task_id, response.output);
            state.output.render(task_id, state.filter, self.config.max_output_lines)
        };
        self.emit(MonitorEvent::OutputUpdated {
            task_id: task_id.to_string(),
            filtered: view.filtered_count,
            displayed: view.displayed_count,
        });
        Ok(view)
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Validate, submit `POST /api/run`, then select the new task.
    ///
    /// Invalid input fails before any network call. A successful launch is
    /// proof of reachability and marks the server online.
    pub async fn launch(
        &self,
        username: &str,
        password: &str,
        list_id: &str,
    ) -> Result<TaskId, MonitorError> {
        let request = match validate_launch(username, password, list_id) {
            Ok(request) => request,
            Err(e) => {
                self.notify(NoticeLevel::Warning, e.to_string());
                return Err(e.into());
            }
        };

        let base = self.state.read().await.server.base_url.clone();
        let response = match self.gateway.launch(&base, &request).await {
            Ok(response) => response,
            Err(e) => {
                let err = self.data_call_failed(e).await;
                self.notify(NoticeLevel::Error, format!("failed to start task: {err}"));
                return Err(err);
            }
        };
        let task_id = response.task_id;

        let event = {
            let mut state = self.state.write().await;
            state.health.mark_online("task launched");
            health_event(&state.health)
        };
        self.emit(event);
        tracing::info!(task_id = %task_id, "Task launched");
        self.notify(NoticeLevel::Success, format!("task started, id: {}", shorten_id(&task_id)));

        if let Err(e) = self.refresh_registry().await {
            tracing::debug!(error = %e, "Task refresh after launch failed");
        }
        self.ensure_registry_loop().await;

        {
            let mut state = self.state.write().await;
            let state = &mut *state;
            state.view = ViewTab::Output;
            if state.selection.select(&state.registry, &task_id).is_err() {
                tracing::debug!(task_id = %task_id, "Launched task not listed yet, selecting anyway");
                state.selection.assign(task_id.clone());
            }
            state.forget_detail_unless(&task_id);
        }
        self.selection_changed(&task_id).await;
        Ok(task_id)
    }

    /// `POST /api/stop/{id}`. A rejection (404, 400) goes to the caller only.
    pub async fn stop_task(&self, task_id: &str) -> Result<(), MonitorError> {
        let base = self.state.read().await.server.base_url.clone();
        match self.gateway.stop_task(&base, task_id).await {
            Ok(ack) => {
                tracing::info!(task_id, "Stop requested");
                self.notify(
                    NoticeLevel::Info,
                    ack.message.unwrap_or_else(|| "stop request sent".to_string()),
                );
            }
            Err(e) => {
                let err = self.data_call_failed(e).await;
                self.notify(NoticeLevel::Error, format!("failed to stop task: {err}"));
                return Err(err);
            }
        }

        if let Err(e) = self.refresh_registry().await {
            tracing::debug!(error = %e, "Task refresh after stop failed");
        }
        Ok(())
    }

    /// `POST /api/cleanup`. Rejected without a network call when offline.
    pub async fn cleanup(&self) -> Result<CleanupResponse, MonitorError> {
        let Some(base) = self.state.read().await.online_base() else {
            self.notify(NoticeLevel::Warning, "server offline, cannot clean up tasks");
            return Err(MonitorError::Offline);
        };
        let response = match self.gateway.cleanup(&base).await {
            Ok(response) => response,
            Err(e) => {
                let err = self.data_call_failed(e).await;
                self.notify(NoticeLevel::Error, format!("cleanup failed: {err}"));
                return Err(err);
            }
        };
        tracing::info!(
            remaining = response.remaining_tasks,
            detail = %response.message,
            "Old tasks cleaned up"
        );
        self.notify(NoticeLevel::Success, response.message.clone());

        if let Err(e) = self.refresh_registry().await {
            tracing::debug!(error = %e, "Task refresh after cleanup failed");
        }
        Ok(response)
    }

    /// Drop the locally held output of the selected task. The next output
    /// refresh fills it again from the server.
    pub async fn clear_output(&self) -> Result<(), MonitorError> {
        let task_id = {
            let mut state = self.state.write().await;
            let task_id = state
                .selection
                .selected()
                .map(str::to_string)
                .ok_or(MonitorError::NoSelection)?;
            state.output.clear(&task_id);
            task_id
        };
        self.emit(MonitorEvent::OutputUpdated { task_id, filtered: 0, displayed: 0 });
        self.notify(NoticeLevel::Info, "output cleared");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // View settings
    // -----------------------------------------------------------------------

    /// Change the stream filter and re-render the selected task's output.
    pub async fn set_filter(&self, filter: OutputFilter) {
        let rendered = {
            let mut state = self.state.write().await;
            state.filter = filter;
            state.selection.selected().map(|id| {
                (
                    id.to_string(),
                    state.output.render(id, filter, self.config.max_output_lines),
                )
            })
        };
        let Some((task_id, view)) = rendered else {
            return;
        };
        self.emit(MonitorEvent::OutputUpdated {
            task_id: task_id.clone(),
            filtered: view.filtered_count,
            displayed: view.displayed_count,
        });
        if let Err(e) = self.refresh_output(&task_id).await {
            tracing::debug!(task_id = %task_id, error = %e, "Output refresh failed");
        }
    }

    pub async fn set_view(&self, view: ViewTab) {
        let selected = {
            let mut state = self.state.write().await;
            state.view = view;
            state.selection.selected().map(str::to_string)
        };
        if let (ViewTab::Output, Some(task_id)) = (view, selected) {
            if let Err(e) = self.refresh_output(&task_id).await {
                tracing::debug!(task_id = %task_id, error = %e, "Output refresh failed");
            }
        }
    }

    pub async fn set_auto_refresh(&self, enabled: bool) {
        self.state.write().await.auto_refresh = enabled;
        if enabled {
            self.ensure_registry_loop().await;
            self.notify(NoticeLevel::Info, "auto refresh enabled");
        } else {
            self.stop_registry_loop();
            self.notify(NoticeLevel::Info, "auto refresh disabled");
        }
    }

    /// Hidden views pause the registry loop. Becoming visible again restarts
    /// it and refreshes at once, if auto-refresh applies.
    pub async fn visibility_changed(&self, visible: bool) {
        {
            let mut state = self.state.write().await;
            if state.visible == visible {
                return;
            }
            state.visible = visible;
        }
        tracing::debug!(visible, "Visibility changed");

        if !visible {
            self.stop_registry_loop();
        } else if self.ensure_registry_loop().await {
            if let Err(e) = self.refresh_registry().await {
                tracing::debug!(error = %e, "Task refresh on resume failed");
            }
        }
    }

    /// Point the monitor at another configured server and probe it.
    ///
    /// Registry, selection and output belong to the previous server and
    /// are dropped.
    pub async fn switch_server(&self, name: &str) -> Result<HealthPhase, MonitorError> {
        let target = self
            .config
            .target(name)
            .ok_or_else(|| MonitorError::UnknownServer(name.to_string()))?;

        {
            let mut state = self.state.write().await;
            if state.server == target {
                return Ok(state.health.phase());
            }
            state.server = target.clone();
            state.registry = TaskRegistry::new();
            state.selection = SelectionTracker::new();
            state.output = OutputStore::new();
            state.detail = None;
            state.health.forget_settled();
        }
        tracing::info!(server = %target.name, base_url = %target.base_url, "Switched server");
        self.emit(MonitorEvent::SelectionChanged { task_id: None });
        self.notify(NoticeLevel::Info, format!("switched to server {}", target.name));
        self.stop_registry_loop();

        match self.probe_health(true).await {
            Some(phase) => Ok(phase),
            None => Ok(self.state.read().await.health.phase()),
        }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub async fn is_online(&self) -> bool {
        self.state.read().await.health.is_online()
    }

    pub async fn health(&self) -> HealthState {
        self.state.read().await.health.clone()
    }

    pub async fn selected(&self) -> Option<TaskId> {
        self.state
            .read()
            .await
            .selection
            .selected()
            .map(str::to_string)
    }

    pub async fn tasks(&self) -> Vec<TaskSummary> {
        self.state
            .read()
            .await
            .registry
            .tasks_sorted()
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn snapshot(&self) -> MonitorSnapshot {
        let state = self.state.read().await;
        let selected = state.selection.selected().map(str::to_string);
        let output = selected
            .as_deref()
            .map(|id| state.output.render(id, state.filter, self.config.max_output_lines));
        let detail = match (&state.detail, &selected) {
            (Some((id, detail)), Some(current)) if id == current => Some(detail.clone()),
            _ => None,
        };

        MonitorSnapshot {
            server: state.server.clone(),
            health: state.health.clone(),
            registry_view: state.registry.view(),
            last_updated: state.registry.last_updated(),
            tasks: state.registry.tasks_sorted().into_iter().cloned().collect(),
            running: state.registry.running_count(),
            total: state.registry.total(),
            selection_stale: state.selection.is_stale(&state.registry),
            selected,
            detail,
            output,
            filter: state.filter,
            view: state.view,
            auto_refresh: state.auto_refresh,
            auto_refresh_active: self.scheduler.is_running(LoopKind::Registry),
        }
    }
}

fn health_event(health: &HealthState) -> MonitorEvent {
    MonitorEvent::HealthChanged {
        phase: health.phase(),
        latency_ms: health.last_latency_ms(),
        message: health.last_message().map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use taskdeck_gateway::MockGateway;

    use super::*;

    #[tokio::test]
    async fn fresh_monitor_is_unknown_and_empty() {
        let monitor = Monitor::new(MonitorConfig::default(), Arc::new(MockGateway::new())).unwrap();
        let snap = monitor.snapshot().await;
        assert_eq!(snap.health.phase(), HealthPhase::Unknown);
        assert_eq!(snap.registry_view, RegistryView::Empty);
        assert_eq!(snap.server.name, "local");
        assert!(snap.selected.is_none());
        assert!(snap.output.is_none());
    }

    #[test]
    fn unknown_server_in_config_is_rejected() {
        let config = MonitorConfig { server: "nowhere".into(), ..MonitorConfig::default() };
        let err = Monitor::new(config, Arc::new(MockGateway::new())).err().unwrap();
        assert!(matches!(err, MonitorError::UnknownServer(name) if name == "nowhere"));
    }

    #[test]
    fn view_tab_toggles() {
        assert_eq!(ViewTab::Status.toggle(), ViewTab::Output);
        assert_eq!(ViewTab::Output.toggle().label(), "status");
    }
}
