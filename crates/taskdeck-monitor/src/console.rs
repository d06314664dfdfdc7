//! Interactive terminal dashboard.
//!
//! Shows server health, the task list, and the selected task's status or
//! output, with single-key shortcuts for the monitor's commands. Network
//! work triggered by a key runs on a spawned task so the UI keeps drawing.
//!
//! Launch with `taskdeck console`.

use std::io::{self, Stdout};
use std::time::Duration;

use chrono::{DateTime, Local};
use crossterm::{
    event::{
        self, DisableFocusChange, EnableFocusChange, Event, KeyCode, KeyEventKind, KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame, Terminal,
};
use tokio::sync::broadcast::{self, error::TryRecvError};

use taskdeck_protocol::display::{format_clock, format_datetime, format_duration, shorten_id};
use taskdeck_protocol::{OutputKind, TaskSummary};
use taskdeck_state::{HealthPhase, RegistryView};

use crate::events::{MonitorEvent, NoticeLevel};
use crate::monitor::{Monitor, MonitorSnapshot, ViewTab};

const MAX_MESSAGES: usize = 200;

/// What a key press asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConsoleAction {
    None,
    Quit,
    Refresh,
    ClearOutput,
    Cleanup,
    Probe,
    ToggleAutoRefresh,
    CycleFilter,
    ToggleView,
    MoveUp,
    MoveDown,
    Stop,
}

struct TaskConsole {
    monitor: Monitor,
    events: broadcast::Receiver<MonitorEvent>,
    /// Highlighted row in the task table.
    cursor: usize,
    messages: Vec<(DateTime<Local>, String, Color)>,
}

impl TaskConsole {
    fn new(monitor: Monitor) -> Self {
        let events = monitor.subscribe();
        let mut console = Self {
            monitor,
            events,
            cursor: 0,
            messages: Vec::new(),
        };
        console.add_message("taskdeck console ready", Color::Cyan);
        console.add_message(
            "r refresh  c clear  l cleanup  h health  a auto  f filter  Tab view  s stop  q quit",
            Color::DarkGray,
        );
        console
    }

    fn add_message(&mut self, msg: &str, color: Color) {
        self.messages.push((Local::now(), msg.to_string(), color));
        if self.messages.len() > MAX_MESSAGES {
            self.messages.remove(0);
        }
    }

    /// Move pending notices into the message pane.
    fn drain_events(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(MonitorEvent::Notice(notice)) => {
                    self.add_message(&notice.message, notice_color(notice.level));
                }
                Ok(_) => {}
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Console fell behind on events");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }

    fn handle_key(&self, code: KeyCode, modifiers: KeyModifiers) -> ConsoleAction {
        match (code, modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => ConsoleAction::Quit,
            (KeyCode::Char('q'), _) | (KeyCode::Esc, _) => ConsoleAction::Quit,
            (KeyCode::Char('r'), _) => ConsoleAction::Refresh,
            (KeyCode::Char('c'), _) => ConsoleAction::ClearOutput,
            (KeyCode::Char('l'), _) => ConsoleAction::Cleanup,
            (KeyCode::Char('h'), _) => ConsoleAction::Probe,
            (KeyCode::Char('a'), _) => ConsoleAction::ToggleAutoRefresh,
            (KeyCode::Char('f'), _) => ConsoleAction::CycleFilter,
            (KeyCode::Tab, _) => ConsoleAction::ToggleView,
            (KeyCode::Up, _) | (KeyCode::Char('k'), _) => ConsoleAction::MoveUp,
            (KeyCode::Down, _) | (KeyCode::Char('j'), _) => ConsoleAction::MoveDown,
            (KeyCode::Char('s'), _) => ConsoleAction::Stop,
            _ => ConsoleAction::None,
        }
    }

    /// Carry out `action`. Returns `true` if the console should exit.
    fn apply(&mut self, action: ConsoleAction, snap: &MonitorSnapshot) -> bool {
        let monitor = self.monitor.clone();
        match action {
            ConsoleAction::None => {}
            ConsoleAction::Quit => return true,
            ConsoleAction::Refresh => {
                tokio::spawn(async move {
                    let _ = monitor.manual_refresh().await;
                });
            }
            ConsoleAction::ClearOutput => {
                tokio::spawn(async move {
                    let _ = monitor.clear_output().await;
                });
            }
            ConsoleAction::Cleanup => {
                tokio::spawn(async move {
                    let _ = monitor.cleanup().await;
                });
            }
            ConsoleAction::Probe => {
                tokio::spawn(async move {
                    monitor.probe_health(true).await;
                });
            }
            ConsoleAction::ToggleAutoRefresh => {
                let enabled = !snap.auto_refresh;
                tokio::spawn(async move { monitor.set_auto_refresh(enabled).await });
            }
            ConsoleAction::CycleFilter => {
                let filter = snap.filter.next();
                tokio::spawn(async move { monitor.set_filter(filter).await });
            }
            ConsoleAction::ToggleView => {
                let view = snap.view.toggle();
                tokio::spawn(async move { monitor.set_view(view).await });
            }
            ConsoleAction::MoveUp | ConsoleAction::MoveDown => {
                if snap.tasks.is_empty() {
                    return false;
                }
                self.cursor = move_cursor(self.cursor, snap.tasks.len(), action == ConsoleAction::MoveUp);
                let task_id = snap.tasks[self.cursor].task_id.clone();
                tokio::spawn(async move {
                    let _ = monitor.select_task(&task_id).await;
                });
            }
            ConsoleAction::Stop => match snap.selected.clone() {
                Some(task_id) => {
                    tokio::spawn(async move {
                        let _ = monitor.stop_task(&task_id).await;
                    });
                }
                None => self.add_message("no task selected", Color::Yellow),
            },
        }
        false
    }

    // -----------------------------------------------------------------------
    // Rendering
    // -----------------------------------------------------------------------

    fn render(&self, frame: &mut Frame, snap: &MonitorSnapshot) {
        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Status bar
                Constraint::Min(8),    // Tasks + detail
                Constraint::Length(7), // Messages
            ])
            .split(frame.area());

        self.render_status_bar(frame, outer[0], snap);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(outer[1]);
        self.render_tasks(frame, columns[0], snap);
        match snap.view {
            ViewTab::Status => self.render_status(frame, columns[1], snap),
            ViewTab::Output => self.render_output(frame, columns[1], snap),
        }

        self.render_messages(frame, outer[2]);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect, snap: &MonitorSnapshot) {
        let block = Block::default()
            .title(" taskdeck ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));

        let phase = snap.health.phase();
        let latency = snap
            .health
            .last_latency_ms()
            .map(|ms| format!("{ms}ms"))
            .unwrap_or_else(|| "-".to_string());
        let auto = match (snap.auto_refresh, snap.auto_refresh_active) {
            (true, true) => "on",
            (true, false) => "paused",
            (false, _) => "off",
        };
        let updated = snap
            .last_updated
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "--:--:--".to_string());

        let status_line = Line::from(vec![
            Span::styled("  Server: ", Style::default().fg(Color::Gray)),
            Span::styled(&snap.server.name, Style::default().fg(Color::White)),
            Span::styled(format!(" ({})", snap.server.base_url), Style::default().fg(Color::DarkGray)),
            Span::styled("  |  Health: ", Style::default().fg(Color::Gray)),
            Span::styled(phase.label(), Style::default().fg(phase_color(phase))),
            Span::styled(format!(" {latency}"), Style::default().fg(Color::DarkGray)),
            Span::styled("  |  Running: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{}/{}", snap.running, snap.total),
                Style::default().fg(Color::Green),
            ),
            Span::styled("  |  Auto: ", Style::default().fg(Color::Gray)),
            Span::styled(auto, Style::default().fg(Color::Magenta)),
            Span::styled("  |  Updated: ", Style::default().fg(Color::Gray)),
            Span::styled(updated, Style::default().fg(Color::White)),
        ]);

        frame.render_widget(Paragraph::new(status_line).block(block), area);
    }

    fn render_tasks(&self, frame: &mut Frame, area: Rect, snap: &MonitorSnapshot) {
        let block = Block::default()
            .title(format!(" Tasks ({}) ", snap.total))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White));

        if snap.tasks.is_empty() {
            let hint = match snap.registry_view {
                RegistryView::Offline => "  Server offline. Press h to probe again.",
                RegistryView::Empty => "  No tasks loaded yet. Press r to refresh.",
                RegistryView::Live => "  No tasks on the server.",
            };
            let text = Paragraph::new(Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray))))
                .block(block);
            frame.render_widget(text, area);
            return;
        }

        let rows: Vec<Row> = snap
            .tasks
            .iter()
            .enumerate()
            .map(|(idx, task)| {
                let is_selected = snap.selected.as_deref() == Some(task.task_id.as_str());
                let marker = if is_selected { "> " } else { "  " };
                let mut style = Style::default().fg(Color::White);
                if idx == self.cursor {
                    style = style.add_modifier(Modifier::REVERSED);
                }
                Row::new(vec![
                    Cell::from(Span::styled(format!("{marker}{}", shorten_id(&task.task_id)), style)),
                    Cell::from(Span::styled(
                        task.status.label(),
                        Style::default().fg(task_status_color(task)),
                    )),
                    Cell::from(Span::styled(
                        format_clock(task.start_time),
                        Style::default().fg(Color::Gray),
                    )),
                ])
            })
            .collect();

        let table = Table::new(
            rows,
            [
                Constraint::Percentage(50),
                Constraint::Percentage(25),
                Constraint::Percentage(25),
            ],
        )
        .block(block)
        .header(
            Row::new(vec!["  Task ID", "Status", "Started"])
                .style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD)),
        );

        frame.render_widget(table, area);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect, snap: &MonitorSnapshot) {
        let block = Block::default()
            .title(" Status [Tab: output] ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::LightBlue));

        let (Some(task_id), Some(detail)) = (&snap.selected, &snap.detail) else {
            let text = Paragraph::new(Line::from(Span::styled(
                "  Select a task with Up/Down.",
                Style::default().fg(Color::DarkGray),
            )))
            .block(block);
            frame.render_widget(text, area);
            return;
        };

        let now = Local::now().timestamp_millis() as f64 / 1000.0;
        let (state, color) = if detail.running {
            ("running", Color::Yellow)
        } else {
            ("completed", Color::Green)
        };
        let mut lines = vec![
            field_line("Task", task_id.clone(), Color::White),
            field_line("State", state.to_string(), color),
            field_line("Started", format_datetime(detail.start_time), Color::White),
            field_line("Ended", format_datetime(detail.end_time), Color::White),
            field_line("Duration", format_duration(detail.duration_secs(now)), Color::White),
        ];
        if snap.selection_stale {
            lines.push(field_line("Note", "no longer listed by the server".to_string(), Color::Yellow));
        }
        if let Some(result) = &detail.last_result {
            let color = if result.returncode == 0 { Color::Green } else { Color::Red };
            lines.push(field_line("Exit code", result.returncode.to_string(), color));
        }
        if let Some(failure) = &detail.last_error {
            lines.push(field_line("Error", failure.describe().to_string(), Color::Red));
        }

        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn render_output(&self, frame: &mut Frame, area: Rect, snap: &MonitorSnapshot) {
        let counts = snap
            .output
            .as_ref()
            .map(|v| format!("{}/{}", v.displayed_count, v.filtered_count))
            .unwrap_or_else(|| "0/0".to_string());
        let block = Block::default()
            .title(format!(" Output [{}] {} [Tab: status, f: filter] ", snap.filter, counts))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::LightBlue));

        let Some(view) = snap.output.as_ref().filter(|v| !v.is_empty()) else {
            let text = Paragraph::new(Line::from(Span::styled(
                "  No output.",
                Style::default().fg(Color::DarkGray),
            )))
            .block(block);
            frame.render_widget(text, area);
            return;
        };

        // Tail that fits the pane.
        let inner_height = area.height.saturating_sub(2) as usize;
        let start = view.lines.len().saturating_sub(inner_height);
        let lines: Vec<Line> = view.lines[start..]
            .iter()
            .map(|line| {
                let color = match line.kind {
                    OutputKind::Stdout => Color::White,
                    OutputKind::Stderr => Color::Red,
                };
                let time = line.time.as_deref().unwrap_or("        ");
                Line::from(vec![
                    Span::styled(format!("  {time} "), Style::default().fg(Color::DarkGray)),
                    Span::styled(line.text.as_str(), Style::default().fg(color)),
                ])
            })
            .collect();

        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn render_messages(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" Messages ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White));

        let inner_height = area.height.saturating_sub(2) as usize;
        let start = self.messages.len().saturating_sub(inner_height);
        let lines: Vec<Line> = self.messages[start..]
            .iter()
            .map(|(ts, msg, color)| {
                Line::from(vec![
                    Span::styled(
                        format!("  [{}] ", ts.format("%H:%M:%S")),
                        Style::default().fg(Color::DarkGray),
                    ),
                    Span::styled(msg.as_str(), Style::default().fg(*color)),
                ])
            })
            .collect();

        frame.render_widget(Paragraph::new(lines).block(block), area);
    }
}

fn field_line(label: &str, value: String, color: Color) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {label:<10}"), Style::default().fg(Color::Gray)),
        Span::styled(value, Style::default().fg(color)),
    ])
}

/// Wrapping cursor movement over `len` rows.
fn move_cursor(cursor: usize, len: usize, up: bool) -> usize {
    if len == 0 {
        return 0;
    }
    let cursor = cursor.min(len - 1);
    if up {
        cursor.checked_sub(1).unwrap_or(len - 1)
    } else {
        (cursor + 1) % len
    }
}

fn phase_color(phase: HealthPhase) -> Color {
    match phase {
        HealthPhase::Unknown => Color::DarkGray,
        HealthPhase::Checking => Color::Yellow,
        HealthPhase::Online => Color::Green,
        HealthPhase::Offline => Color::Red,
    }
}

fn task_status_color(task: &TaskSummary) -> Color {
    if task.is_running() {
        Color::Yellow
    } else if task.has_error {
        Color::Red
    } else {
        Color::Green
    }
}

fn notice_color(level: NoticeLevel) -> Color {
    match level {
        NoticeLevel::Info => Color::Cyan,
        NoticeLevel::Success => Color::Green,
        NoticeLevel::Warning => Color::Yellow,
        NoticeLevel::Error => Color::Red,
    }
}

fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableFocusChange)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableFocusChange, LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Run the console until the user quits. The monitor must already be
/// initialized; loops keep running after return until `shutdown`.
pub async fn run_console(monitor: Monitor) -> Result<(), anyhow::Error> {
    use std::io::IsTerminal;
    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        return Err(anyhow::anyhow!("Console requires a terminal (TTY)."));
    }

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), DisableFocusChange, LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let mut terminal = setup_terminal()?;
    let mut console = TaskConsole::new(monitor);
    let tick_rate = Duration::from_millis(100);

    let result = loop {
        console.drain_events();
        let snapshot = console.monitor.snapshot().await;
        if !snapshot.tasks.is_empty() {
            console.cursor = console.cursor.min(snapshot.tasks.len() - 1);
        }

        if let Err(e) = terminal.draw(|frame| console.render(frame, &snapshot)) {
            break Err(e.into());
        }

        match event::poll(tick_rate) {
            Ok(false) => {}
            Ok(true) => match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                    let action = console.handle_key(key.code, key.modifiers);
                    if console.apply(action, &snapshot) {
                        break Ok(());
                    }
                }
                Ok(Event::FocusLost) => console.monitor.visibility_changed(false).await,
                Ok(Event::FocusGained) => console.monitor.visibility_changed(true).await,
                Ok(_) => {}
                Err(e) => break Err(e.into()),
            },
            Err(e) => break Err(e.into()),
        }
    };

    restore_terminal(&mut terminal)?;
    result
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use taskdeck_gateway::MockGateway;

    use super::*;
    use crate::config::MonitorConfig;

    fn console() -> TaskConsole {
        let monitor = Monitor::new(MonitorConfig::default(), Arc::new(MockGateway::new())).unwrap();
        TaskConsole::new(monitor)
    }

    #[tokio::test]
    async fn shortcut_keys_map_to_actions() {
        let c = console();
        let none = KeyModifiers::NONE;
        assert_eq!(c.handle_key(KeyCode::Char('r'), none), ConsoleAction::Refresh);
        assert_eq!(c.handle_key(KeyCode::Char('c'), none), ConsoleAction::ClearOutput);
        assert_eq!(c.handle_key(KeyCode::Char('c'), KeyModifiers::CONTROL), ConsoleAction::Quit);
        assert_eq!(c.handle_key(KeyCode::Char('l'), none), ConsoleAction::Cleanup);
        assert_eq!(c.handle_key(KeyCode::Tab, none), ConsoleAction::ToggleView);
        assert_eq!(c.handle_key(KeyCode::Char('x'), none), ConsoleAction::None);
    }

    #[test]
    fn cursor_wraps_both_ways() {
        assert_eq!(move_cursor(0, 3, true), 2);
        assert_eq!(move_cursor(2, 3, false), 0);
        assert_eq!(move_cursor(1, 3, false), 2);
        assert_eq!(move_cursor(9, 3, true), 1);
        assert_eq!(move_cursor(0, 0, false), 0);
    }

    #[tokio::test]
    async fn notices_land_in_message_pane() {
        let mut c = console();
        let before = c.messages.len();
        c.monitor.set_auto_refresh(true).await;
        c.drain_events();
        assert_eq!(c.messages.len(), before + 1);
        assert_eq!(c.messages.last().unwrap().1, "auto refresh enabled");
    }
}
