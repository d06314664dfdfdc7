//! taskdeck - monitor and drive a remote course-automation task worker.

use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use taskdeck_monitor::console::run_console;
use taskdeck_monitor::{Monitor, MonitorConfig, MonitorEvent, RegistryRefresh};
use taskdeck_protocol::display::{format_clock, format_duration, shorten_id};
use taskdeck_protocol::OutputKind;
use taskdeck_state::HealthPhase;

#[derive(Parser, Debug)]
#[command(name = "taskdeck", version, about = "Monitor a remote course-automation task worker")]
struct Cli {
    /// Config file (TOML). Falls back to $TASKDECK_CONFIG, then the user config dir.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Server target name, overriding the config file.
    #[arg(long, global = true)]
    server: Option<String>,

    /// Enable the registry auto-refresh loop regardless of the config file.
    #[arg(long, global = true)]
    auto_refresh: bool,

    /// Log filter when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the monitor headless and log what happens.
    Watch,
    /// Interactive terminal dashboard.
    Console,
    /// Print the task list once.
    Tasks {
        /// Emit JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Validate and launch a task.
    Launch {
        /// 11-digit mobile number.
        #[arg(long)]
        username: String,
        #[arg(long, env = "TASKDECK_PASSWORD", hide_env_values = true)]
        password: String,
        /// Comma-separated course ids, e.g. 101,102,103.
        #[arg(long)]
        list_id: String,
        /// Keep printing output until the task finishes.
        #[arg(long)]
        follow: bool,
    },
    /// Ask the worker to stop a running task.
    Stop { task_id: String },
    /// Remove finished tasks older than a day from the worker.
    Cleanup,
    /// Check reachability of the selected server.
    Probe,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = MonitorConfig::load(cli.config.as_deref()).context("loading config")?;
    if let Some(server) = &cli.server {
        config.server = server.clone();
    }
    if cli.auto_refresh {
        config.auto_refresh = true;
    }
    config.validate().context("validating config")?;

    init_logging(&cli.log_level, matches!(cli.command, Command::Console))?;

    let monitor = Monitor::with_http(config).context("building HTTP gateway")?;
    match cli.command {
        Command::Watch => watch(monitor).await,
        Command::Console => {
            monitor.initialize().await;
            let result = run_console(monitor.clone()).await;
            monitor.shutdown().await;
            result
        }
        Command::Tasks { json } => list_tasks(&monitor, json).await,
        Command::Launch { username, password, list_id, follow } => {
            launch(&monitor, &username, &password, &list_id, follow).await
        }
        Command::Stop { task_id } => {
            monitor.stop_task(&task_id).await?;
            println!("stop requested for {task_id}");
            Ok(())
        }
        Command::Cleanup => {
            require_online(&monitor).await?;
            let response = monitor.cleanup().await?;
            println!("{}", response.message);
            Ok(())
        }
        Command::Probe => {
            let phase = monitor.probe_health(false).await.unwrap_or(HealthPhase::Checking);
            let health = monitor.health().await;
            let latency = health
                .last_latency_ms()
                .map(|ms| format!(" in {ms}ms"))
                .unwrap_or_default();
            println!(
                "{}: {}{latency} ({})",
                monitor.config().server,
                phase.label(),
                health.last_message().unwrap_or("-")
            );
            if phase == HealthPhase::Online {
                Ok(())
            } else {
                Err(anyhow::anyhow!("server is not reachable"))
            }
        }
    }
}

/// Console mode logs to a file so the TUI stays intact; everything else
/// logs to stderr.
fn init_logging(level: &str, console: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    if !console {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
        return Ok(());
    }

    match dirs::data_local_dir().map(|d| d.join("taskdeck")) {
        Some(dir) => {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("creating log directory {}", dir.display()))?;
            let path = dir.join("taskdeck.log");
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::sink)
                .init();
        }
    }
    Ok(())
}

async fn require_online(monitor: &Monitor) -> anyhow::Result<()> {
    match monitor.probe_health(false).await {
        Some(HealthPhase::Online) => Ok(()),
        _ => {
            let health = monitor.health().await;
            Err(anyhow::anyhow!(
                "server {} is offline: {}",
                monitor.config().server,
                health.last_message().unwrap_or("no answer")
            ))
        }
    }
}

async fn watch(monitor: Monitor) -> anyhow::Result<()> {
    let mut events = monitor.subscribe();
    monitor.initialize().await;
    let mut status_tick = tokio::time::interval(monitor.config().poll_interval());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
            _ = status_tick.tick() => {
                let snap = monitor.snapshot().await;
                tracing::info!(
                    health = snap.health.phase().label(),
                    running = snap.running,
                    total = snap.total,
                    "Status"
                );
            }
            event = events.recv() => match event {
                Ok(MonitorEvent::Notice(notice)) => {
                    tracing::info!(level = ?notice.level, "{}", notice.message);
                }
                Ok(MonitorEvent::RegistryUpdated { running, total }) => {
                    tracing::debug!(running, total, "Registry updated");
                }
                Ok(other) => tracing::trace!(event = ?other, "Monitor event"),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Event log lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    monitor.shutdown().await;
    Ok(())
}

async fn list_tasks(monitor: &Monitor, json: bool) -> anyhow::Result<()> {
    require_online(monitor).await?;
    if let RegistryRefresh::Skipped = monitor.refresh_registry().await? {
        anyhow::bail!("server went offline before the task list arrived");
    }
    let tasks = monitor.tasks().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&tasks)?);
        return Ok(());
    }
    if tasks.is_empty() {
        println!("no tasks");
        return Ok(());
    }
    println!("{:<24} {:<10} {:<9} {:<9} {}", "TASK", "STATUS", "STARTED", "ENDED", "ERROR");
    for task in &tasks {
        println!(
            "{:<24} {:<10} {:<9} {:<9} {}",
            shorten_id(&task.task_id),
            task.status.label(),
            format_clock(task.start_time),
            format_clock(task.end_time),
            if task.has_error { "yes" } else { "" },
        );
    }
    Ok(())
}

async fn launch(
    monitor: &Monitor,
    username: &str,
    password: &str,
    list_id: &str,
    follow: bool,
) -> anyhow::Result<()> {
    // A failed probe is not fatal: the launch itself decides reachability.
    monitor.probe_health(false).await;
    let task_id = monitor.launch(username, password, list_id).await?;
    println!("task started: {task_id}");
    if !follow {
        return Ok(());
    }

    let mut tick = tokio::time::interval(monitor.config().poll_interval());
    let mut printed = 0usize;
    loop {
        tick.tick().await;
        let detail = monitor
            .refresh_task_status(&task_id)
            .await
            .context("fetching task status")?;
        let output = monitor.refresh_output(&task_id).await.context("fetching output")?;

        // Buffers are full snapshots; print only lines past the last count.
        if output.total_count < printed {
            printed = 0;
        }
        let first_shown = output.total_count - output.displayed_count;
        for line in output.lines.iter().skip(printed.saturating_sub(first_shown)) {
            match line.kind {
                OutputKind::Stdout => println!("{}", line.text),
                OutputKind::Stderr => eprintln!("{}", line.text),
            }
        }
        printed = output.total_count;

        if !detail.running {
            let now = chrono::Utc::now().timestamp_millis() as f64 / 1000.0;
            let code = detail.last_result.as_ref().map(|r| r.returncode);
            println!(
                "task finished after {} (exit code {})",
                format_duration(detail.duration_secs(now)),
                code.map(|c| c.to_string()).unwrap_or_else(|| "unknown".to_string())
            );
            if let Some(failure) = &detail.last_error {
                eprintln!("error: {}", failure.describe());
            }
            return Ok(());
        }
    }
}
