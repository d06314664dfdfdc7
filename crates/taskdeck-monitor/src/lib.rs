//! taskdeck monitor - watches a remote course-automation task worker
//!
//! Ties the gateway and the view-state together: periodic health probes,
//! the registry auto-refresh loop, the selected task's status and output,
//! and the launch/stop/cleanup commands. Presentation (the `taskdeck` CLI
//! and its terminal console) sits on top of [`Monitor`] snapshots and
//! [`MonitorEvent`]s.

pub mod config;
pub mod console;
pub mod error;
pub mod events;
pub mod monitor;
pub mod scheduler;

pub use config::{ConfigError, MonitorConfig, ServerTarget, CONFIG_ENV};
pub use error::MonitorError;
pub use events::{LoopKind, MonitorEvent, Notice, NoticeLevel};
pub use monitor::{Monitor, MonitorSnapshot, RegistryRefresh, ViewTab};
pub use scheduler::PollScheduler;
