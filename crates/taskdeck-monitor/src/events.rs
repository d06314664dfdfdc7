//! State-change notifications published by the monitor.
//!
//! The monitor never renders anything itself; presentation code subscribes
//! to these and reads snapshots.

use taskdeck_state::HealthPhase;

/// Named periodic loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopKind {
    Health,
    Registry,
}

impl LoopKind {
    pub fn name(self) -> &'static str {
        match self {
            LoopKind::Health => "health",
            LoopKind::Registry => "registry",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A user-facing message. Routine timer ticks never produce one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    HealthChanged {
        phase: HealthPhase,
        latency_ms: Option<u64>,
        message: Option<String>,
    },
    RegistryUpdated {
        running: usize,
        total: usize,
    },
    /// Registry cleared because the server is unreachable.
    RegistryOffline,
    SelectionChanged {
        task_id: Option<String>,
    },
    DetailUpdated {
        task_id: String,
    },
    OutputUpdated {
        task_id: String,
        filtered: usize,
        displayed: usize,
    },
    Notice(Notice),
    LoopStarted(LoopKind),
    LoopStopped(LoopKind),
}
