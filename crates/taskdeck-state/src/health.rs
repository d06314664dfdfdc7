//! Reachability state machine.
//!
//! ```text
//! Unknown --probe--> Checking --reply [200,500)--> Online
//!                             --reply >=500 / transport error--> Offline
//! Online | Offline --probe--> Checking
//! ```
//!
//! At most one probe is in flight; `begin_probe` refuses a second one.
//!
//! `phase` is what the UI shows. Data calls are gated on the settled phase,
//! the outcome of the last finished probe, so a routine re-probe of a live
//! server does not block them.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Belief about remote reachability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HealthPhase {
    Unknown,
    Checking,
    Online,
    Offline,
}

impl HealthPhase {
    pub fn label(self) -> &'static str {
        match self {
            HealthPhase::Unknown => "unknown",
            HealthPhase::Checking => "checking",
            HealthPhase::Online => "online",
            HealthPhase::Offline => "offline",
        }
    }
}

/// Result of one probe as seen by the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The server answered with some HTTP status.
    Answered { status: u16, latency_ms: u64 },
    /// No HTTP answer at all (timeout, refused, DNS).
    Unreachable { message: String },
}

/// Any status below 500 means the server is up, even if it disliked the request.
pub fn is_reachable_status(status: u16) -> bool {
    (200..500).contains(&status)
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthState {
    phase: HealthPhase,
    last_latency_ms: Option<u64>,
    last_message: Option<String>,
    last_checked: Option<DateTime<Utc>>,
    settled: HealthPhase,
    #[serde(skip)]
    probe_in_flight: bool,
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthState {
    pub fn new() -> Self {
        Self {
            phase: HealthPhase::Unknown,
            last_latency_ms: None,
            last_message: None,
            last_checked: None,
            settled: HealthPhase::Unknown,
            probe_in_flight: false,
        }
    }

    pub fn phase(&self) -> HealthPhase {
        self.phase
    }

    /// Last settled phase; never `Checking`.
    pub fn settled(&self) -> HealthPhase {
        self.settled
    }

    /// True while the last settled outcome is `Online`, including during a
    /// re-probe.
    pub fn is_online(&self) -> bool {
        self.settled == HealthPhase::Online
    }

    pub fn last_latency_ms(&self) -> Option<u64> {
        self.last_latency_ms
    }

    pub fn last_message(&self) -> Option<&str> {
        self.last_message.as_deref()
    }

    pub fn last_checked(&self) -> Option<DateTime<Utc>> {
        self.last_checked
    }

    pub fn probe_in_flight(&self) -> bool {
        self.probe_in_flight
    }

    /// Claim the probe slot. Returns `false` (and changes nothing) when a
    /// probe is already running.
    pub fn begin_probe(&mut self) -> bool {
        if self.probe_in_flight {
            return false;
        }
        self.probe_in_flight = true;
        self.phase = HealthPhase::Checking;
        true
    }

    /// Release the probe slot without recording an outcome, e.g. when the
    /// probed server is no longer the selected one. Phase stays `Checking`.
    pub fn cancel_probe(&mut self) {
        self.probe_in_flight = false;
    }

    /// Drop the settled outcome after the target changed. The probe slot
    /// is left alone.
    pub fn forget_settled(&mut self) {
        self.settled = HealthPhase::Unknown;
    }

    /// Release the probe slot and settle on `Online` or `Offline`.
    pub fn finish_probe(&mut self, outcome: ProbeOutcome) -> HealthPhase {
        self.probe_in_flight = false;
        self.last_checked = Some(Utc::now());
        match outcome {
            ProbeOutcome::Answered { status, latency_ms } if is_reachable_status(status) => {
                self.phase = HealthPhase::Online;
                self.last_latency_ms = Some(latency_ms);
                self.last_message = Some(format!("server online (HTTP {status})"));
            }
            ProbeOutcome::Answered { status, latency_ms } => {
                self.phase = HealthPhase::Offline;
                self.last_latency_ms = Some(latency_ms);
                self.last_message = Some(format!("server returned error status: HTTP {status}"));
            }
            ProbeOutcome::Unreachable { message } => {
                self.phase = HealthPhase::Offline;
                self.last_message = Some(message);
            }
        }
        self.settled = self.phase;
        self.phase
    }

    /// Demotion from outside the probe path, e.g. a data call that could not
    /// reach the server.
    pub fn mark_offline(&mut self, message: impl Into<String>) {
        self.phase = HealthPhase::Offline;
        self.settled = HealthPhase::Offline;
        self.last_message = Some(message.into());
    }

    /// Promotion from outside the probe path, e.g. a successful launch.
    pub fn mark_online(&mut self, message: impl Into<String>) {
        self.phase = HealthPhase::Online;
        self.settled = HealthPhase::Online;
        self.last_message = Some(message.into());
    }
}
