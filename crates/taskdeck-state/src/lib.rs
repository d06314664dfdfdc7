//! taskdeck state - the synchronous core of the monitor
//!
//! Each component here owns one piece of view-state and performs no I/O:
//! the health phase machine, the task registry mirror, the selected task,
//! and the per-task output buffers. The monitor crate drives them from the
//! results of gateway calls.

pub mod error;
pub mod health;
pub mod output;
pub mod registry;
pub mod selection;

pub use error::StateError;
pub use health::{is_reachable_status, HealthPhase, HealthState, ProbeOutcome};
pub use output::{parse_timestamp, DisplayLine, OutputFilter, OutputStore, OutputView};
pub use registry::{RegistryView, ReplaceReport, TaskRegistry};
pub use selection::SelectionTracker;
