use thiserror::Error;

use taskdeck_protocol::{GatewayError, ValidationError};
use taskdeck_state::StateError;

/// Errors surfaced by [`crate::Monitor`] operations.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("server is offline")]
    Offline,

    #[error("no task selected")]
    NoSelection,

    #[error("unknown server target: {0}")]
    UnknownServer(String),
}

impl MonitorError {
    /// True for a selection of a task absent from the registry.
    pub fn is_not_found(&self) -> bool {
        matches!(self, MonitorError::State(StateError::NotFound(_)))
    }
}
