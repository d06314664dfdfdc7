use thiserror::Error;

use taskdeck_protocol::TaskId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("task not found or expired: {0}")]
    NotFound(TaskId),
    #[error("unknown output filter: {0}")]
    UnknownFilter(String),
}
