//! taskdeck protocol - wire types and shared definitions
//!
//! Describes the JSON contract of the remote task worker (task launch,
//! task list, per-task status and output, stop, cleanup) together with
//! the error taxonomy and launch-parameter validation shared by every
//! other taskdeck crate.

pub mod constants;
pub mod display;
pub mod error;
pub mod types;
pub mod validation;

pub use constants::*;
pub use error::*;
pub use types::*;
pub use validation::{validate_course_list, validate_launch, validate_phone_number};
