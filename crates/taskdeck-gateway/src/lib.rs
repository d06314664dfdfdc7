//! Remote gateway for the taskdeck monitor.
//!
//! Every interaction with the task worker goes through the [`Gateway`]
//! trait. [`HttpGateway`] talks to a real worker over HTTP and owns the
//! timeout and error-normalization policy; [`MockGateway`] is an in-memory
//! stand-in that records calls, used by tests and dry runs.

pub mod gateway;
pub mod http;
pub mod mock;

pub use gateway::{Gateway, GatewayFuture, ProbeReply};
pub use http::HttpGateway;
pub use mock::{Endpoint, MockCall, MockGateway, ProbeGate, RecordedCall};
