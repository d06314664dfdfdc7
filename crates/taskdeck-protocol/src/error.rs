use thiserror::Error;

use crate::constants::NETWORK_UNREACHABLE_MESSAGE;

/// Failure of a single call to the remote worker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The call did not complete within its deadline. The server may be slow.
    #[error("request timed out, check the network connection")]
    Timeout,
    /// DNS failure, refused connection or any other transport-level failure.
    #[error("{0}")]
    Network(String),
    /// The server answered with a non-2xx status.
    #[error("HTTP {code}: {message}")]
    Http { code: u16, message: String },
    /// The server answered 2xx but the body did not match the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl GatewayError {
    pub fn unreachable() -> Self {
        GatewayError::Network(NETWORK_UNREACHABLE_MESSAGE.to_string())
    }

    /// True for failures that say something about reachability rather than
    /// about the request itself.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, GatewayError::Timeout | GatewayError::Network(_))
    }
}

/// Malformed launch parameters, detected before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("username must be an 11-digit mobile number")]
    InvalidPhone,
    #[error("course list must be numeric ids separated by commas")]
    InvalidCourseList,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connectivity_classification() {
        assert!(GatewayError::Timeout.is_connectivity());
        assert!(GatewayError::unreachable().is_connectivity());
        assert!(!GatewayError::Http { code: 404, message: "gone".into() }.is_connectivity());
        assert!(!GatewayError::Decode("eof".into()).is_connectivity());
    }

    #[test]
    fn http_error_display_carries_code_and_message() {
        let err = GatewayError::Http { code: 400, message: "missing field: list_id".into() };
        assert_eq!(err.to_string(), "HTTP 400: missing field: list_id");
    }
}
