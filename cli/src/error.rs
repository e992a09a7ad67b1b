//! Error taxonomy for generation calls.

use thiserror::Error;

use crate::transport::TransportFailure;

/// Failure of a single `generate` or `fetch_status` call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// Request rejected locally, before any network call.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No bearer token configured.
    #[error("no API credential configured")]
    MissingCredential,

    /// The call exceeded the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The connection to the API could not be established.
    #[error("connection failed: {message}")]
    ConnectionFailed { message: String },

    /// Any other transport-level failure.
    #[error("transport error: {message}")]
    TransportError { message: String },

    /// The API answered with a non-success status.
    #[error("API responded with status {status_code}: {body_text}")]
    ApiError { status_code: u16, body_text: String },

    /// Success status, but the body was neither a track object nor a list of them.
    #[error("unexpected response shape: {raw}")]
    UnexpectedResponseShape { raw: String },
}

impl GenerationError {
    /// Failures that may succeed if the same call is issued again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::ConnectionFailed { .. })
    }

    pub(crate) fn unexpected(raw: impl Into<String>) -> Self {
        Self::UnexpectedResponseShape { raw: raw.into() }
    }
}

impl From<TransportFailure> for GenerationError {
    fn from(failure: TransportFailure) -> Self {
        match failure {
            TransportFailure::Timeout => Self::Timeout,
            TransportFailure::Connect(message) => Self::ConnectionFailed { message },
            TransportFailure::Other(message) => Self::TransportError { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_failures_map_onto_kinds() {
        assert_eq!(GenerationError::from(TransportFailure::Timeout), GenerationError::Timeout);
        assert_eq!(
            GenerationError::from(TransportFailure::Connect("refused".into())),
            GenerationError::ConnectionFailed { message: "refused".into() }
        );
        assert_eq!(
            GenerationError::from(TransportFailure::Other("tls".into())),
            GenerationError::TransportError { message: "tls".into() }
        );
    }

    #[test]
    fn only_timeouts_and_connection_failures_are_transient() {
        assert!(GenerationError::Timeout.is_transient());
        assert!(GenerationError::ConnectionFailed { message: String::new() }.is_transient());
        assert!(!GenerationError::MissingCredential.is_transient());
        assert!(!GenerationError::ApiError { status_code: 503, body_text: String::new() }
            .is_transient());
    }
}
