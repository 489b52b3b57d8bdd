//! Error types for the notification relay.

use thiserror::Error;

/// The push payload could not be parsed as structured data.
#[derive(Debug, Error)]
#[error("malformed push payload: {0}")]
pub struct PayloadDecodeError(#[from] serde_json::Error);

/// A failure reported by the host platform.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct HostError(pub String);

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors that end the handling of a single worker event.
#[derive(Debug, Error)]
pub enum RelayError {
    /// A call into the host platform failed.
    #[error("{operation} failed: {source}")]
    Host {
        operation: &'static str,
        #[source]
        source: HostError,
    },
}

impl RelayError {
    pub(crate) fn host(operation: &'static str) -> impl FnOnce(HostError) -> Self {
        move |source| RelayError::Host { operation, source }
    }
}
