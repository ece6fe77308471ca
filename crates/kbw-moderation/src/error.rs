//! Transport errors raised while talking to a classifier.

use thiserror::Error;

/// Result type alias for classifier transport operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Classifier transport error.
///
/// None of these is a content judgment. Each one maps to a retryable
/// "service unavailable" condition.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// The classifier answered with a non-success status.
    #[error("classifier returned status {status}")]
    Status { status: u16 },
    /// The classifier answered without any content.
    #[error("classifier returned an empty response")]
    EmptyResponse,
    /// The client is misconfigured.
    #[error("invalid classifier configuration: {0}")]
    Config(String),
}

impl From<Error> for kbw_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Reqwest(e) if e.is_timeout() => {
                kbw_core::Error::unavailable("classifier", "request timed out").with_source(e)
            }
            Error::Reqwest(e) if e.is_connect() => {
                kbw_core::Error::unavailable("classifier", "connection failed").with_source(e)
            }
            Error::Config(message) => kbw_core::Error::internal(message),
            other => kbw_core::Error::unavailable("classifier", other.to_string()).with_source(other),
        }
    }
}
