//! Error types for the TRMNL mirror client.

use thiserror::Error;

/// Errors that can occur while mirroring a TRMNL display.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed (network error, timeout, invalid URL, etc.)
    ///
    /// Transport failures are never retried by the rate-limit interceptor.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// I/O failure, including a backoff wait that was interrupted
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TRMNL server returned an error status code
    #[error("API returned error status {status}: {body}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// Still rate limited after every retry was spent
    #[error("Rate limited - retries exhausted")]
    RateLimited,

    /// Server answered, but the payload reports no usable image
    #[error("Display unavailable (status {status}): {message}")]
    Display {
        /// Status field from the payload
        status: u32,
        /// Error text from the payload, if any
        message: String,
    },

    /// Configuration missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Returns `true` if this error came from an interrupted backoff wait.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Error::Io(err) if err.kind() == std::io::ErrorKind::Interrupted)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Request(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
