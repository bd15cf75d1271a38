//! Error types for aliddns
//!
//! Failures are scoped: a resolution error fails one address family, a
//! provider error fails one record, and only validation errors are fatal.

use thiserror::Error;

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Error type covering every failure class of the sync pipeline
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Bad or missing configuration; fatal, raised before any sync attempt
    #[error("invalid configuration: {0}")]
    Validation(String),

    /// No public IP obtainable from any echo service
    #[error("public IP resolution failed: {0}")]
    Resolution(String),

    /// The DNS provider reported a server-side failure
    #[error("provider server error [{code}]: {message}")]
    ProviderServer {
        /// Provider error code (e.g. "InternalError")
        code: String,
        /// Human-readable provider message
        message: String,
    },

    /// The DNS provider rejected the request
    #[error("provider client error [{code}]: {message}")]
    ProviderClient {
        /// Provider error code (e.g. "InvalidAccessKeyId.NotFound")
        code: String,
        /// Human-readable provider message
        message: String,
    },

    /// A per-task deadline was exceeded
    #[error("timed out: {0}")]
    Timeout(String),

    /// HTTP transport failure (connect, TLS, body read)
    #[error("http error: {0}")]
    Http(String),

    /// An operation failed on every retry attempt
    #[error("{source} (after {attempts} attempts)")]
    Exhausted {
        /// Number of attempts made before giving up
        attempts: u32,
        /// The last failure observed
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a resolution error
    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }

    /// Create a provider server error
    pub fn provider_server(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderServer {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create a provider client error
    pub fn provider_client(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderClient {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// The innermost error, unwrapping any retry-exhaustion annotation
    pub fn root(&self) -> &Error {
        match self {
            Self::Exhausted { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}

//==============================================================================
// Tests
//==============================================================================
