//! Error types for the cfddns system
//!
//! Every fallible operation in this crate returns [`Result`]. The variants
//! mirror the failure classes of a reconciliation pass: connection-level
//! transport failures (retried by the client), application failures reported
//! by the provider (never retried), lookups that come up empty, local cache
//! corruption (always fatal), and validation of user input.

use thiserror::Error;

/// Result type alias for cfddns operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the cfddns system
#[derive(Error, Debug)]
pub enum Error {
    /// Connection-level failure (timeout, refused connection, broken read)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-2xx status or a response without a success flag
    #[error("API error{}: {message}", status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Application {
        /// HTTP status, when the failure carried one
        status: Option<u16>,
        /// Provider message or raw body excerpt
        message: String,
    },

    /// No known zone matches a domain
    #[error("Zone not found: {0}")]
    ZoneNotFound(String),

    /// An expected record is missing
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    /// Local cache disagrees with the requested mutation
    #[error("Inconsistent local cache: {0}")]
    CacheInconsistency(String),

    /// Invalid user input
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create an application error
    pub fn application(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Application {
            status,
            message: message.into(),
        }
    }

    /// Create a "zone not found" error
    pub fn zone_not_found(msg: impl Into<String>) -> Self {
        Self::ZoneNotFound(msg.into())
    }

    /// Create a "record not found" error
    pub fn record_not_found(msg: impl Into<String>) -> Self {
        Self::RecordNotFound(msg.into())
    }

    /// Create a cache inconsistency error
    pub fn inconsistent(msg: impl Into<String>) -> Self {
        Self::CacheInconsistency(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the client may retry the call that produced this error
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Whether the current pass must stop immediately
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::CacheInconsistency(_))
    }
}
