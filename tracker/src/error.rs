//! Error types for the Simple Analytics tracker.
//!
//! Each component has its own error enum; [`TrackerError`] collects the ones
//! that can abort a tracking call. Metadata encoding failures never appear
//! here since metadata is dropped rather than failing the send.

use thiserror::Error;

use crate::config::ConfigError;
use crate::sender::TransportError;
use crate::storage::StorageError;
use crate::user_agent::UserAgentError;

/// Errors that can occur while tracking an event.
///
/// Only the error-surfacing entry points (`track_raw` and friends) return
/// these. The fire-and-forget `track` logs them and carries on.
#[derive(Error, Debug)]
pub enum TrackerError {
    /// The collection endpoint URL is malformed.
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// The HTTP client could not be created.
    #[error("failed to initialize HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The user agent could not be resolved.
    #[error("user agent resolution failed: {0}")]
    UserAgentResolutionFailed(#[from] UserAgentError),

    /// The event was not delivered.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Persisted settings could not be read or written.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// A specialized `Result` type for tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;
