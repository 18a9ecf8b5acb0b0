//! Error types for vibe-quota

use thiserror::Error;

/// Quota error type
#[derive(Debug, Error)]
pub enum Error {
    /// Usage store failure (connection, command, corrupt counter)
    #[error("store error: {0}")]
    Store(String),

    /// Failed to encode or decode a stored value
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid settings or store wiring
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Provider name outside the supported set
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
