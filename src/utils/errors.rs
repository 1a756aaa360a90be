// src/utils/errors.rs
//! Error types for the recorder
//!
//! Classification never fails; unsupported occurrences are dropped, not
//! reported. Errors here cover configuration, session start-up and the
//! payload codec.

use thiserror::Error;

/// Recorder result alias
pub type Result<T> = std::result::Result<T, RecorderError>;

/// Recorder errors
#[derive(Debug, Error)]
pub enum RecorderError {
    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Configuration loaded but holds unusable values
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Session could not be started; the recorder stays inert
    #[error("initialization failed: {0}")]
    InitializationFailed(String),

    /// Compression stage failed
    #[error("compression failed: {0}")]
    CompressionFailed(String),

    /// JSON encoding or decoding failed
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    /// Payload text could not be decoded back into groups
    #[error("decode failed: {0}")]
    DecodeFailed(String),

    /// Operation not valid in the controller's current state
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Background recorder task is gone
    #[error("recorder stopped")]
    RecorderStopped,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
