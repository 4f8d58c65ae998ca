//! Core error types for attendbot-core.
//!
//! Command failures ([`CommandError`]) are ordinary domain outcomes that
//! the transport turns into reply text; storage failures are absorbed at
//! the persistence boundary and logged rather than surfaced to users.

use std::path::PathBuf;
use thiserror::Error;

use crate::session::BreakCategory;

/// Core error type for attendbot-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Storage-related errors
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A command that could not be applied to the sender's session.
///
/// Every variant is recoverable by the user retrying later, except
/// [`CommandError::CorruptState`] which is self-healing: the manager has
/// already cleared the inconsistent fields by the time it is reported.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The command requires an open, clocked-in session.
    #[error("not clocked in")]
    NotClockedIn,

    /// A break is already running; it must be ended first.
    #[error("already on a {0} break")]
    AlreadyOnBreak(BreakCategory),

    /// No break is running.
    #[error("not on a break")]
    NotOnBreak,

    /// The daily rest quota has been used up.
    #[error("daily rest quota exhausted")]
    QuotaExhausted,

    /// All slots for the category are taken right now.
    #[error("{category} break is full ({used}/{max})")]
    CapacityFull {
        category: BreakCategory,
        used: usize,
        max: usize,
    },

    /// A break was marked active without a start time. The fields have
    /// been force-cleared; the user should retry.
    #[error("inconsistent break state was cleared, please retry")]
    CorruptState,

    /// The command requires any session at all.
    #[error("no session for this user")]
    NoSession,
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to read the state snapshot
    #[error("failed to read snapshot from {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write the state snapshot
    #[error("failed to write snapshot to {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot file exists but does not parse
    #[error("snapshot at {path} is not valid JSON: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Backend unavailable (also used by test fakes)
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Failed to parse configuration
    #[error("failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Data directory could not be determined or created
    #[error("cannot prepare data directory: {0}")]
    DataDir(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
