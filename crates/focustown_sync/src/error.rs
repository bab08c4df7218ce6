//! # Sync Error Types
//!
//! Failures at the sync boundary, in the journal, and while loading config.
//!
//! Command rejections are not errors here: they are
//! [`focustown_core::RejectReason`] values recorded on queue entries.

use thiserror::Error;

/// Errors raised by journal I/O and recovery.
#[derive(Error, Debug)]
pub enum JournalError {
    /// The underlying file operation failed.
    #[error("journal i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not a journal or its header is damaged.
    #[error("journal corrupt: {0}")]
    Corrupt(String),

    /// A payload could not be encoded or decoded.
    #[error("journal payload encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    /// The file was written by an incompatible format version.
    #[error("unsupported journal version: {0}")]
    UnsupportedVersion(u32),
}

/// Result type for journal operations.
pub type JournalResult<T> = Result<T, JournalError>;

/// Errors raised by a sync round trip.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The server adapter failed; the queue was left untouched.
    #[error("server adapter failed: {0}")]
    Adapter(String),

    /// Another sync is still in flight.
    #[error("a sync is already in flight")]
    AlreadySyncing,

    /// Persisting the store failed.
    #[error(transparent)]
    Journal(#[from] JournalError),
}

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors raised while loading [`crate::SyncConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}
