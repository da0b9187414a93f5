//! Storage error types
//!
//! Error codes:
//! - REEL_STORE_WRITE_FAILED (ERROR) - a batch commit did not complete
//! - REEL_STORE_READ_FAILED (ERROR) - a table file could not be read
//! - REEL_DATA_CORRUPTION (FATAL) - checksum or framing mismatch
//! - REEL_STORE_STATE (ERROR) - store missing, locked, poisoned, unsealed,
//!   sealed, or misused

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Severity levels for storage errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, the process may report and exit cleanly
    Error,
    /// Stored data cannot be trusted
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Storage error with context
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("store already exists at {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("no store found at {}", .0.display())]
    NotFound(PathBuf),

    #[error(
        "store at {} is in use (remove {}/store.lock if no other run is active)",
        .0.display(),
        .0.display()
    )]
    Locked(PathBuf),

    #[error("table '{0}' has not been created")]
    UnknownTable(&'static str),

    #[error("table '{0}' already exists")]
    TableExists(&'static str),

    #[error("store holds a partially committed load; recreate it before writing again")]
    Poisoned,

    #[error("store has no completed load; run `reeldb load --recreate` before querying")]
    NotSealed,

    #[error("store is sealed after a completed load; recreate it to load again")]
    Sealed,

    #[error("batch of {rows} rows ({bytes} bytes) does not fit in one frame")]
    FrameTooLarge { rows: usize, bytes: usize },

    #[error("write failed: {message}")]
    WriteFailed {
        message: String,
        #[source]
        source: io::Error,
    },

    #[error("read failed: {message}")]
    ReadFailed {
        message: String,
        #[source]
        source: io::Error,
    },

    #[error("data corruption in {table} at byte {offset}: {reason}")]
    Corruption {
        table: &'static str,
        offset: u64,
        reason: String,
    },

    #[error("invalid manifest: {0}")]
    Manifest(String),
}

impl StorageError {
    /// Create a write failed error
    pub fn write_failed(message: impl Into<String>, source: io::Error) -> Self {
        StorageError::WriteFailed {
            message: message.into(),
            source,
        }
    }

    /// Create a read failed error
    pub fn read_failed(message: impl Into<String>, source: io::Error) -> Self {
        StorageError::ReadFailed {
            message: message.into(),
            source,
        }
    }

    /// Create a data corruption error with byte offset context
    pub fn corruption_at_offset(table: &'static str, offset: u64, reason: impl Into<String>) -> Self {
        StorageError::Corruption {
            table,
            offset,
            reason: reason.into(),
        }
    }

    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            StorageError::WriteFailed { .. } | StorageError::FrameTooLarge { .. } => {
                "REEL_STORE_WRITE_FAILED"
            }
            StorageError::ReadFailed { .. } => "REEL_STORE_READ_FAILED",
            StorageError::Corruption { .. } => "REEL_DATA_CORRUPTION",
            _ => "REEL_STORE_STATE",
        }
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        match self {
            StorageError::Corruption { .. } => Severity::Fatal,
            _ => Severity::Error,
        }
    }

    /// Returns whether this error means stored data cannot be trusted
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
