//! # Store Error Types
//!
//! Error types for queue file operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  std::io::Error                                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreError (this module) ← Adds the operation and file path           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  RelayError::StorageFailure (tagrelay-sync) ← Recoverable, logged      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Indicator shows error, pass retried on next scheduled check           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Queue file operation errors.
///
/// Every variant carries the path involved so a log line alone is enough
/// to find the file on the device.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Queue directory could not be created.
    #[error("Failed to create queue directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A queue file could not be opened.
    ///
    /// ## When This Occurs
    /// - Filesystem not mounted or read-only
    /// - Permissions changed underneath the process
    #[error("Failed to open {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing or syncing an appended record failed.
    ///
    /// ## When This Occurs
    /// - Flash/disk full
    /// - I/O error while flushing to the medium
    #[error("Failed to append to {path:?}: {source}")]
    Append {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Renaming the active log to the in-flight log failed.
    #[error("Failed to rotate {path:?}: {source}")]
    Rotate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Reading the in-flight log failed mid-drain.
    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Deleting the drained in-flight log failed.
    #[error("Failed to remove {path:?}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Convenience type alias for Results with StoreError.
pub type StoreResult<T> = Result<T, StoreError>;
