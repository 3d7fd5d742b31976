//! File layer errors.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by file operations.
///
/// Every operation terminates in exactly one of a success value or one of
/// these variants; nothing is retried or swallowed internally. A failed
/// write leaves the handle open and valid for further operations.
#[derive(Debug, Error)]
pub enum FileError {
    /// The path could not be opened under the requested mode combination.
    #[error("failed to open {path}: {source}")]
    Open {
        /// The path passed to `open`.
        path: PathBuf,
        /// The underlying OS error.
        source: io::Error,
    },

    /// An operation was attempted on a file that is closed or was never
    /// opened.
    #[error("file handle is not open")]
    InvalidHandle,

    /// The kernel reported a failed write completion.
    #[error("write at offset {offset} failed: {source}")]
    Write {
        /// Absolute byte offset of the failed write.
        offset: u64,
        /// The underlying OS error.
        source: io::Error,
    },

    /// The kernel reported a failed read completion.
    #[error("read at offset {offset} failed: {source}")]
    Read {
        /// Absolute byte offset of the failed read.
        offset: u64,
        /// The underlying OS error.
        source: io::Error,
    },

    /// A size or metadata query failed.
    #[error("metadata query failed: {0}")]
    Query(#[source] io::Error),

    /// The operation was cancelled before a completion was delivered.
    ///
    /// Distinct from [`FileError::Write`] so callers can tell deliberate
    /// cancellation from a genuine I/O fault.
    #[error("operation cancelled before completion")]
    Cancelled,
}

impl FileError {
    /// The raw OS error code, when one backs this error.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            FileError::Open { source, .. }
            | FileError::Write { source, .. }
            | FileError::Read { source, .. }
            | FileError::Query(source) => source.raw_os_error(),
            FileError::InvalidHandle | FileError::Cancelled => None,
        }
    }
}
