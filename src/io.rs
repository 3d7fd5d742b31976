pub mod driver;
pub mod op;

use crate::error::FileError;
use std::future::Future;

/// Offset-addressed asynchronous reading.
///
/// The buffer is moved into the operation and handed back with the result,
/// because the kernel may inspect it at any point until the completion is
/// delivered.
pub trait AsyncReadAt {
    /// Read up to `buf.len()` bytes starting at absolute byte `offset`.
    ///
    /// Resolves to the number of bytes read and the original buffer. A
    /// count of zero means end of file.
    fn read_at(
        &self,
        buf: Vec<u8>,
        offset: u64,
    ) -> impl Future<Output = (Result<usize, FileError>, Vec<u8>)>;
}

/// Offset-addressed asynchronous writing.
pub trait AsyncWriteAt {
    /// Write `buf` starting at absolute byte `offset`.
    ///
    /// Resolves to the number of bytes actually written, which may be less
    /// than `buf.len()`. Callers loop, advancing the offset and narrowing
    /// the buffer, until the full payload is written or an error is
    /// returned.
    fn write_at(
        &self,
        buf: Vec<u8>,
        offset: u64,
    ) -> impl Future<Output = (Result<usize, FileError>, Vec<u8>)>;
}
