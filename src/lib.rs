//! Completion-driven asynchronous file I/O.
//!
//! Files are opened with explicit [`OpenMode`], [`ShareMode`] and
//! [`BufferingMode`] policies and expose offset-addressed reads and writes
//! that suspend the calling task until the kernel reports completion. The
//! submission/completion plumbing is io_uring; each operation is a leaf
//! future that submits on first poll and is resumed exactly once by the
//! [`IoContext`] driving the ring.
//!
//! # Example
//!
//! ```ignore
//! use quillio::{BufferingMode, IoContext, OpenMode, ShareMode, WriteOnlyFile};
//!
//! let ctx = IoContext::new()?;
//! ctx.block_on(async {
//!     let file = WriteOnlyFile::open(
//!         &ctx,
//!         "out.bin",
//!         OpenMode::CreateAlways,
//!         ShareMode::none(),
//!         BufferingMode::Default,
//!     )
//!     .await?;
//!
//!     let (res, _buf) = file.write_at(b"hello".to_vec(), 0).await;
//!     let written = res?;
//!     assert!(written <= 5);
//!     Ok::<_, quillio::FileError>(())
//! })?;
//! ```
//!
//! A write may complete short; callers loop, advancing the offset and
//! narrowing the buffer, until the payload is on disk or an error comes
//! back. Two writes submitted without awaiting each other are not ordered
//! relative to one another.

pub mod context;
pub mod error;
pub mod fs;
pub mod io;

pub use context::{IoContext, LocalJoinHandle};
pub use error::FileError;
pub use fs::{
    BufferingMode, OpenMode, ReadOnlyFile, ReadWriteFile, ShareMode, WriteOnlyFile,
};
pub use io::{AsyncReadAt, AsyncWriteAt};
