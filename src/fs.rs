//! Files with explicit access, share and buffering policies.
//!
//! The capability wrappers ([`WriteOnlyFile`], [`ReadOnlyFile`],
//! [`ReadWriteFile`]) share one [`File`] core; each `open` pins the OS
//! access rights it requests and exposes only the matching operations.

mod file;
mod handle;
mod open_options;
mod read_only;
mod read_write;
mod write_only;

pub use file::File;
pub use handle::ScopedFd;
pub use open_options::{BufferingMode, OpenMode, ShareMode};
pub use read_only::ReadOnlyFile;
pub use read_write::ReadWriteFile;
pub use write_only::WriteOnlyFile;
