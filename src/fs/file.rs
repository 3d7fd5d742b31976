use std::cell::{Cell, RefCell};
use std::ffi::CString;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::rc::Weak;

use tracing::{debug, warn};

use crate::context::IoContext;
use crate::error::FileError;
use crate::fs::handle::ScopedFd;
use crate::fs::open_options::{advise, open_flags, Access, BufferingMode, OpenMode, ShareMode};
use crate::io::driver::{Driver, PlatformDriver};
use crate::io::op::{Op, OpenAt, RawHandle, ReadAt, WriteAt};

/// Lifecycle core shared by all access modes: the owned handle, the context
/// it is registered with, and a cursor for the positional read/write
/// variants.
///
/// State machine: Closed -> `open` -> Open -> `close`/drop -> Closed
/// (terminal). Any I/O attempted while Closed fails with
/// [`FileError::InvalidHandle`].
#[derive(Debug)]
pub struct File {
    handle: Option<ScopedFd>,
    driver: Weak<RefCell<PlatformDriver>>,
    pos: Cell<u64>,
}

impl File {
    /// Open `path` with the requested access rights and policies.
    ///
    /// All four policies collapse into a single open submission; the
    /// resulting handle is registered with `ctx` so later operations route
    /// their completions through it. A failed open registers nothing and
    /// leaves nothing to clean up.
    pub(crate) async fn open(
        ctx: &IoContext,
        path: impl AsRef<Path>,
        access: Access,
        open_mode: OpenMode,
        share_mode: ShareMode,
        buffering_mode: BufferingMode,
    ) -> Result<File, FileError> {
        let path = path.as_ref();
        let c_path =
            CString::new(path.as_os_str().as_bytes()).map_err(|_| FileError::Open {
                path: path.to_owned(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "path contains a NUL byte"),
            })?;

        let flags = open_flags(access, open_mode, buffering_mode);
        let op = OpenAt {
            path: c_path,
            flags,
            mode: 0o666,
        };

        let driver = ctx.driver();
        let (res, _) = Op::new(op, driver.clone()).await;
        let fd = res.map_err(|source| FileError::Open {
            path: path.to_owned(),
            source,
        })? as RawHandle;
        let handle = ScopedFd::new(fd);

        if let Some(hint) = advise(buffering_mode) {
            let rc = unsafe { libc::posix_fadvise(fd as i32, 0, 0, hint) };
            if rc != 0 {
                warn!(fd, rc, "posix_fadvise hint rejected");
            }
        }

        // Registration happens here and only here; every construction path
        // that transfers an already-open handle goes through `from_parts`,
        // which leaves the registration untouched.
        if let Some(driver_rc) = driver.upgrade() {
            driver_rc.borrow_mut().register_handle(fd);
        }

        debug!(
            fd,
            ?access,
            ?open_mode,
            ?buffering_mode,
            share_read = share_mode.allows_read(),
            share_write = share_mode.allows_write(),
            share_delete = share_mode.allows_delete(),
            path = %path.display(),
            "file opened"
        );

        Ok(File {
            handle: Some(handle),
            driver,
            pos: Cell::new(0),
        })
    }

    /// Rewrap an already-open, already-registered handle. Never re-opens
    /// and never re-registers.
    pub(crate) fn from_parts(handle: ScopedFd, driver: Weak<RefCell<PlatformDriver>>) -> File {
        File {
            handle: Some(handle),
            driver,
            pos: Cell::new(0),
        }
    }

    /// Take the handle and driver back out, keeping the registration
    /// alive. Used when specializing into another access mode.
    pub(crate) fn into_parts(mut self) -> Option<(ScopedFd, Weak<RefCell<PlatformDriver>>)> {
        self.handle
            .take()
            .map(|handle| (handle, self.driver.clone()))
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Current file length in bytes.
    pub fn size(&self) -> Result<u64, FileError> {
        let fd = self.raw_fd().ok_or(FileError::InvalidHandle)?;
        let mut st: libc::stat = unsafe { std::mem::zeroed() };
        let rc = unsafe { libc::fstat(fd as i32, &mut st) };
        if rc != 0 {
            return Err(FileError::Query(io::Error::last_os_error()));
        }
        Ok(st.st_size as u64)
    }

    /// Move the cursor used by the positional read/write variants.
    pub fn seek(&self, pos: u64) {
        self.pos.set(pos);
    }

    pub fn position(&self) -> u64 {
        self.pos.get()
    }

    /// Release the handle early. Idempotent; drop performs the same
    /// release if this was never called.
    pub fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Some(driver_rc) = self.driver.upgrade() {
                driver_rc.borrow_mut().unregister_handle(handle.raw());
            }
            debug!(fd = handle.raw(), "file closed");
            drop(handle);
        }
    }

    fn raw_fd(&self) -> Option<RawHandle> {
        self.handle.as_ref().map(|h| h.raw())
    }

    pub(crate) async fn write_at(
        &self,
        buf: Vec<u8>,
        offset: u64,
    ) -> (Result<usize, FileError>, Vec<u8>) {
        let fd = match self.raw_fd() {
            Some(fd) => fd,
            None => return (Err(FileError::InvalidHandle), buf),
        };

        let op = WriteAt { fd, buf, offset };
        let (res, op) = Op::new(op, self.driver.clone()).await;
        (res.map_err(|source| write_error(offset, source)), op.buf)
    }

    pub(crate) async fn read_at(
        &self,
        buf: Vec<u8>,
        offset: u64,
    ) -> (Result<usize, FileError>, Vec<u8>) {
        let fd = match self.raw_fd() {
            Some(fd) => fd,
            None => return (Err(FileError::InvalidHandle), buf),
        };

        let op = ReadAt { fd, buf, offset };
        let (res, op) = Op::new(op, self.driver.clone()).await;
        (res.map_err(|source| read_error(offset, source)), op.buf)
    }

    /// Cursor-advancing write: writes at the current position and advances
    /// it by the number of bytes actually written.
    pub(crate) async fn write(&self, buf: Vec<u8>) -> (Result<usize, FileError>, Vec<u8>) {
        let offset = self.pos.get();
        let (res, buf) = self.write_at(buf, offset).await;
        if let Ok(n) = res {
            self.pos.set(offset + n as u64);
        }
        (res, buf)
    }

    /// Cursor-advancing read.
    pub(crate) async fn read(&self, buf: Vec<u8>) -> (Result<usize, FileError>, Vec<u8>) {
        let offset = self.pos.get();
        let (res, buf) = self.read_at(buf, offset).await;
        if let Ok(n) = res {
            self.pos.set(offset + n as u64);
        }
        (res, buf)
    }
}

impl Drop for File {
    fn drop(&mut self) {
        self.close();
    }
}

/// Classify a failed write completion. `ECANCELED` means the operation was
/// aborted before running, not that the device faulted; callers get a
/// distinct variant for it.
fn write_error(offset: u64, source: io::Error) -> FileError {
    if source.raw_os_error() == Some(libc::ECANCELED) {
        FileError::Cancelled
    } else {
        FileError::Write { offset, source }
    }
}

fn read_error(offset: u64, source: io::Error) -> FileError {
    if source.raw_os_error() == Some(libc::ECANCELED) {
        FileError::Cancelled
    } else {
        FileError::Read { offset, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_completions_are_distinct_from_write_faults() {
        let err = write_error(0, io::Error::from_raw_os_error(libc::ECANCELED));
        assert!(matches!(err, FileError::Cancelled));

        let err = write_error(512, io::Error::from_raw_os_error(libc::EIO));
        match err {
            FileError::Write { offset, source } => {
                assert_eq!(offset, 512);
                assert_eq!(source.raw_os_error(), Some(libc::EIO));
            }
            other => panic!("expected a write fault, got {other:?}"),
        }
    }

    #[test]
    fn cancelled_completions_are_distinct_from_read_faults() {
        assert!(matches!(
            read_error(0, io::Error::from_raw_os_error(libc::ECANCELED)),
            FileError::Cancelled
        ));
        assert!(matches!(
            read_error(0, io::Error::from_raw_os_error(libc::EBADF)),
            FileError::Read { .. }
        ));
    }
}
