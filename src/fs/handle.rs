use crate::io::op::RawHandle;
use tracing::warn;

/// Exclusive owner of one OS file handle.
///
/// Move-only: there is never more than one owner, and the handle is closed
/// exactly once. Close failures on drop are logged, not propagated.
#[derive(Debug)]
pub struct ScopedFd {
    fd: RawHandle,
}

impl ScopedFd {
    pub(crate) fn new(fd: RawHandle) -> Self {
        Self { fd }
    }

    pub(crate) fn raw(&self) -> RawHandle {
        self.fd
    }

    /// Give up ownership of the handle without closing it.
    pub fn release(self) -> RawHandle {
        let fd = self.fd;
        std::mem::forget(self);
        fd
    }
}

impl Drop for ScopedFd {
    fn drop(&mut self) {
        let rc = unsafe { libc::close(self.fd as i32) };
        if rc != 0 {
            warn!(
                fd = self.fd,
                error = %std::io::Error::last_os_error(),
                "failed to close file handle"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_dev_null() -> i32 {
        let fd = unsafe { libc::open(c"/dev/null".as_ptr(), libc::O_RDONLY) };
        assert!(fd >= 0);
        fd
    }

    #[test]
    fn drop_closes_the_handle() {
        let fd = open_dev_null();
        drop(ScopedFd::new(fd as RawHandle));
        // Already closed, so a second close must fail.
        assert_eq!(unsafe { libc::close(fd) }, -1);
    }

    #[test]
    fn release_transfers_ownership_without_closing() {
        let fd = open_dev_null();
        let scoped = ScopedFd::new(fd as RawHandle);
        let raw = scoped.release();
        assert_eq!(raw, fd as RawHandle);
        // Still open; we own it now.
        assert_eq!(unsafe { libc::close(fd) }, 0);
    }
}
