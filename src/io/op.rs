//! Operation structures and the leaf future that drives them.
//!
//! An [`Op`] submits itself to the driver on first poll, parks its waker in
//! the driver's registry, and resumes exactly once when the completion
//! arrives. Dropping a submitted `Op` requests cancellation of the
//! kernel-side operation; the driver reclaims the moved-in resources when
//! the (possibly `-ECANCELED`) completion eventually lands.

use std::cell::RefCell;
use std::ffi::CString;
use std::future::Future;
use std::pin::Pin;
use std::rc::Weak;
use std::task::{Context, Poll};

use crate::io::driver::{Driver, PlatformDriver};

/// Platform-agnostic raw handle type (fd on Unix).
pub type RawHandle = usize;

/// Resources owned by an in-flight operation.
///
/// Buffers and path bytes are moved in at submission and must stay alive
/// until the completion is processed, even if the awaiting future is gone.
pub enum IoResources {
    None,
    Open(OpenAt),
    Write(WriteAt),
    Read(ReadAt),
}

/// Conversion between a typed operation and the [`IoResources`] carrier the
/// driver stores while the operation is in flight.
pub trait IoOp: Sized {
    fn into_resources(self) -> IoResources;

    /// Recover the typed operation after completion.
    ///
    /// Panics on a variant mismatch; the registry hands back exactly the
    /// resources that were submitted under the same key.
    fn from_resources(res: IoResources) -> Self;
}

/// Open a file relative to the current working directory.
pub struct OpenAt {
    /// Null-terminated path bytes; the kernel reads these until completion.
    pub path: CString,
    pub flags: i32,
    pub mode: u32,
}

/// Write to a handle at an absolute byte offset.
pub struct WriteAt {
    pub fd: RawHandle,
    pub buf: Vec<u8>,
    pub offset: u64,
}

/// Read from a handle at an absolute byte offset, up to `buf.len()` bytes.
pub struct ReadAt {
    pub fd: RawHandle,
    pub buf: Vec<u8>,
    pub offset: u64,
}

impl IoOp for OpenAt {
    fn into_resources(self) -> IoResources {
        IoResources::Open(self)
    }

    fn from_resources(res: IoResources) -> Self {
        match res {
            IoResources::Open(op) => op,
            _ => panic!("resource type mismatch for OpenAt"),
        }
    }
}

impl IoOp for WriteAt {
    fn into_resources(self) -> IoResources {
        IoResources::Write(self)
    }

    fn from_resources(res: IoResources) -> Self {
        match res {
            IoResources::Write(op) => op,
            _ => panic!("resource type mismatch for WriteAt"),
        }
    }
}

impl IoOp for ReadAt {
    fn into_resources(self) -> IoResources {
        IoResources::Read(self)
    }

    fn from_resources(res: IoResources) -> Self {
        match res {
            IoResources::Read(op) => op,
            _ => panic!("resource type mismatch for ReadAt"),
        }
    }
}

enum State {
    Defined,
    Submitted,
    Completed,
}

/// A future wrapping one asynchronous I/O operation.
///
/// Lifecycle: Defined (created, not submitted) -> Submitted (owned by the
/// driver until a completion arrives) -> Completed.
pub struct Op<T: IoOp> {
    state: State,
    data: Option<T>,
    user_data: usize,
    driver: Weak<RefCell<PlatformDriver>>,
}

impl<T: IoOp> Op<T> {
    pub fn new(data: T, driver: Weak<RefCell<PlatformDriver>>) -> Self {
        Self {
            state: State::Defined,
            data: Some(data),
            user_data: 0,
            driver,
        }
    }
}

impl<T: IoOp> Future for Op<T> {
    type Output = (std::io::Result<usize>, T);

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // No structural pinning: T is owned by value and never projected.
        let op = unsafe { self.get_unchecked_mut() };

        match op.state {
            State::Defined => {
                let driver_rc = op.driver.upgrade().expect("driver has been dropped");
                let mut driver = driver_rc.borrow_mut();

                let data = op.data.take().expect("op polled without data");
                let user_data = driver.reserve_op();
                op.user_data = user_data;
                driver.submit_op(user_data, data.into_resources());

                op.state = State::Submitted;

                // Usually parks the waker so the completion can find it;
                // resolves immediately when the submission failed before
                // reaching the kernel.
                match driver.poll_op(user_data, cx) {
                    Poll::Ready((res, resources)) => {
                        op.state = State::Completed;
                        let data = T::from_resources(resources);
                        Poll::Ready((res.map(|n| n as usize), data))
                    }
                    Poll::Pending => Poll::Pending,
                }
            }
            State::Submitted => {
                let driver_rc = op.driver.upgrade().expect("driver has been dropped");
                let mut driver = driver_rc.borrow_mut();

                match driver.poll_op(op.user_data, cx) {
                    Poll::Ready((res, resources)) => {
                        op.state = State::Completed;
                        let data = T::from_resources(resources);
                        Poll::Ready((res.map(|n| n as usize), data))
                    }
                    Poll::Pending => Poll::Pending,
                }
            }
            State::Completed => panic!("op polled after completion"),
        }
    }
}

impl<T: IoOp> Drop for Op<T> {
    fn drop(&mut self) {
        if let State::Submitted = self.state {
            if let Some(driver_rc) = self.driver.upgrade() {
                driver_rc.borrow_mut().cancel_op(self.user_data);
            }
        }
    }
}
