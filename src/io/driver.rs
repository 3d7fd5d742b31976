//! The I/O context boundary.
//!
//! The file layer talks to the completion dispatcher only through the
//! [`Driver`] trait; one implementation exists per target platform.

pub(crate) mod op_registry;

use crate::io::op::{IoResources, RawHandle};
use std::io;
use std::task::{Context, Poll};

pub trait Driver {
    /// Reserve a registry slot for a new operation. Returns the
    /// completion-correlation key (user_data).
    fn reserve_op(&mut self) -> usize;

    /// Submit an operation under a previously reserved key, moving its
    /// resources into the registry until completion.
    fn submit_op(&mut self, user_data: usize, resources: IoResources);

    /// Poll an in-flight operation, parking the waker if it is still
    /// pending. Delivers each completion exactly once.
    fn poll_op(
        &mut self,
        user_data: usize,
        cx: &mut Context<'_>,
    ) -> Poll<(io::Result<u32>, IoResources)>;

    /// Request best-effort cancellation of an in-flight operation. The
    /// awaiting future is never resumed afterwards; resources are reclaimed
    /// when the kernel confirms either the cancellation or the real
    /// completion.
    fn cancel_op(&mut self, user_data: usize);

    /// Flush queued submissions to the kernel without blocking.
    fn submit(&mut self) -> io::Result<()>;

    /// Block until at least one completion arrives, then process the
    /// completion queue. Returns immediately when nothing is in flight.
    fn wait(&mut self) -> io::Result<()>;

    /// Drain whatever is currently sitting in the completion queue.
    fn process_completions(&mut self);

    /// Whether any operation is in flight (including cancelled ones whose
    /// completion has not yet been seen).
    fn has_pending_ops(&self) -> bool;

    /// Account an open handle with this context.
    fn register_handle(&mut self, handle: RawHandle);

    /// Remove a handle from the accounting.
    fn unregister_handle(&mut self, handle: RawHandle);

    /// Number of currently registered handles. Used as a leak probe.
    fn registered_handles(&self) -> usize;
}

#[cfg(target_os = "linux")]
pub(crate) mod uring;

#[cfg(target_os = "linux")]
pub use uring::UringDriver as PlatformDriver;

#[cfg(not(target_os = "linux"))]
compile_error!("quillio currently only supports the Linux io_uring backend");
