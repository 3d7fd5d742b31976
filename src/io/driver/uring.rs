use crate::io::driver::op_registry::OpRegistry;
use crate::io::driver::Driver;
use crate::io::op::{IoResources, RawHandle};
use io_uring::{opcode, squeue, types, IoUring};
use std::collections::HashSet;
use std::io;
use std::task::{Context, Poll};
use tracing::warn;

/// Special user_data value for cancel operations. CQEs carrying it are just
/// confirmations that a cancel request was consumed and are ignored.
const CANCEL_USER_DATA: u64 = u64::MAX - 1;

pub struct UringDriver {
    ring: IoUring,
    /// In-flight operations; the slab key doubles as the io_uring user_data.
    ops: OpRegistry,
    /// Handles currently accounted to this context.
    handles: HashSet<RawHandle>,
}

impl UringDriver {
    pub fn new(entries: u32) -> io::Result<Self> {
        let ring = IoUring::builder()
            .setup_coop_taskrun()
            .setup_single_issuer()
            .setup_defer_taskrun()
            .build(entries)
            .or_else(|e| {
                // Fallback for older kernels if the setup flags are unsupported.
                if e.raw_os_error() == Some(libc::EINVAL) {
                    IoUring::new(entries)
                } else {
                    Err(e)
                }
            })?;

        Ok(Self {
            ring,
            ops: OpRegistry::with_capacity(entries as usize),
            handles: HashSet::new(),
        })
    }

    fn push_entry(&mut self, entry: squeue::Entry) -> io::Result<()> {
        // Safety: the resources referenced by the entry are held in the
        // registry until the matching CQE is processed.
        if unsafe { self.ring.submission().push(&entry) }.is_ok() {
            return Ok(());
        }

        // Submission queue full: flush and retry once.
        self.ring.submit()?;
        unsafe { self.ring.submission().push(&entry) }
            .map_err(|_| io::Error::new(io::ErrorKind::WouldBlock, "submission queue full"))
    }
}

/// SQE transfer lengths are 32-bit; longer buffers clamp to a short
/// transfer, which callers already handle under the partial-write contract.
fn sqe_len(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

/// Build the platform submission entry for an operation's resources.
///
/// The raw pointers handed to the kernel point into heap allocations owned
/// by the resources, so moving the `IoResources` value afterwards does not
/// invalidate them.
fn make_sqe(res: &mut IoResources) -> squeue::Entry {
    match res {
        IoResources::Open(op) => opcode::OpenAt::new(types::Fd(libc::AT_FDCWD), op.path.as_ptr())
            .flags(op.flags)
            .mode(op.mode)
            .build(),
        IoResources::Write(op) => {
            opcode::Write::new(types::Fd(op.fd as i32), op.buf.as_ptr(), sqe_len(op.buf.len()))
                .offset(op.offset)
                .build()
        }
        IoResources::Read(op) => opcode::Read::new(
            types::Fd(op.fd as i32),
            op.buf.as_mut_ptr(),
            sqe_len(op.buf.len()),
        )
        .offset(op.offset)
        .build(),
        IoResources::None => unreachable!("submitted an operation without resources"),
    }
}

impl Driver for UringDriver {
    fn reserve_op(&mut self) -> usize {
        self.ops.reserve()
    }

    fn submit_op(&mut self, user_data: usize, mut resources: IoResources) {
        let sqe = make_sqe(&mut resources).user_data(user_data as u64);
        self.ops.attach(user_data, resources);

        // A submission that never reaches the kernel still has to
        // terminate: fail the slot so the awaiting future resumes with the
        // error instead of waiting on a CQE that will never come.
        if let Err(err) = self.push_entry(sqe) {
            warn!(user_data, error = %err, "failed to queue submission");
            self.ops.fail(user_data, err);
        }
    }

    fn poll_op(
        &mut self,
        user_data: usize,
        cx: &mut Context<'_>,
    ) -> Poll<(io::Result<u32>, IoResources)> {
        self.ops.poll(user_data, cx)
    }

    fn cancel_op(&mut self, user_data: usize) {
        // The registry keeps the slot alive while the kernel still holds
        // pointers into its resources; the eventual CQE is consumed
        // silently.
        if self.ops.cancel(user_data) {
            // Best-effort: ask the kernel to abort the operation. It may
            // complete normally first, in which case the CQE cleans up.
            let cancel_sqe = opcode::AsyncCancel::new(user_data as u64)
                .build()
                .user_data(CANCEL_USER_DATA);
            if let Err(err) = self.push_entry(cancel_sqe) {
                // The operation completes on its own and is reclaimed then.
                warn!(user_data, error = %err, "failed to queue cancellation");
            }
        }
    }

    fn submit(&mut self) -> io::Result<()> {
        self.ring.submit()?;
        Ok(())
    }

    fn wait(&mut self) -> io::Result<()> {
        if self.ops.is_empty() {
            return Ok(());
        }

        // Check the userspace completion queue before paying for a syscall.
        if !self.ring.completion().is_empty() {
            self.process_completions();
            return Ok(());
        }

        self.ring.submit_and_wait(1)?;
        self.process_completions();
        Ok(())
    }

    fn process_completions(&mut self) {
        let mut cq = self.ring.completion();
        cq.sync();

        for cqe in cq {
            let user_data = cqe.user_data();
            if user_data == u64::MAX || user_data == CANCEL_USER_DATA {
                continue;
            }

            let res = if cqe.result() >= 0 {
                Ok(cqe.result() as u32)
            } else {
                Err(io::Error::from_raw_os_error(-cqe.result()))
            };
            self.ops.complete(user_data as usize, res);
        }
    }

    fn has_pending_ops(&self) -> bool {
        !self.ops.is_empty()
    }

    fn register_handle(&mut self, handle: RawHandle) {
        self.handles.insert(handle);
    }

    fn unregister_handle(&mut self, handle: RawHandle) {
        self.handles.remove(&handle);
    }

    fn registered_handles(&self) -> usize {
        self.handles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::sqe_len;

    #[test]
    fn sqe_len_clamps_oversized_buffers() {
        assert_eq!(sqe_len(0), 0);
        assert_eq!(sqe_len(4096), 4096);
        assert_eq!(sqe_len(u32::MAX as usize), u32::MAX);
        assert_eq!(sqe_len(u32::MAX as usize + 1), u32::MAX);
    }
}
