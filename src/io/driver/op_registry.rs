use crate::io::op::IoResources;
use slab::Slab;
use std::io;
use std::task::{Context, Poll, Waker};

struct OpEntry {
    waker: Option<Waker>,
    result: Option<io::Result<u32>>,
    resources: IoResources,
    cancelled: bool,
}

/// Store for in-flight operations, keyed by the value used as the
/// kernel-side completion correlator.
///
/// Slot lifecycle: `reserve` -> `attach` -> one of `complete`/`fail`, then
/// `poll` takes the result and frees the slot. `cancel` detaches the
/// awaiting future at any point; a cancelled slot survives until its
/// completion arrives, so memory the kernel may still touch never outlives
/// the entry holding it.
pub struct OpRegistry {
    slab: Slab<OpEntry>,
}

impl OpRegistry {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slab: Slab::with_capacity(capacity),
        }
    }

    /// Reserve a slot for a new operation. The key doubles as the
    /// submission's user_data.
    pub fn reserve(&mut self) -> usize {
        self.slab.insert(OpEntry {
            waker: None,
            result: None,
            resources: IoResources::None,
            cancelled: false,
        })
    }

    /// Park the resources the kernel may touch while the op is in flight.
    pub fn attach(&mut self, key: usize, resources: IoResources) {
        if let Some(op) = self.slab.get_mut(key) {
            op.resources = resources;
        }
    }

    /// Record a completion and wake the awaiting future. A completion for
    /// a cancelled slot is consumed silently and frees the slot.
    pub fn complete(&mut self, key: usize, result: io::Result<u32>) {
        let Some(op) = self.slab.get_mut(key) else {
            return;
        };

        if op.cancelled {
            self.slab.remove(key);
            return;
        }

        op.result = Some(result);
        if let Some(waker) = op.waker.take() {
            waker.wake();
        }
    }

    /// Fail an operation that never reached the kernel.
    pub fn fail(&mut self, key: usize, err: io::Error) {
        self.complete(key, Err(err));
    }

    /// Detach the awaiting future from a slot. Returns true when a kernel
    /// completion is still owed (the slot stays alive until it arrives),
    /// false when the result was already in and the slot has been freed.
    pub fn cancel(&mut self, key: usize) -> bool {
        let Some(op) = self.slab.get_mut(key) else {
            return false;
        };

        if op.result.is_some() {
            self.slab.remove(key);
            return false;
        }

        op.cancelled = true;
        op.waker = None;
        true
    }

    /// Take the result if it is in, freeing the slot; park the waker
    /// otherwise.
    pub fn poll(
        &mut self,
        key: usize,
        cx: &mut Context<'_>,
    ) -> Poll<(io::Result<u32>, IoResources)> {
        if let Some(op) = self.slab.get_mut(key) {
            if let Some(res) = op.result.take() {
                let entry = self.slab.remove(key);
                Poll::Ready((res, entry.resources))
            } else {
                op.waker = Some(cx.waker().clone());
                Poll::Pending
            }
        } else {
            Poll::Ready((
                Err(io::Error::new(io::ErrorKind::Other, "operation slot missing")),
                IoResources::None,
            ))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slab.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::task::Wake;

    struct WakeFlag(AtomicBool);

    impl WakeFlag {
        fn new() -> Arc<Self> {
            Arc::new(Self(AtomicBool::new(false)))
        }

        fn woken(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    impl Wake for WakeFlag {
        fn wake(self: Arc<Self>) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn failing_a_submission_wakes_the_parked_future() {
        let mut reg = OpRegistry::with_capacity(4);
        let key = reg.reserve();

        let flag = WakeFlag::new();
        let waker = Waker::from(flag.clone());
        let mut cx = Context::from_waker(&waker);

        assert!(reg.poll(key, &mut cx).is_pending());
        assert!(!flag.woken());

        reg.fail(key, io::Error::from_raw_os_error(libc::EBUSY));
        assert!(flag.woken());

        match reg.poll(key, &mut cx) {
            Poll::Ready((res, _)) => {
                assert_eq!(res.unwrap_err().raw_os_error(), Some(libc::EBUSY));
            }
            Poll::Pending => panic!("result was recorded but poll stayed pending"),
        }
        assert!(reg.is_empty());
    }

    #[test]
    fn cancel_before_completion_holds_the_slot() {
        let mut reg = OpRegistry::with_capacity(4);
        let key = reg.reserve();

        assert!(reg.cancel(key));
        assert!(!reg.is_empty());

        reg.complete(key, Ok(0));
        assert!(reg.is_empty());
    }

    #[test]
    fn cancel_after_completion_reclaims_the_slot() {
        let mut reg = OpRegistry::with_capacity(4);
        let key = reg.reserve();

        reg.complete(key, Ok(0));
        assert!(!reg.cancel(key));
        assert!(reg.is_empty());
    }
}
