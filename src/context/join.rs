use std::cell::Cell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

/// A handle to a task spawned on an [`IoContext`](crate::IoContext).
///
/// Awaiting it yields the task's output. Dropping it detaches the task,
/// which keeps running.
pub struct LocalJoinHandle<T> {
    slot: Rc<JoinSlot<T>>,
}

/// Single-value channel between a task and its join handle.
///
/// Everything lives on one thread, so plain `Cell`s suffice. `finished`
/// stays set once the task ends whether or not it produced a value, which
/// lets a handle tell a still-running task from one that was dropped
/// mid-flight.
struct JoinSlot<T> {
    value: Cell<Option<T>>,
    waker: Cell<Option<Waker>>,
    finished: Cell<bool>,
}

impl<T> LocalJoinHandle<T> {
    pub(crate) fn new() -> (Self, Completion<T>) {
        let slot = Rc::new(JoinSlot {
            value: Cell::new(None),
            waker: Cell::new(None),
            finished: Cell::new(false),
        });
        (Self { slot: slot.clone() }, Completion { slot })
    }
}

impl<T> Future for LocalJoinHandle<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        if let Some(value) = self.slot.value.take() {
            return Poll::Ready(value);
        }
        if self.slot.finished.get() {
            panic!("LocalJoinHandle: task ended without a value (cancelled, or polled after completion)");
        }
        self.slot.waker.set(Some(cx.waker().clone()));
        Poll::Pending
    }
}

/// Task-side half of the slot: delivers the output, and on drop marks the
/// slot finished and wakes the joiner. A task torn down before running
/// still drops its `Completion`, so the joiner never waits forever.
pub(crate) struct Completion<T> {
    slot: Rc<JoinSlot<T>>,
}

impl<T> Completion<T> {
    pub(crate) fn deliver(self, value: T) {
        self.slot.value.set(Some(value));
        // Drop runs next and performs the wake.
    }
}

impl<T> Drop for Completion<T> {
    fn drop(&mut self) {
        self.slot.finished.set(true);
        if let Some(waker) = self.slot.waker.take() {
            waker.wake();
        }
    }
}
