//! The I/O context: a single-threaded executor owning the platform driver.
//!
//! File handles opened through a context route their completions back
//! through it; the context resumes the suspended task that submitted each
//! operation. Scheduling is cooperative and lock-free: tasks, the driver
//! and all wakers live on the thread that called [`IoContext::block_on`].

mod join;
mod task;

pub use join::LocalJoinHandle;

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::future::Future;
use std::io;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

use crate::io::driver::{Driver, PlatformDriver};
use task::Task;
use tracing::debug;

const DEFAULT_ENTRIES: u32 = 256;

pub struct IoContext {
    driver: Rc<RefCell<PlatformDriver>>,
    queue: Rc<RefCell<VecDeque<Rc<Task>>>>,
}

impl IoContext {
    pub fn new() -> io::Result<Self> {
        Self::with_entries(DEFAULT_ENTRIES)
    }

    /// Create a context whose submission ring holds `entries` slots.
    pub fn with_entries(entries: u32) -> io::Result<Self> {
        let driver = PlatformDriver::new(entries)?;
        debug!(entries, "io context created");
        Ok(Self {
            driver: Rc::new(RefCell::new(driver)),
            queue: Rc::new(RefCell::new(VecDeque::new())),
        })
    }

    pub(crate) fn driver(&self) -> Weak<RefCell<PlatformDriver>> {
        Rc::downgrade(&self.driver)
    }

    /// Number of file handles currently registered with this context.
    ///
    /// Opens register a handle, close/drop unregisters it; a nonzero count
    /// after all files are closed indicates a leak.
    pub fn registered_handles(&self) -> usize {
        self.driver.borrow().registered_handles()
    }

    /// Queue a task on this context. The task runs during `block_on`.
    pub fn spawn_local<F, T>(&self, future: F) -> LocalJoinHandle<T>
    where
        F: Future<Output = T> + 'static,
        T: 'static,
    {
        let (handle, completion) = LocalJoinHandle::new();
        let task = Task::new(
            async move {
                completion.deliver(future.await);
            },
            Rc::downgrade(&self.queue),
        );
        self.queue.borrow_mut().push_back(task);
        handle
    }

    /// Drive `future` (and any spawned tasks) to completion, blocking the
    /// current thread on the driver whenever no task is runnable.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        let mut main = Box::pin(future);

        // The main future gets a flag-based waker: completions that belong
        // to it set the flag and the loop polls it again.
        let woken = Rc::new(Cell::new(true));
        let waker = main_waker(woken.clone());
        let mut cx = Context::from_waker(&waker);

        loop {
            if woken.get() {
                woken.set(false);
                if let Poll::Ready(val) = main.as_mut().poll(&mut cx) {
                    return val;
                }
            }

            // Run the tasks queued right now; wakes that land during a poll
            // are picked up next round.
            let runnable = self.queue.borrow().len();
            for _ in 0..runnable {
                let task = self.queue.borrow_mut().pop_front();
                match task {
                    Some(task) => task.run(),
                    None => break,
                }
            }

            let has_ready = woken.get() || !self.queue.borrow().is_empty();
            let mut driver = self.driver.borrow_mut();
            if has_ready {
                // More tasks to run; flush submissions and take whatever
                // completions are already there without blocking.
                driver.submit().expect("io driver submit failed");
                driver.process_completions();
            } else if driver.has_pending_ops() {
                driver.wait().expect("io driver wait failed");
            } else {
                panic!("block_on stalled: future is pending but no task or I/O is outstanding");
            }
        }
    }
}

// Waker for the main future in block_on: waking sets the flag the loop
// checks before polling.

fn main_waker(woken: Rc<Cell<bool>>) -> Waker {
    let ptr = Rc::into_raw(woken) as *const ();
    unsafe { Waker::from_raw(RawWaker::new(ptr, &MAIN_WAKER_VTABLE)) }
}

const MAIN_WAKER_VTABLE: RawWakerVTable = RawWakerVTable::new(
    main_waker_clone,
    main_waker_wake,
    main_waker_wake_by_ref,
    main_waker_drop,
);

unsafe fn main_waker_clone(ptr: *const ()) -> RawWaker {
    unsafe { Rc::increment_strong_count(ptr as *const Cell<bool>) };
    RawWaker::new(ptr, &MAIN_WAKER_VTABLE)
}

unsafe fn main_waker_wake(ptr: *const ()) {
    let flag = unsafe { Rc::from_raw(ptr as *const Cell<bool>) };
    flag.set(true);
}

unsafe fn main_waker_wake_by_ref(ptr: *const ()) {
    let flag = unsafe { &*(ptr as *const Cell<bool>) };
    flag.set(true);
}

unsafe fn main_waker_drop(ptr: *const ()) {
    drop(unsafe { Rc::from_raw(ptr as *const Cell<bool>) });
}
