use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;
use std::mem::ManuallyDrop;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

/// A locally spawned task: a boxed future plus the queue it reschedules
/// itself onto when woken.
pub(crate) struct Task {
    future: RefCell<Option<Pin<Box<dyn Future<Output = ()>>>>>,
    queue: Weak<RefCell<VecDeque<Rc<Task>>>>,
}

impl Task {
    pub(crate) fn new<F>(future: F, queue: Weak<RefCell<VecDeque<Rc<Task>>>>) -> Rc<Task>
    where
        F: Future<Output = ()> + 'static,
    {
        Rc::new(Task {
            future: RefCell::new(Some(Box::pin(future))),
            queue,
        })
    }

    /// Poll the task once. A finished future is dropped in place so a
    /// stale wake cannot poll it again.
    pub(crate) fn run(self: &Rc<Self>) {
        let waker = task_waker(self.clone());
        let mut cx = Context::from_waker(&waker);

        let mut slot = self.future.borrow_mut();
        if let Some(future) = slot.as_mut() {
            if let Poll::Ready(()) = future.as_mut().poll(&mut cx) {
                *slot = None;
            }
        }
    }
}

fn schedule(task: Rc<Task>) {
    if let Some(queue) = task.queue.upgrade() {
        queue.borrow_mut().push_back(task);
    }
}

fn task_waker(task: Rc<Task>) -> Waker {
    let ptr = Rc::into_raw(task) as *const ();
    unsafe { Waker::from_raw(RawWaker::new(ptr, &TASK_WAKER_VTABLE)) }
}

const TASK_WAKER_VTABLE: RawWakerVTable = RawWakerVTable::new(
    task_waker_clone,
    task_waker_wake,
    task_waker_wake_by_ref,
    task_waker_drop,
);

unsafe fn task_waker_clone(ptr: *const ()) -> RawWaker {
    unsafe { Rc::increment_strong_count(ptr as *const Task) };
    RawWaker::new(ptr, &TASK_WAKER_VTABLE)
}

unsafe fn task_waker_wake(ptr: *const ()) {
    let task = unsafe { Rc::from_raw(ptr as *const Task) };
    schedule(task);
}

unsafe fn task_waker_wake_by_ref(ptr: *const ()) {
    let task = unsafe { ManuallyDrop::new(Rc::from_raw(ptr as *const Task)) };
    schedule(Rc::clone(&task));
}

unsafe fn task_waker_drop(ptr: *const ()) {
    drop(unsafe { Rc::from_raw(ptr as *const Task) });
}
