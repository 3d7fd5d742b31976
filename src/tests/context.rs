use crate::IoContext;
use std::cell::Cell;
use std::rc::Rc;

#[test]
fn block_on_returns_value() {
    let ctx = IoContext::new().expect("failed to create io context");
    let val = ctx.block_on(async { 41 + 1 });
    assert_eq!(val, 42);
}

#[test]
fn spawn_local_and_join() {
    let ctx = IoContext::new().expect("failed to create io context");
    let out = ctx.block_on(async {
        let handle = ctx.spawn_local(async { String::from("done") });
        handle.await
    });
    assert_eq!(out, "done");
}

#[test]
fn spawned_tasks_all_run() {
    const TASKS: usize = 32;

    let ctx = IoContext::new().expect("failed to create io context");
    let counter = Rc::new(Cell::new(0usize));

    ctx.block_on(async {
        let mut handles = Vec::with_capacity(TASKS);
        for _ in 0..TASKS {
            let counter = counter.clone();
            handles.push(ctx.spawn_local(async move {
                counter.set(counter.get() + 1);
            }));
        }
        for handle in handles {
            handle.await;
        }
    });

    assert_eq!(counter.get(), TASKS);
}

#[test]
fn nested_spawn_from_task() {
    let ctx = IoContext::new().expect("failed to create io context");
    let out = ctx.block_on(async {
        let outer = ctx.spawn_local({
            let inner = ctx.spawn_local(async { 7 });
            async move { inner.await * 6 }
        });
        outer.await
    });
    assert_eq!(out, 42);
}

#[test]
fn fresh_context_has_no_registered_handles() {
    let ctx = IoContext::new().expect("failed to create io context");
    assert_eq!(ctx.registered_handles(), 0);
}
