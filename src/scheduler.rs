//! Deferred task queue for effects.
//!
//! Effects never run inside a render. They are queued here and run when the
//! host calls [`flush`], which stands in for the platform's next idle turn.
//! The queue is per thread, like the rest of the runtime.

use std::cell::RefCell;
use std::collections::VecDeque;
use tracing::trace;

type Task = Box<dyn FnOnce()>;

thread_local! {
    static QUEUE: RefCell<VecDeque<Task>> = RefCell::new(VecDeque::new());
}

pub fn schedule<F>(task: F)
where
    F: FnOnce() + 'static,
{
    QUEUE.with(|queue| queue.borrow_mut().push_back(Box::new(task)));
}

/// Number of tasks waiting for the next flush.
pub fn pending() -> usize {
    QUEUE.with(|queue| queue.borrow().len())
}

/// Run queued tasks in FIFO order until the queue is empty, including tasks
/// queued by the tasks themselves. Returns how many ran.
pub fn flush() -> usize {
    let mut ran = 0;
    loop {
        // The borrow must end before the task runs; tasks schedule more tasks.
        let next = QUEUE.with(|queue| queue.borrow_mut().pop_front());
        match next {
            Some(task) => {
                task();
                ran += 1;
            }
            None => break,
        }
    }
    if ran > 0 {
        trace!(ran, "flushed scheduled tasks");
    }
    ran
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_flush_runs_in_order() {
        flush();
        let log = Rc::new(RefCell::new(Vec::new()));
        for i in 0..3 {
            let log = log.clone();
            schedule(move || log.borrow_mut().push(i));
        }
        assert_eq!(pending(), 3);
        assert!(log.borrow().is_empty());

        assert_eq!(flush(), 3);
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
        assert_eq!(pending(), 0);
    }

    #[test]
    fn test_tasks_scheduled_during_flush_run_in_same_flush() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let outer = log.clone();
        schedule(move || {
            outer.borrow_mut().push("outer");
            let inner = outer.clone();
            schedule(move || inner.borrow_mut().push("inner"));
        });
        assert_eq!(flush(), 2);
        assert_eq!(*log.borrow(), vec!["outer", "inner"]);
    }

    #[test]
    fn test_flush_on_empty_queue() {
        assert_eq!(flush(), 0);
    }
}
