//! Deferred one-shot tasks
//!
//! A small FIFO queue standing in for the host event loop's "next tick".
//! Production-mode silencing is scheduled here so the code path that
//! requested it finishes against a live console; the queue is drained at
//! the start of every service entry point and by an explicit
//! `run_pending` call.

use std::collections::VecDeque;
use std::sync::Mutex;

type Task = Box<dyn FnOnce() + Send>;

/// FIFO queue of deferred one-shot tasks.
#[derive(Default)]
pub(crate) struct TaskQueue {
    pending: Mutex<VecDeque<Task>>,
}

impl TaskQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append a task to run on the next drain
    pub(crate) fn schedule(&self, task: Task) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.push_back(task);
        }
    }

    /// Run every pending task in FIFO order and return how many ran.
    /// Tasks run outside the queue lock, so a task may schedule new
    /// tasks; those wait for the next drain.
    pub(crate) fn run_pending(&self) -> usize {
        let drained: Vec<Task> = match self.pending.lock() {
            Ok(mut pending) => pending.drain(..).collect(),
            Err(_) => return 0,
        };
        let count = drained.len();
        for task in drained {
            task();
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_fifo_order() {
        let queue = TaskQueue::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let seen = seen.clone();
            queue.schedule(Box::new(move || {
                if let Ok(mut seen) = seen.lock() {
                    seen.push(i);
                }
            }));
        }

        assert_eq!(queue.run_pending(), 3);
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
        assert_eq!(queue.run_pending(), 0, "queue should be empty after a drain");
    }

    #[test]
    fn test_tasks_scheduled_during_drain_wait() {
        let queue = Arc::new(TaskQueue::new());
        let ran = Arc::new(AtomicUsize::new(0));

        let inner_queue = queue.clone();
        let inner_ran = ran.clone();
        queue.schedule(Box::new(move || {
            let ran = inner_ran.clone();
            inner_queue.schedule(Box::new(move || {
                ran.fetch_add(1, Ordering::SeqCst);
            }));
        }));

        assert_eq!(queue.run_pending(), 1);
        assert_eq!(ran.load(Ordering::SeqCst), 0, "nested task must not run in the same drain");
        assert_eq!(queue.run_pending(), 1);
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }
}
