//! The microtask queue.
//!
//! Work that must happen "before the next frame" (flushing update callbacks,
//! delivering callback settlement, caller-requested skips) is queued here and
//! drained by [`Orchestrator::run_microtasks`](super::Orchestrator::run_microtasks).
//! Transitions hold a clone of the queue so they can enqueue work without a
//! handle to the orchestrator.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use super::orchestrator::Orchestrator;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce(&mut Orchestrator)>;

/// Shared FIFO of [`Task`]s.
#[derive(Clone, Default)]
pub struct TaskQueue {
    tasks: Rc<RefCell<VecDeque<Task>>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, task: impl FnOnce(&mut Orchestrator) + 'static) {
        self.tasks.borrow_mut().push_back(Box::new(task));
    }

    /// Pop the oldest task. The queue is not borrowed while the task runs.
    pub fn pop(&self) -> Option<Task> {
        self.tasks.borrow_mut().pop_front()
    }

    pub fn len(&self) -> usize {
        self.tasks.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }
}

impl std::fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueue").field("len", &self.len()).finish()
    }
}
