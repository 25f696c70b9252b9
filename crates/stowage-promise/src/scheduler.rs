//! Cooperative next-tick task queue.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use crate::promise::{Deferred, Promise, Reason, Value};

type Task = Box<dyn FnOnce()>;

#[derive(Default)]
struct Queue {
    tasks: RefCell<VecDeque<Task>>,
    executed: Cell<u64>,
}

/// FIFO queue of deferred continuations.
///
/// Every promise created from a scheduler pushes its continuations here instead
/// of calling them in place. Tasks only run when the owner calls [`tick`](Self::tick)
/// or [`run_until_idle`](Self::run_until_idle), so a continuation registered on an
/// already-settled promise still runs after the registering call returns, and a
/// chain of any length is walked iteratively rather than recursively.
///
/// Cloning is cheap; all clones share the same queue.
#[derive(Clone, Default)]
pub struct Scheduler {
    queue: Rc<Queue>,
}

impl Scheduler {
    /// Create a new scheduler with an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a task for a later tick.
    pub fn schedule(&self, task: impl FnOnce() + 'static) {
        self.queue.tasks.borrow_mut().push_back(Box::new(task));
    }

    /// Run the oldest queued task. Returns `false` if the queue was empty.
    pub fn tick(&self) -> bool {
        // The borrow must end before the task runs; tasks schedule more tasks.
        let next = self.queue.tasks.borrow_mut().pop_front();
        match next {
            Some(task) => {
                task();
                self.queue.executed.set(self.queue.executed.get() + 1);
                true
            }
            None => false,
        }
    }

    /// Run tasks until the queue is empty, including tasks queued while draining.
    ///
    /// Returns the number of tasks executed.
    pub fn run_until_idle(&self) -> usize {
        stowage_core::profile_function!();
        let mut ran = 0;
        while self.tick() {
            ran += 1;
        }
        if ran > 0 {
            tracing::trace!(ran, "scheduler drained");
        }
        ran
    }

    /// Number of tasks waiting for a tick.
    pub fn pending_tasks(&self) -> usize {
        self.queue.tasks.borrow().len()
    }

    /// Check if no task is waiting.
    pub fn is_idle(&self) -> bool {
        self.queue.tasks.borrow().is_empty()
    }

    /// Total number of tasks run by this scheduler so far.
    pub fn executed(&self) -> u64 {
        self.queue.executed.get()
    }

    /// Create a new pending deferred bound to this scheduler.
    pub fn defer<T: Value, E: Reason>(&self) -> Deferred<T, E> {
        Deferred::new(self.clone())
    }

    /// A promise already fulfilled with `value`.
    pub fn resolved<T: Value, E: Reason>(&self, value: T) -> Promise<T, E> {
        let deferred = self.defer();
        deferred.resolve(value);
        deferred.promise()
    }

    /// A promise already rejected with `reason`.
    pub fn rejected<T: Value, E: Reason>(&self, reason: E) -> Promise<T, E> {
        let deferred = self.defer();
        deferred.reject(reason);
        deferred.promise()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("pending", &self.pending_tasks())
            .field("executed", &self.executed())
            .finish()
    }
}
