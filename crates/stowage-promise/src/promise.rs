//! Promise state machine and continuation chaining.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::diagnostics;
use crate::progress::Progress;
use crate::scheduler::Scheduler;

/// Values that can flow through a promise.
///
/// `Clone` is required because one outcome is handed to every continuation.
pub trait Value: Clone + 'static {}
impl<T: Clone + 'static> Value for T {}

/// Rejection reasons.
pub trait Reason: Clone + fmt::Display + 'static {}
impl<E: Clone + fmt::Display + 'static> Reason for E {}

/// What a promise resolves with: either a plain value or another promise to follow.
pub enum Next<T: Value, E: Reason> {
    /// Settle with this value.
    Value(T),
    /// Adopt the eventual outcome of this promise.
    Promise(Promise<T, E>),
}

impl<T: Value, E: Reason> From<Promise<T, E>> for Next<T, E> {
    fn from(promise: Promise<T, E>) -> Self {
        Next::Promise(promise)
    }
}

impl<T: Value + fmt::Debug, E: Reason> fmt::Debug for Next<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Next::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Next::Promise(_) => f.write_str("Promise(..)"),
        }
    }
}

/// Return type of continuations.
///
/// `Err` is treated like a thrown failure: the child promise rejects and the
/// error is also reported to the [diagnostic sink](crate::diagnostics).
pub type Step<T, E> = Result<Next<T, E>, E>;

/// How a continuation settles its child.
enum Settlement<T: Value, E: Reason> {
    Resolve(Next<T, E>),
    /// Propagated rejection, not reported.
    Reject(E),
    /// Failure raised by a continuation, reported to the sink.
    Throw(E),
}

impl<T: Value, E: Reason> Settlement<T, E> {
    fn from_step(step: Step<T, E>) -> Self {
        match step {
            Ok(next) => Settlement::Resolve(next),
            Err(reason) => Settlement::Throw(reason),
        }
    }

    fn passthrough(outcome: Result<T, E>) -> Self {
        match outcome {
            Ok(value) => Settlement::Resolve(Next::Value(value)),
            Err(reason) => Settlement::Reject(reason),
        }
    }
}

type ProgressFn = Rc<RefCell<dyn FnMut(Progress)>>;

struct Handler<T, E> {
    settle: Box<dyn FnOnce(Result<T, E>)>,
    progress: ProgressFn,
}

enum State<T: Value, E: Reason> {
    Pending(Vec<Handler<T, E>>),
    /// Resolved with another promise that has not been observed to settle.
    Following(Promise<T, E>),
    Fulfilled(T),
    Rejected(E),
}

struct Shared<T: Value, E: Reason> {
    state: RefCell<State<T, E>>,
    scheduler: Scheduler,
}

// Each pending handler owns its child promise, so dropping an unsettled chain
// would recurse once per link. Dropped handlers are parked here and released
// one at a time instead.
#[derive(Default)]
struct DropQueue {
    parked: RefCell<Vec<Box<dyn Any>>>,
    draining: Cell<bool>,
}

thread_local! {
    static DROP_QUEUE: DropQueue = DropQueue::default();
}

fn release(parked: Box<dyn Any>) {
    let _ = DROP_QUEUE.try_with(move |queue| {
        queue.parked.borrow_mut().push(parked);
        if queue.draining.replace(true) {
            return;
        }
        loop {
            let next = queue.parked.borrow_mut().pop();
            match next {
                Some(item) => drop(item),
                None => break,
            }
        }
        queue.draining.set(false);
    });
}

impl<T: Value, E: Reason> Drop for Shared<T, E> {
    fn drop(&mut self) {
        let state = std::mem::replace(self.state.get_mut(), State::Pending(Vec::new()));
        let parked: Box<dyn Any> = match state {
            State::Pending(handlers) if !handlers.is_empty() => Box::new(handlers),
            State::Following(inner) => Box::new(inner),
            _ => return,
        };
        release(parked);
    }
}

/// Consumer side of a one-shot asynchronous result.
///
/// A promise moves from pending to fulfilled or rejected exactly once. While it
/// is pending it can also carry any number of [`Progress`] notifications.
/// Continuations never run synchronously: they are queued on the promise's
/// [`Scheduler`], in registration order.
pub struct Promise<T: Value, E: Reason> {
    shared: Rc<Shared<T, E>>,
}

impl<T: Value, E: Reason> Clone for Promise<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<T: Value, E: Reason> Promise<T, E> {
    fn new(scheduler: Scheduler) -> Self {
        Self {
            shared: Rc::new(Shared {
                state: RefCell::new(State::Pending(Vec::new())),
                scheduler,
            }),
        }
    }

    /// The scheduler continuations of this promise are queued on.
    pub fn scheduler(&self) -> &Scheduler {
        &self.shared.scheduler
    }

    /// Run `on_fulfilled` with the value; rejections pass through untouched.
    pub fn then<U: Value>(
        &self,
        on_fulfilled: impl FnOnce(T) -> Step<U, E> + 'static,
    ) -> Promise<U, E> {
        self.chain(
            move |outcome| match outcome {
                Ok(value) => Settlement::from_step(on_fulfilled(value)),
                Err(reason) => Settlement::Reject(reason),
            },
            None,
        )
    }

    /// Run one of two continuations depending on the outcome.
    pub fn then_or_else<U: Value>(
        &self,
        on_fulfilled: impl FnOnce(T) -> Step<U, E> + 'static,
        on_rejected: impl FnOnce(E) -> Step<U, E> + 'static,
    ) -> Promise<U, E> {
        self.chain(
            move |outcome| match outcome {
                Ok(value) => Settlement::from_step(on_fulfilled(value)),
                Err(reason) => Settlement::from_step(on_rejected(reason)),
            },
            None,
        )
    }

    /// Full form of [`then_or_else`](Self::then_or_else) that also observes progress.
    ///
    /// Progress is forwarded to the returned promise after `on_progress` has seen it.
    pub fn then_with_progress<U: Value>(
        &self,
        on_fulfilled: impl FnOnce(T) -> Step<U, E> + 'static,
        on_rejected: impl FnOnce(E) -> Step<U, E> + 'static,
        on_progress: impl FnMut(Progress) + 'static,
    ) -> Promise<U, E> {
        self.chain(
            move |outcome| match outcome {
                Ok(value) => Settlement::from_step(on_fulfilled(value)),
                Err(reason) => Settlement::from_step(on_rejected(reason)),
            },
            Some(Box::new(on_progress)),
        )
    }

    /// Transform the fulfilled value.
    pub fn map<U: Value>(&self, f: impl FnOnce(T) -> U + 'static) -> Promise<U, E> {
        self.chain(
            move |outcome| match outcome {
                Ok(value) => Settlement::Resolve(Next::Value(f(value))),
                Err(reason) => Settlement::Reject(reason),
            },
            None,
        )
    }

    /// Handle a rejection; fulfilled values pass through untouched.
    pub fn catch(&self, on_rejected: impl FnOnce(E) -> Step<T, E> + 'static) -> Promise<T, E> {
        self.chain(
            move |outcome| match outcome {
                Ok(value) => Settlement::Resolve(Next::Value(value)),
                Err(reason) => Settlement::from_step(on_rejected(reason)),
            },
            None,
        )
    }

    /// Run `on_settled` on either outcome, then pass the original outcome through.
    ///
    /// If `on_settled` fails, the returned promise rejects with that failure and
    /// the failure is reported like any other continuation failure. If it
    /// returns a promise, settlement waits for it and a rejection of it wins.
    pub fn finally(&self, on_settled: impl FnOnce() -> Step<(), E> + 'static) -> Promise<T, E> {
        self.chain(
            move |outcome| match on_settled() {
                Ok(Next::Value(())) => Settlement::passthrough(outcome),
                Ok(Next::Promise(cleanup)) => Settlement::Resolve(Next::Promise(cleanup.chain(
                    move |cleaned| match cleaned {
                        Ok(()) => Settlement::passthrough(outcome),
                        Err(reason) => Settlement::Reject(reason),
                    },
                    None,
                ))),
                Err(reason) => Settlement::Throw(reason),
            },
            None,
        )
    }

    /// Observe progress notifications. The outcome and progress pass through.
    pub fn on_progress(&self, on_progress: impl FnMut(Progress) + 'static) -> Promise<T, E> {
        self.chain(Settlement::passthrough, Some(Box::new(on_progress)))
    }

    /// Check if the promise has not settled yet (following counts as pending).
    pub fn is_pending(&self) -> bool {
        let mut current = self.clone();
        loop {
            let next = match &*current.shared.state.borrow() {
                State::Pending(_) => return true,
                State::Following(inner) => inner.clone(),
                State::Fulfilled(_) | State::Rejected(_) => return false,
            };
            current = next;
        }
    }

    /// The settled outcome, or `None` while pending.
    pub fn outcome(&self) -> Option<Result<T, E>> {
        let mut current = self.clone();
        loop {
            let next = match &*current.shared.state.borrow() {
                State::Pending(_) => return None,
                State::Following(inner) => inner.clone(),
                State::Fulfilled(value) => return Some(Ok(value.clone())),
                State::Rejected(reason) => return Some(Err(reason.clone())),
            };
            current = next;
        }
    }

    /// Register raw settle and progress callbacks without creating a child.
    pub(crate) fn observe(
        &self,
        settle: impl FnOnce(Result<T, E>) + 'static,
        progress: impl FnMut(Progress) + 'static,
    ) {
        let progress: ProgressFn = Rc::new(RefCell::new(progress));
        self.subscribe(Handler {
            settle: Box::new(settle),
            progress,
        });
    }

    fn chain<U: Value>(
        &self,
        on_settle: impl FnOnce(Result<T, E>) -> Settlement<U, E> + 'static,
        mut on_progress: Option<Box<dyn FnMut(Progress)>>,
    ) -> Promise<U, E> {
        let child = Deferred::new(self.shared.scheduler.clone());
        let settle_child = child.clone();
        let notify_child = child.clone();

        self.observe(
            move |outcome| match on_settle(outcome) {
                Settlement::Resolve(next) => settle_child.settle_with(next),
                Settlement::Reject(reason) => settle_child.reject(reason),
                Settlement::Throw(reason) => {
                    settle_child.reject(reason.clone());
                    diagnostics::report(&reason);
                }
            },
            move |progress| {
                if let Some(observer) = on_progress.as_mut() {
                    observer(progress);
                }
                notify_child.notify(progress);
            },
        );

        child.promise()
    }

    /// Check if following `self` would eventually reach `target`.
    ///
    /// `Following` links never form a cycle, so the walk terminates.
    fn leads_to(&self, target: &Promise<T, E>) -> bool {
        let mut current = self.clone();
        loop {
            if Rc::ptr_eq(&current.shared, &target.shared) {
                return true;
            }
            let next = match &*current.shared.state.borrow() {
                State::Following(inner) => inner.clone(),
                _ => return false,
            };
            current = next;
        }
    }

    /// Attach a handler, walking `Following` links to the promise that owns the outcome.
    fn subscribe(&self, handler: Handler<T, E>) {
        let mut current = self.clone();
        let outcome = loop {
            let next = {
                let mut state = current.shared.state.borrow_mut();
                match &mut *state {
                    State::Pending(handlers) => {
                        handlers.push(handler);
                        return;
                    }
                    State::Following(inner) => inner.clone(),
                    State::Fulfilled(value) => break Ok(value.clone()),
                    State::Rejected(reason) => break Err(reason.clone()),
                }
            };
            current = next;
        };
        current.dispatch(handler, outcome);
    }

    fn dispatch(&self, handler: Handler<T, E>, outcome: Result<T, E>) {
        self.shared
            .scheduler
            .schedule(move || (handler.settle)(outcome));
    }

    fn transition(&self, next: Step<T, E>) {
        if let Ok(Next::Promise(inner)) = &next
            && inner.leads_to(self)
        {
            tracing::warn!("ignoring attempt to resolve a promise with itself");
            return;
        }

        let mut state = self.shared.state.borrow_mut();
        let State::Pending(handlers) = &mut *state else {
            tracing::trace!("promise already settled; ignoring settlement");
            return;
        };
        let handlers = std::mem::take(handlers);

        match next {
            Ok(Next::Value(value)) => {
                *state = State::Fulfilled(value.clone());
                drop(state);
                for handler in handlers {
                    self.dispatch(handler, Ok(value.clone()));
                }
            }
            Ok(Next::Promise(inner)) => {
                *state = State::Following(inner.clone());
                drop(state);
                // Forwarding is registration, not invocation, so it happens now
                // and keeps registration order intact.
                for handler in handlers {
                    inner.subscribe(handler);
                }
            }
            Err(reason) => {
                *state = State::Rejected(reason.clone());
                drop(state);
                for handler in handlers {
                    self.dispatch(handler, Err(reason.clone()));
                }
            }
        }
    }

    fn notify(&self, progress: Progress) {
        let listeners: Vec<ProgressFn> = match &*self.shared.state.borrow() {
            State::Pending(handlers) => handlers.iter().map(|h| Rc::clone(&h.progress)).collect(),
            _ => return,
        };
        if listeners.is_empty() {
            tracing::trace!(%progress, "no progress listeners; notification dropped");
            return;
        }
        self.shared.scheduler.schedule(move || {
            for listener in listeners {
                (&mut *listener.borrow_mut())(progress);
            }
        });
    }
}

impl<T: Value, E: Reason> fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.shared.state.borrow() {
            State::Pending(handlers) => format!("Pending({} handlers)", handlers.len()),
            State::Following(_) => "Following".to_string(),
            State::Fulfilled(_) => "Fulfilled".to_string(),
            State::Rejected(_) => "Rejected".to_string(),
        };
        f.debug_struct("Promise").field("state", &state).finish()
    }
}

/// Producer side of a [`Promise`].
///
/// Only the first `resolve`, `follow`, `settle_with` or `reject` has an effect.
/// `notify` is only effective while the promise is pending, and only reaches
/// progress handlers registered at the time of the call.
pub struct Deferred<T: Value, E: Reason> {
    promise: Promise<T, E>,
}

impl<T: Value, E: Reason> Clone for Deferred<T, E> {
    fn clone(&self) -> Self {
        Self {
            promise: self.promise.clone(),
        }
    }
}

impl<T: Value, E: Reason> Deferred<T, E> {
    pub(crate) fn new(scheduler: Scheduler) -> Self {
        Self {
            promise: Promise::new(scheduler),
        }
    }

    /// The promise paired with this deferred.
    pub fn promise(&self) -> Promise<T, E> {
        self.promise.clone()
    }

    /// Fulfil with a plain value.
    pub fn resolve(&self, value: T) {
        self.promise.transition(Ok(Next::Value(value)));
    }

    /// Adopt the eventual outcome of another promise.
    pub fn follow(&self, promise: Promise<T, E>) {
        self.promise.transition(Ok(Next::Promise(promise)));
    }

    /// Resolve with either a value or a promise to follow.
    pub fn settle_with(&self, next: Next<T, E>) {
        self.promise.transition(Ok(next));
    }

    /// Reject with `reason`.
    pub fn reject(&self, reason: E) {
        self.promise.transition(Err(reason));
    }

    /// Send a progress notification to the currently registered handlers.
    pub fn notify(&self, progress: Progress) {
        self.promise.notify(progress);
    }
}

impl<T: Value, E: Reason> fmt::Debug for Deferred<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("promise", &self.promise)
            .finish()
    }
}
