//! Deferred/promise primitives for callback-driven loading.
//!
//! The crate offers a one-shot [`Promise`] with three channels (fulfilment,
//! rejection and [`Progress`]), its producer side [`Deferred`], and the
//! [`Scheduler`] that runs every continuation on a later tick.
//!
//! Nothing here is thread-safe: promises are `Rc`-based and are meant to be driven
//! from one logical thread that periodically calls [`Scheduler::run_until_idle`].
//!
//! # Example
//!
//! ```
//! use stowage_promise::{Next, Scheduler};
//!
//! let scheduler = Scheduler::new();
//! let deferred = scheduler.defer::<u32, String>();
//!
//! let doubled = deferred.promise().then(|n| Ok(Next::Value(n * 2)));
//! deferred.resolve(21);
//!
//! // Nothing runs until the scheduler is drained.
//! assert!(doubled.is_pending());
//! scheduler.run_until_idle();
//! assert_eq!(doubled.outcome(), Some(Ok(42)));
//! ```

mod all;
pub mod diagnostics;
mod progress;
mod promise;
mod scheduler;

pub use diagnostics::{clear_diagnostic_sink, set_diagnostic_sink};
pub use progress::Progress;
pub use promise::{Deferred, Next, Promise, Reason, Step, Value};
pub use scheduler::Scheduler;
