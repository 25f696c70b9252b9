//! Test utilities for Stowage.
//!
//! - [`ScriptedIo`] - a platform whose requests complete only when the test
//!   releases them, so completion order is fully under test control
//! - [`DiagnosticCapture`] - records failures reported by promise continuations

pub mod diagnostics;
pub mod scripted_io;

pub use diagnostics::DiagnosticCapture;
pub use scripted_io::{Request, RequestKind, ScriptedIo};
