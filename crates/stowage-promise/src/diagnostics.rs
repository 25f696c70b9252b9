//! Process-wide sink for failures raised inside continuations.
//!
//! When a continuation returns `Err`, the child promise rejects and the error is
//! also handed to the sink. The sink only observes; it never changes how any
//! promise settles. Without a custom sink the failure is logged with
//! `tracing::error!`.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

/// Callback receiving the rendered failure message.
pub type DiagnosticSink = Arc<dyn Fn(&str) + Send + Sync>;

static SINK: RwLock<Option<DiagnosticSink>> = parking_lot::const_rwlock(None);

/// Replace the process-wide diagnostic sink.
pub fn set_diagnostic_sink(sink: impl Fn(&str) + Send + Sync + 'static) {
    *SINK.write() = Some(Arc::new(sink));
}

/// Restore the default `tracing` sink.
pub fn clear_diagnostic_sink() {
    *SINK.write() = None;
}

pub(crate) fn report(reason: &dyn fmt::Display) {
    let message = reason.to_string();
    // Clone out of the lock so a sink may itself replace the sink.
    let sink = SINK.read().clone();
    match sink {
        Some(sink) => sink(&message),
        None => tracing::error!(target: "stowage::promise", "continuation failed: {}", message),
    }
}
