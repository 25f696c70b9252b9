//! Capturing the process-wide promise diagnostic sink.

use std::sync::Arc;

use parking_lot::Mutex;
use stowage_promise::{clear_diagnostic_sink, set_diagnostic_sink};

/// Installs a sink that records every reported failure, and restores the
/// default sink when dropped.
///
/// The sink is process-wide. Tests using this should live in their own test
/// binary or otherwise avoid running concurrently with other sink users.
pub struct DiagnosticCapture {
    messages: Arc<Mutex<Vec<String>>>,
}

impl DiagnosticCapture {
    /// Install the capturing sink.
    pub fn install() -> Self {
        let messages = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&messages);
        set_diagnostic_sink(move |message| sink.lock().push(message.to_string()));
        Self { messages }
    }

    /// Every message reported so far.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }
}

impl Drop for DiagnosticCapture {
    fn drop(&mut self) {
        clear_diagnostic_sink();
    }
}
