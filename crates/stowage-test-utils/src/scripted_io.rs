//! A platform whose requests complete only when the test says so.

use std::cell::RefCell;
use std::collections::VecDeque;

use stowage_assets::{AssetIo, Completion, IoFailure};

/// Which platform primitive was called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    DecodeImage,
    BufferAudio,
    InjectScript,
    InjectStylesheet,
    Fetch,
}

/// Records a primitive call for verification in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub kind: RequestKind,
    pub url: String,
}

enum Held {
    Bytes(Completion<Vec<u8>>),
    Unit(Completion<()>),
}

impl Held {
    fn settle(self, result: Result<Vec<u8>, IoFailure>) {
        match self {
            Held::Bytes(done) => done(result),
            Held::Unit(done) => done(result.map(|_| ())),
        }
    }
}

/// Platform implementation that holds every completion until released.
///
/// Requests are kept in arrival order. Releasing a URL settles the oldest
/// outstanding request for it, so tests control completion order exactly.
///
/// # Example
///
/// ```rust
/// use std::rc::Rc;
/// use stowage_assets::prelude::*;
/// use stowage_test_utils::ScriptedIo;
///
/// let io = Rc::new(ScriptedIo::new());
/// let manager = AssetManager::new(
///     Scheduler::new(),
///     io.clone(),
///     AudioCapabilities::none(),
///     LoaderConfig::default(),
/// );
///
/// let image = manager.load_image("hero.png", None);
/// manager.scheduler().run_until_idle();
/// assert!(image.is_pending());
///
/// assert!(io.succeed("hero.png", b"px".to_vec()));
/// manager.scheduler().run_until_idle();
/// assert!(image.outcome().is_some_and(|r| r.is_ok()));
/// ```
#[derive(Default)]
pub struct ScriptedIo {
    /// Every request ever made, for verification.
    calls: RefCell<Vec<Request>>,
    /// Requests not yet released.
    outstanding: RefCell<VecDeque<(String, Held)>>,
}

impl ScriptedIo {
    /// Create a new scripted platform.
    pub fn new() -> Self {
        Self::default()
    }

    fn hold(&self, kind: RequestKind, url: &str, held: Held) {
        self.calls.borrow_mut().push(Request {
            kind,
            url: url.to_string(),
        });
        self.outstanding
            .borrow_mut()
            .push_back((url.to_string(), held));
    }

    fn take(&self, url: &str) -> Option<Held> {
        let mut outstanding = self.outstanding.borrow_mut();
        let index = outstanding.iter().position(|(pending, _)| pending == url)?;
        outstanding.remove(index).map(|(_, held)| held)
    }

    /// Complete the oldest outstanding request for `url` successfully.
    ///
    /// Injection requests ignore `bytes`. Returns `false` if nothing was
    /// outstanding for the URL.
    pub fn succeed(&self, url: &str, bytes: impl Into<Vec<u8>>) -> bool {
        // Taken out first so the completion can issue new requests.
        match self.take(url) {
            Some(held) => {
                held.settle(Ok(bytes.into()));
                true
            }
            None => false,
        }
    }

    /// Fail the oldest outstanding request for `url`.
    pub fn fail(&self, url: &str, reason: &str) -> bool {
        match self.take(url) {
            Some(held) => {
                held.settle(Err(IoFailure::new(reason)));
                true
            }
            None => false,
        }
    }

    /// Complete every outstanding request successfully with empty bytes, in
    /// arrival order. Returns how many were released.
    pub fn succeed_all(&self) -> usize {
        let mut released = 0;
        loop {
            let next = self.outstanding.borrow_mut().pop_front();
            match next {
                Some((_, held)) => {
                    held.settle(Ok(Vec::new()));
                    released += 1;
                }
                None => return released,
            }
        }
    }

    /// Every request made so far, in order.
    pub fn calls(&self) -> Vec<Request> {
        self.calls.borrow().clone()
    }

    /// URLs of every request made so far, in order.
    pub fn requested_urls(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|r| r.url.clone()).collect()
    }

    /// Count requests for a URL.
    pub fn count_requests(&self, url: &str) -> usize {
        self.calls.borrow().iter().filter(|r| r.url == url).count()
    }

    /// Number of requests still waiting for a release.
    pub fn outstanding(&self) -> usize {
        self.outstanding.borrow().len()
    }

    /// Forget all recorded calls. Outstanding requests stay outstanding.
    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }
}

impl AssetIo for ScriptedIo {
    fn decode_image(&self, url: &str, done: Completion<Vec<u8>>) {
        self.hold(RequestKind::DecodeImage, url, Held::Bytes(done));
    }

    fn buffer_audio(&self, url: &str, done: Completion<Vec<u8>>) {
        self.hold(RequestKind::BufferAudio, url, Held::Bytes(done));
    }

    fn inject_script(&self, url: &str, done: Completion<()>) {
        self.hold(RequestKind::InjectScript, url, Held::Unit(done));
    }

    fn inject_stylesheet(&self, url: &str, done: Completion<()>) {
        self.hold(RequestKind::InjectStylesheet, url, Held::Unit(done));
    }

    fn fetch(&self, url: &str, done: Completion<Vec<u8>>) {
        self.hold(RequestKind::Fetch, url, Held::Bytes(done));
    }
}
