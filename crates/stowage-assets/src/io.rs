//! Platform primitives the loaders are built on.
//!
//! Each primitive takes a resolved URL and a [`Completion`] that the platform
//! calls exactly once, from whatever context it likes. Completions may run
//! synchronously inside the call; the loaders never observe a value before
//! the scheduler's next tick either way.

use std::cell::RefCell;
use std::fmt;
use std::path::{Path, PathBuf};

use stowage_core::alloc::HashMap;

/// A platform-level failure description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoFailure {
    reason: String,
}

impl IoFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for IoFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

impl std::error::Error for IoFailure {}

/// Callback the platform invokes once a primitive finishes.
pub type Completion<T> = Box<dyn FnOnce(Result<T, IoFailure>)>;

/// Callback-driven platform I/O.
pub trait AssetIo {
    /// Decode an image, completing with its bytes once it is usable.
    fn decode_image(&self, url: &str, done: Completion<Vec<u8>>);

    /// Buffer an audio clip, completing once enough is buffered to play through.
    fn buffer_audio(&self, url: &str, done: Completion<Vec<u8>>);

    /// Inject and execute a script.
    fn inject_script(&self, url: &str, done: Completion<()>);

    /// Inject a stylesheet.
    fn inject_stylesheet(&self, url: &str, done: Completion<()>);

    /// Fetch a document body.
    fn fetch(&self, url: &str, done: Completion<Vec<u8>>);
}

/// In-memory platform for testing or embedded assets.
///
/// Every primitive completes synchronously: with the stored bytes, the stored
/// failure, or a "not found" failure.
#[derive(Default)]
pub struct MemoryIo {
    files: RefCell<HashMap<String, Result<Vec<u8>, IoFailure>>>,
    requests: RefCell<Vec<String>>,
    injected: RefCell<Vec<String>>,
}

impl MemoryIo {
    /// Create a new empty memory platform.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add bytes for a URL.
    pub fn insert(&self, url: impl AsRef<str>, bytes: impl Into<Vec<u8>>) {
        self.files
            .borrow_mut()
            .insert(url.as_ref().to_string(), Ok(bytes.into()));
    }

    /// Make every request for a URL fail with `reason`.
    pub fn insert_failure(&self, url: impl AsRef<str>, reason: impl Into<String>) {
        self.files
            .borrow_mut()
            .insert(url.as_ref().to_string(), Err(IoFailure::new(reason)));
    }

    /// Remove a URL.
    pub fn remove(&self, url: impl AsRef<str>) -> bool {
        self.files.borrow_mut().remove(url.as_ref()).is_some()
    }

    /// Check if a URL has an entry.
    pub fn contains(&self, url: impl AsRef<str>) -> bool {
        self.files.borrow().contains_key(url.as_ref())
    }

    /// Every URL requested so far, in request order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }

    /// How many times a URL was requested.
    pub fn request_count(&self, url: &str) -> usize {
        self.requests.borrow().iter().filter(|r| *r == url).count()
    }

    /// Scripts and stylesheets successfully injected, in order.
    pub fn injected(&self) -> Vec<String> {
        self.injected.borrow().clone()
    }

    fn read(&self, url: &str) -> Result<Vec<u8>, IoFailure> {
        self.requests.borrow_mut().push(url.to_string());
        // Clone out so the borrow ends before the completion runs.
        let entry = self.files.borrow().get(url).cloned();
        entry.unwrap_or_else(|| Err(IoFailure::new(format!("not found: {}", url))))
    }

    fn inject(&self, url: &str, done: Completion<()>) {
        let result = self.read(url).map(|_| ());
        if result.is_ok() {
            self.injected.borrow_mut().push(url.to_string());
        }
        done(result);
    }
}

impl AssetIo for MemoryIo {
    fn decode_image(&self, url: &str, done: Completion<Vec<u8>>) {
        done(self.read(url));
    }

    fn buffer_audio(&self, url: &str, done: Completion<Vec<u8>>) {
        done(self.read(url));
    }

    fn inject_script(&self, url: &str, done: Completion<()>) {
        self.inject(url, done);
    }

    fn inject_stylesheet(&self, url: &str, done: Completion<()>) {
        self.inject(url, done);
    }

    fn fetch(&self, url: &str, done: Completion<Vec<u8>>) {
        done(self.read(url));
    }
}

/// Filesystem-backed platform.
///
/// Reads are blocking and complete synchronously. Injection only records the
/// file; nothing is executed.
pub struct FileIo {
    /// Base path for relative URLs.
    base_path: PathBuf,
    injected: RefCell<Vec<PathBuf>>,
}

impl FileIo {
    /// Create a new file platform with a base path.
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            injected: RefCell::new(Vec::new()),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Resolve a URL relative to the base path.
    fn resolve_path(&self, url: &str) -> PathBuf {
        let path = Path::new(url);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }

    /// Read bytes synchronously.
    pub fn read_bytes_sync(&self, url: &str) -> Result<Vec<u8>, IoFailure> {
        let full_path = self.resolve_path(url);
        std::fs::read(&full_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                IoFailure::new(format!("not found: {}", full_path.display()))
            } else {
                IoFailure::new(format!("{}: {}", full_path.display(), e))
            }
        })
    }

    /// Files injected as scripts or stylesheets, in order.
    pub fn injected(&self) -> Vec<PathBuf> {
        self.injected.borrow().clone()
    }

    fn inject(&self, url: &str, done: Completion<()>) {
        let result = self.read_bytes_sync(url).map(|_| ());
        if result.is_ok() {
            self.injected.borrow_mut().push(self.resolve_path(url));
        }
        done(result);
    }
}

impl AssetIo for FileIo {
    fn decode_image(&self, url: &str, done: Completion<Vec<u8>>) {
        done(self.read_bytes_sync(url));
    }

    fn buffer_audio(&self, url: &str, done: Completion<Vec<u8>>) {
        done(self.read_bytes_sync(url));
    }

    fn inject_script(&self, url: &str, done: Completion<()>) {
        self.inject(url, done);
    }

    fn inject_stylesheet(&self, url: &str, done: Completion<()>) {
        self.inject(url, done);
    }

    fn fetch(&self, url: &str, done: Completion<Vec<u8>>) {
        done(self.read_bytes_sync(url));
    }
}
