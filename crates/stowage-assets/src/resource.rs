//! Loaded resource values and the shared resource table.

use std::cell::RefCell;
use std::rc::Rc;

use stowage_core::alloc::HashMap;

use crate::kind::AssetKind;

/// A decoded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    url: String,
    bytes: Rc<[u8]>,
}

impl Image {
    pub fn new(url: impl Into<String>, bytes: impl Into<Rc<[u8]>>) -> Self {
        Self {
            url: url.into(),
            bytes: bytes.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// An audio clip handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Audio {
    url: String,
    buffered: Option<Rc<[u8]>>,
}

impl Audio {
    /// A clip whose data is ready to play through.
    pub fn buffered(url: impl Into<String>, bytes: impl Into<Rc<[u8]>>) -> Self {
        Self {
            url: url.into(),
            buffered: Some(bytes.into()),
        }
    }

    /// A clip handed out before buffering finished.
    pub fn deferred(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            buffered: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// The buffered data, or `None` if the clip was handed out early.
    pub fn data(&self) -> Option<&[u8]> {
        self.buffered.as_deref()
    }

    pub fn is_buffered(&self) -> bool {
        self.buffered.is_some()
    }
}

/// A loaded data document.
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    /// Parsed structured data.
    Json(Rc<serde_json::Value>),
    /// Text that was not structured data.
    Raw(Rc<str>),
    /// A payload that is neither structured data nor text, kept as fetched.
    Binary(Rc<[u8]>),
}

impl DataValue {
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            DataValue::Json(value) => Some(value),
            DataValue::Raw(_) | DataValue::Binary(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            DataValue::Raw(text) => Some(text),
            DataValue::Json(_) | DataValue::Binary(_) => None,
        }
    }

    /// The unparsed payload of a raw or binary document.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            DataValue::Raw(text) => Some(text.as_bytes()),
            DataValue::Binary(bytes) => Some(bytes),
            DataValue::Json(_) => None,
        }
    }
}

/// Any value stored in the [`ResourceTable`].
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    Image(Image),
    Audio(Audio),
    Data(DataValue),
}

impl Resource {
    pub fn kind(&self) -> AssetKind {
        match self {
            Resource::Image(_) => AssetKind::Image,
            Resource::Audio(_) => AssetKind::Audio,
            Resource::Data(_) => AssetKind::Data,
        }
    }

    pub fn as_image(&self) -> Option<&Image> {
        match self {
            Resource::Image(image) => Some(image),
            _ => None,
        }
    }

    pub fn as_audio(&self) -> Option<&Audio> {
        match self {
            Resource::Audio(audio) => Some(audio),
            _ => None,
        }
    }

    pub fn as_data(&self) -> Option<&DataValue> {
        match self {
            Resource::Data(data) => Some(data),
            _ => None,
        }
    }
}

/// Shared map from URL or asset name to a loaded resource.
///
/// Cloning is cheap; all clones see the same entries. Entries are only ever
/// added or replaced: writes replace any existing entry, so concurrent loads
/// of the same key keep whichever completes last.
#[derive(Debug, Clone, Default)]
pub struct ResourceTable {
    entries: Rc<RefCell<HashMap<String, Resource>>>,
}

impl ResourceTable {
    /// Create a new empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a resource under its URL and, if given, its name.
    pub fn insert(&self, url: &str, name: Option<&str>, resource: Resource) {
        tracing::trace!(url, name, kind = %resource.kind(), "storing resource");
        let mut entries = self.entries.borrow_mut();
        if let Some(name) = name
            && name != url
        {
            entries.insert(name.to_string(), resource.clone());
        }
        entries.insert(url.to_string(), resource);
    }

    /// Get the resource stored under a URL or name.
    pub fn get(&self, key: &str) -> Option<Resource> {
        self.entries.borrow().get(key).cloned()
    }

    pub fn image(&self, key: &str) -> Option<Image> {
        self.get(key).and_then(|r| r.as_image().cloned())
    }

    pub fn audio(&self, key: &str) -> Option<Audio> {
        self.get(key).and_then(|r| r.as_audio().cloned())
    }

    pub fn data(&self, key: &str) -> Option<DataValue> {
        self.get(key).and_then(|r| r.as_data().cloned())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.borrow().contains_key(key)
    }

    /// Number of keys, counting a resource stored under both URL and name twice.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.borrow().keys().cloned().collect();
        keys.sort();
        keys
    }
}
