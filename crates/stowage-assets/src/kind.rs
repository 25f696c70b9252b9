//! Asset classification by file extension.

use std::fmt;

/// The kind of resource a locator refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Image,
    Audio,
    Script,
    Stylesheet,
    Data,
}

const IMAGE_EXTENSIONS: &[&str] = &["jpeg", "jpg", "gif", "png"];
const AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3", "ogg", "aac", "m4a"];
const SCRIPT_EXTENSIONS: &[&str] = &["js"];
const STYLESHEET_EXTENSIONS: &[&str] = &["css"];
const DATA_EXTENSIONS: &[&str] = &["json"];

/// Every extension the classifier recognises, grouped by kind.
pub const SUPPORTED_EXTENSIONS: [&str; 12] = [
    "jpeg", "jpg", "gif", "png", "wav", "mp3", "ogg", "aac", "m4a", "js", "css", "json",
];

impl AssetKind {
    /// All kinds in classification order.
    pub const ALL: [AssetKind; 5] = [
        AssetKind::Image,
        AssetKind::Audio,
        AssetKind::Script,
        AssetKind::Stylesheet,
        AssetKind::Data,
    ];

    /// The lowercase extensions belonging to this kind.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            AssetKind::Image => IMAGE_EXTENSIONS,
            AssetKind::Audio => AUDIO_EXTENSIONS,
            AssetKind::Script => SCRIPT_EXTENSIONS,
            AssetKind::Stylesheet => STYLESHEET_EXTENSIONS,
            AssetKind::Data => DATA_EXTENSIONS,
        }
    }

    /// Find the kind an extension belongs to. Matching ignores ASCII case.
    pub fn from_extension(extension: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| {
            kind.extensions()
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(extension))
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AssetKind::Image => "image",
            AssetKind::Audio => "audio",
            AssetKind::Script => "script",
            AssetKind::Stylesheet => "stylesheet",
            AssetKind::Data => "data",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Drop any `?query` or `#fragment` suffix.
fn strip_suffix(locator: &str) -> &str {
    match locator.find(['?', '#']) {
        Some(index) => &locator[..index],
        None => locator,
    }
}

/// Get the text after the last `.` of the final path segment.
///
/// Returns an empty string when the locator has no extension.
pub fn extension(locator: &str) -> &str {
    let path = strip_suffix(locator);
    let file = path.rsplit('/').next().unwrap_or(path);
    match file.rfind('.') {
        Some(index) => &file[index + 1..],
        None => "",
    }
}

/// Classify a locator by its extension.
pub fn classify(locator: &str) -> Option<AssetKind> {
    AssetKind::from_extension(extension(locator))
}

/// The locator without its extension, used as the default asset name.
///
/// ```
/// use stowage_assets::asset_name;
///
/// assert_eq!(asset_name("sprites/hero.png"), "sprites/hero");
/// assert_eq!(asset_name("README"), "README");
/// ```
pub fn asset_name(locator: &str) -> &str {
    let ext = extension(locator);
    if ext.is_empty() {
        return strip_suffix(locator);
    }
    let path = strip_suffix(locator);
    &path[..path.len() - ext.len() - 1]
}
