//! Error types for the loading pipeline.

use std::error::Error;
use std::fmt;

use crate::kind::{AssetKind, SUPPORTED_EXTENSIONS};

/// Errors that can occur while loading assets, bundles or manifests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    /// The locator's extension does not map to any asset kind.
    UnsupportedType {
        /// The name the asset was requested under.
        name: String,
        /// The locator that could not be classified.
        locator: String,
    },

    /// None of the audio candidates can be played by the runtime.
    UnsupportedAudioFormat {
        /// The asset name.
        name: String,
        /// Every candidate that was rejected.
        candidates: Vec<String>,
    },

    /// A bundle name was used before being created.
    BundleNotFound {
        /// The missing bundle name.
        bundle: String,
    },

    /// A bundle name was created twice.
    DuplicateBundle {
        /// The bundle name that already exists.
        bundle: String,
    },

    /// The platform failed to produce the resource.
    LoadFailed {
        /// What kind of resource was being loaded.
        kind: AssetKind,
        /// The resolved URL that failed.
        locator: String,
        /// The asset name, if one was supplied.
        name: Option<String>,
        /// The platform's description of the failure.
        cause: String,
    },

    /// The manifest document could not be fetched.
    ManifestLoadFailed {
        /// The manifest URL.
        url: String,
        /// The underlying load failure.
        source: Box<AssetError>,
    },

    /// The manifest document was fetched but is not a valid manifest.
    ManifestParseFailed {
        /// The manifest URL.
        url: String,
        /// Description of what was wrong.
        message: String,
    },
}

/// The coarse category of an [`AssetError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnsupportedType,
    UnsupportedAudioFormat,
    BundleNotFound,
    DuplicateBundle,
    LoadFailed,
    ManifestLoadFailed,
    ManifestParseFailed,
}

impl AssetError {
    /// Get the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AssetError::UnsupportedType { .. } => ErrorKind::UnsupportedType,
            AssetError::UnsupportedAudioFormat { .. } => ErrorKind::UnsupportedAudioFormat,
            AssetError::BundleNotFound { .. } => ErrorKind::BundleNotFound,
            AssetError::DuplicateBundle { .. } => ErrorKind::DuplicateBundle,
            AssetError::LoadFailed { .. } => ErrorKind::LoadFailed,
            AssetError::ManifestLoadFailed { .. } => ErrorKind::ManifestLoadFailed,
            AssetError::ManifestParseFailed { .. } => ErrorKind::ManifestParseFailed,
        }
    }

    /// Create a load failure for a resolved URL.
    pub fn load_failed(
        kind: AssetKind,
        locator: impl Into<String>,
        name: Option<&str>,
        cause: impl fmt::Display,
    ) -> Self {
        AssetError::LoadFailed {
            kind,
            locator: locator.into(),
            name: name.map(str::to_string),
            cause: cause.to_string(),
        }
    }
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetError::UnsupportedType { name, locator } => {
                write!(
                    f,
                    "File type for asset '{}' ({}) is not supported. Please use {}",
                    name,
                    locator,
                    SUPPORTED_EXTENSIONS.join(", ")
                )
            }
            AssetError::UnsupportedAudioFormat { name, candidates } => {
                write!(
                    f,
                    "Cannot play any of the audio formats provided for asset '{}': {}",
                    name,
                    candidates.join(", ")
                )
            }
            AssetError::BundleNotFound { bundle } => {
                write!(f, "Bundle '{}' has not been created", bundle)
            }
            AssetError::DuplicateBundle { bundle } => {
                write!(f, "Bundle '{}' already created", bundle)
            }
            AssetError::LoadFailed {
                kind,
                locator,
                name: Some(name),
                cause,
            } => {
                write!(f, "Unable to load {} '{}' from {}: {}", kind, name, locator, cause)
            }
            AssetError::LoadFailed {
                kind,
                locator,
                name: None,
                cause,
            } => {
                write!(f, "Unable to load {} {}: {}", kind, locator, cause)
            }
            AssetError::ManifestLoadFailed { url, source } => {
                write!(f, "Unable to load manifest {}: {}", url, source)
            }
            AssetError::ManifestParseFailed { url, message } => {
                write!(f, "Unable to parse manifest {}: {}", url, message)
            }
        }
    }
}

impl Error for AssetError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AssetError::ManifestLoadFailed { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Result type for synchronous asset operations.
pub type AssetResult<T> = Result<T, AssetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_type_lists_extensions() {
        let error = AssetError::UnsupportedType {
            name: "level".into(),
            locator: "level.tmx".into(),
        };
        let message = error.to_string();
        assert!(message.contains("'level'"));
        assert!(message.contains("level.tmx"));
        for extension in SUPPORTED_EXTENSIONS {
            assert!(message.contains(extension), "missing {extension}");
        }
    }

    #[test]
    fn test_load_failed_mentions_name_when_present() {
        let named = AssetError::load_failed(AssetKind::Image, "img/hero.png", Some("hero"), "404");
        assert_eq!(named.to_string(), "Unable to load image 'hero' from img/hero.png: 404");

        let anonymous = AssetError::load_failed(AssetKind::Script, "game.js", None, "blocked");
        assert_eq!(anonymous.to_string(), "Unable to load script game.js: blocked");
    }

    #[test]
    fn test_manifest_load_failure_keeps_source() {
        let inner = AssetError::load_failed(AssetKind::Data, "manifest.json", None, "not found");
        let error = AssetError::ManifestLoadFailed {
            url: "manifest.json".into(),
            source: Box::new(inner.clone()),
        };

        assert_eq!(error.kind(), ErrorKind::ManifestLoadFailed);
        let source = error.source().map(|s| s.to_string());
        assert_eq!(source, Some(inner.to_string()));
    }

    #[test]
    fn test_kinds() {
        assert_eq!(
            AssetError::BundleNotFound { bundle: "x".into() }.kind(),
            ErrorKind::BundleNotFound
        );
        assert_eq!(
            AssetError::DuplicateBundle { bundle: "x".into() }.kind(),
            ErrorKind::DuplicateBundle
        );
    }
}
