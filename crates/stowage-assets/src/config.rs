//! Loader configuration.

use crate::kind::AssetKind;

/// Runtime policy switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadPolicy {
    /// Hand out audio immediately instead of waiting for it to buffer.
    ///
    /// For runtimes that refuse to buffer audio until a user interaction. Audio
    /// loaded this way is excluded from progress totals.
    pub defer_audio_until_interaction: bool,
}

/// URL prefixes joined in front of every locator.
///
/// A resolved URL is `asset_root`, then the prefix for the asset's kind, then
/// the locator. Scripts and stylesheets only get `asset_root`. Locators that
/// are already absolute are used as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetPaths {
    pub asset_root: String,
    pub images: String,
    pub audio: String,
    pub data: String,
}

impl AssetPaths {
    /// Resolve a locator into the URL handed to the platform.
    pub fn resolve(&self, kind: AssetKind, locator: &str) -> String {
        if is_absolute(locator) {
            return locator.to_string();
        }
        let prefix = match kind {
            AssetKind::Image => self.images.as_str(),
            AssetKind::Audio => self.audio.as_str(),
            AssetKind::Data => self.data.as_str(),
            AssetKind::Script | AssetKind::Stylesheet => "",
        };
        format!("{}{}{}", self.asset_root, prefix, locator)
    }
}

fn is_absolute(locator: &str) -> bool {
    locator.starts_with('/') || locator.starts_with("http://") || locator.starts_with("https://")
}

/// Configuration for an [`AssetManager`](crate::AssetManager).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoaderConfig {
    pub policy: LoadPolicy,
    pub paths: AssetPaths,
}

impl LoaderConfig {
    /// Create a config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether audio is handed out before it buffers.
    pub fn defer_audio_until_interaction(mut self, enabled: bool) -> Self {
        self.policy.defer_audio_until_interaction = enabled;
        self
    }

    pub fn with_paths(mut self, paths: AssetPaths) -> Self {
        self.paths = paths;
        self
    }

    pub fn with_asset_root(mut self, root: impl Into<String>) -> Self {
        self.paths.asset_root = root.into();
        self
    }
}
