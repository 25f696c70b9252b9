//! JSON manifests describing paths and bundles.
//!
//! ```json
//! {
//!   "assetRoot": "assets/",
//!   "imagePath": "img/",
//!   "audioPath": "sfx/",
//!   "dataPath": "data/",
//!   "bundles": [
//!     { "name": "level1", "assets": { "hero": "hero.png", "music": ["m.ogg", "m.mp3"] } }
//!   ],
//!   "loadBundles": "level1"
//! }
//! ```

use serde::Deserialize;

use stowage_promise::Next;

use crate::bundle::SpecMap;
use crate::config::AssetPaths;
use crate::error::AssetError;
use crate::loaders::DataFormat;
use crate::manager::{AssetManager, AssetPromise};
use crate::resource::DataValue;

/// A parsed manifest document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub asset_root: Option<String>,
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default)]
    pub audio_path: Option<String>,
    #[serde(default)]
    pub data_path: Option<String>,
    #[serde(default)]
    pub bundles: Vec<ManifestBundle>,
    #[serde(default)]
    pub load_bundles: LoadBundles,
}

impl Manifest {
    /// The URL prefixes this manifest sets. Missing paths become empty.
    pub fn paths(&self) -> AssetPaths {
        AssetPaths {
            asset_root: self.asset_root.clone().unwrap_or_default(),
            images: self.image_path.clone().unwrap_or_default(),
            audio: self.audio_path.clone().unwrap_or_default(),
            data: self.data_path.clone().unwrap_or_default(),
        }
    }
}

/// One bundle entry of a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ManifestBundle {
    pub name: String,
    #[serde(default)]
    pub assets: SpecMap,
}

/// Which bundles a manifest asks to load once registered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "RawLoadBundles")]
pub enum LoadBundles {
    /// Register only.
    #[default]
    None,
    /// Every bundle, in registration order.
    All,
    /// The listed bundles.
    Named(Vec<String>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLoadBundles {
    Flag(bool),
    One(String),
    Many(Vec<String>),
    Null(()),
}

impl From<RawLoadBundles> for LoadBundles {
    fn from(raw: RawLoadBundles) -> Self {
        match raw {
            RawLoadBundles::Flag(true) => LoadBundles::All,
            RawLoadBundles::Flag(false) | RawLoadBundles::Null(()) => LoadBundles::None,
            RawLoadBundles::One(name) if name == "all" => LoadBundles::All,
            RawLoadBundles::One(name) => LoadBundles::Named(vec![name]),
            RawLoadBundles::Many(names) => LoadBundles::Named(names),
        }
    }
}

impl AssetManager {
    /// Load a manifest, apply its paths, register its bundles and load the
    /// bundles it selects.
    ///
    /// Loading the same URL as the last successfully fetched manifest fulfils
    /// immediately and does nothing. Fetch failures reject with
    /// [`AssetError::ManifestLoadFailed`], malformed documents with
    /// [`AssetError::ManifestParseFailed`]; bundle errors propagate unchanged.
    pub fn load_manifest(&self, url: &str) -> AssetPromise<()> {
        if self.inner.last_manifest.borrow().as_deref() == Some(url) {
            tracing::debug!(url, "manifest already loaded");
            return self.inner.scheduler.resolved(());
        }
        tracing::debug!(url, "loading manifest");

        let on_ok = self.clone();
        let on_err = self.clone();
        let ok_url = url.to_string();
        let err_url = url.to_string();
        self.load_data(url, None, DataFormat::Auto).then_or_else(
            move |data| match on_ok.apply_manifest(&ok_url, &data) {
                Ok(promise) => Ok(Next::Promise(promise)),
                Err(error) => on_ok.reject_with(error),
            },
            move |error| {
                on_err.reject_with(AssetError::ManifestLoadFailed {
                    url: err_url,
                    source: Box::new(error),
                })
            },
        )
    }

    fn apply_manifest(&self, url: &str, data: &DataValue) -> Result<AssetPromise<()>, AssetError> {
        stowage_core::profile_scope!("apply_manifest");
        let parsed = match data {
            DataValue::Json(value) => Manifest::deserialize(value.as_ref()),
            DataValue::Raw(text) => serde_json::from_str(text),
            DataValue::Binary(bytes) => serde_json::from_slice(bytes),
        };
        let manifest = parsed.map_err(|e| AssetError::ManifestParseFailed {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        *self.inner.last_manifest.borrow_mut() = Some(url.to_string());

        self.set_paths(manifest.paths());
        for bundle in manifest.bundles {
            self.create_bundle(bundle.name.as_str())?;
            self.add_bundle_asset(&bundle.name, bundle.assets)?;
        }

        let names = match manifest.load_bundles {
            LoadBundles::None => {
                tracing::debug!(url, "manifest registered bundles");
                return Ok(self.inner.scheduler.resolved(()));
            }
            LoadBundles::All => self.bundle_names(),
            LoadBundles::Named(names) => names,
        };
        Ok(self.load_bundle(names))
    }
}
