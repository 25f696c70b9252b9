//! Named bundles of asset specifications.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{AssetError, AssetResult};

/// What to load for one asset name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssetSpec {
    /// A single locator.
    Single(String),
    /// Alternative encodings of one audio clip, in preference order.
    Candidates(Vec<String>),
}

impl AssetSpec {
    /// The locators of this spec, in order.
    pub fn locators(&self) -> &[String] {
        match self {
            AssetSpec::Single(locator) => std::slice::from_ref(locator),
            AssetSpec::Candidates(candidates) => candidates,
        }
    }

    pub fn into_locators(self) -> Vec<String> {
        match self {
            AssetSpec::Single(locator) => vec![locator],
            AssetSpec::Candidates(candidates) => candidates,
        }
    }
}

impl From<&str> for AssetSpec {
    fn from(locator: &str) -> Self {
        AssetSpec::Single(locator.to_string())
    }
}

impl From<String> for AssetSpec {
    fn from(locator: String) -> Self {
        AssetSpec::Single(locator)
    }
}

impl From<Vec<String>> for AssetSpec {
    fn from(candidates: Vec<String>) -> Self {
        AssetSpec::Candidates(candidates)
    }
}

impl From<&[&str]> for AssetSpec {
    fn from(candidates: &[&str]) -> Self {
        AssetSpec::Candidates(candidates.iter().map(|c| c.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for AssetSpec {
    fn from(candidates: [&str; N]) -> Self {
        AssetSpec::Candidates(candidates.iter().map(|c| c.to_string()).collect())
    }
}

/// Asset name to spec, in insertion order.
pub type SpecMap = IndexMap<String, AssetSpec>;

/// Build a [`SpecMap`] from name/spec pairs.
pub fn spec_map<I, K, V>(entries: I) -> SpecMap
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<AssetSpec>,
{
    entries
        .into_iter()
        .map(|(name, spec)| (name.into(), spec.into()))
        .collect()
}

/// Lifecycle of a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BundleStatus {
    /// Registered but never loaded.
    #[default]
    Created,
    /// A load is in flight, or the last load failed.
    Loading,
    /// Every asset of the last load succeeded.
    Loaded,
}

impl BundleStatus {
    pub fn is_loaded(&self) -> bool {
        matches!(self, BundleStatus::Loaded)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, BundleStatus::Loading)
    }
}

/// A named group of asset specs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    name: String,
    status: BundleStatus,
    assets: SpecMap,
}

impl Bundle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: BundleStatus::Created,
            assets: SpecMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> BundleStatus {
        self.status
    }

    pub fn assets(&self) -> &SpecMap {
        &self.assets
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

/// One or more bundle names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BundleNames(Vec<String>);

impl BundleNames {
    pub fn into_vec(self) -> Vec<String> {
        self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for BundleNames {
    fn from(name: &str) -> Self {
        Self(vec![name.to_string()])
    }
}

impl From<String> for BundleNames {
    fn from(name: String) -> Self {
        Self(vec![name])
    }
}

impl From<Vec<String>> for BundleNames {
    fn from(names: Vec<String>) -> Self {
        Self(names)
    }
}

impl From<Vec<&str>> for BundleNames {
    fn from(names: Vec<&str>) -> Self {
        Self(names.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for BundleNames {
    fn from(names: &[&str]) -> Self {
        Self(names.iter().map(|n| n.to_string()).collect())
    }
}

impl From<&[String]> for BundleNames {
    fn from(names: &[String]) -> Self {
        Self(names.to_vec())
    }
}

impl<const N: usize> From<[&str; N]> for BundleNames {
    fn from(names: [&str; N]) -> Self {
        Self(names.iter().map(|n| n.to_string()).collect())
    }
}

/// Bundles by name, in creation order.
#[derive(Debug, Default)]
pub struct BundleRegistry {
    bundles: IndexMap<String, Bundle>,
}

impl BundleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register empty bundles in order.
    ///
    /// Stops at the first name that already exists. Names registered before it
    /// stay registered.
    pub fn create(&mut self, names: &BundleNames) -> AssetResult<()> {
        for name in names.iter() {
            if self.bundles.contains_key(name) {
                return Err(AssetError::DuplicateBundle {
                    bundle: name.to_string(),
                });
            }
            tracing::debug!(bundle = name, "bundle created");
            self.bundles.insert(name.to_string(), Bundle::new(name));
        }
        Ok(())
    }

    /// Merge specs into an existing bundle. Names already present are
    /// overwritten in place.
    pub fn add_assets(&mut self, bundle: &str, assets: SpecMap) -> AssetResult<()> {
        let entry = self
            .bundles
            .get_mut(bundle)
            .ok_or_else(|| AssetError::BundleNotFound {
                bundle: bundle.to_string(),
            })?;
        entry.assets.extend(assets);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Bundle> {
        self.bundles.get(name)
    }

    pub fn status(&self, name: &str) -> Option<BundleStatus> {
        self.bundles.get(name).map(Bundle::status)
    }

    pub(crate) fn set_status(&mut self, name: &str, status: BundleStatus) {
        if let Some(bundle) = self.bundles.get_mut(name) {
            tracing::trace!(bundle = name, ?status, "bundle status changed");
            bundle.status = status;
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bundles.contains_key(name)
    }

    /// Bundle names in creation order.
    pub fn names(&self) -> Vec<String> {
        self.bundles.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }
}
