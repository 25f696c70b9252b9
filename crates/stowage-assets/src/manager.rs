//! The asset manager: bundles, batch loads and progress.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use stowage_core::profile_function;
use stowage_promise::{Next, Progress, Promise, Scheduler, Step, Value};

use crate::audio::AudioCapabilities;
use crate::bundle::{AssetSpec, Bundle, BundleNames, BundleRegistry, BundleStatus, SpecMap, spec_map};
use crate::config::{AssetPaths, LoadPolicy, LoaderConfig};
use crate::error::{AssetError, AssetResult};
use crate::io::AssetIo;
use crate::kind::{AssetKind, classify};
use crate::loaders::DataFormat;
use crate::resource::{Resource, ResourceTable};

/// A promise that rejects with an [`AssetError`].
pub type AssetPromise<T> = Promise<T, AssetError>;

/// Results of a batch load keyed by asset name.
///
/// Scripts and stylesheets produce no value and map to `None`.
pub type LoadedAssets = IndexMap<String, Option<Resource>>;

pub(crate) struct Inner {
    pub(crate) scheduler: Scheduler,
    pub(crate) io: Rc<dyn AssetIo>,
    pub(crate) capabilities: AudioCapabilities,
    pub(crate) policy: LoadPolicy,
    pub(crate) paths: RefCell<AssetPaths>,
    pub(crate) resources: ResourceTable,
    pub(crate) bundles: RefCell<BundleRegistry>,
    pub(crate) last_manifest: RefCell<Option<String>>,
}

/// Coordinates loading of assets and bundles.
///
/// Cloning is cheap; all clones share the same bundles, resources and paths.
#[derive(Clone)]
pub struct AssetManager {
    pub(crate) inner: Rc<Inner>,
}

impl AssetManager {
    /// Create a new manager.
    ///
    /// `capabilities` is the set of audio formats the runtime plays; it is
    /// fixed for the manager's lifetime.
    pub fn new(
        scheduler: Scheduler,
        io: Rc<dyn AssetIo>,
        capabilities: AudioCapabilities,
        config: LoaderConfig,
    ) -> Self {
        tracing::debug!(
            defer_audio = config.policy.defer_audio_until_interaction,
            "creating asset manager"
        );
        Self {
            inner: Rc::new(Inner {
                scheduler,
                io,
                capabilities,
                policy: config.policy,
                paths: RefCell::new(config.paths),
                resources: ResourceTable::new(),
                bundles: RefCell::new(BundleRegistry::new()),
                last_manifest: RefCell::new(None),
            }),
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }

    /// The table every loader writes into.
    pub fn resources(&self) -> &ResourceTable {
        &self.inner.resources
    }

    pub fn capabilities(&self) -> &AudioCapabilities {
        &self.inner.capabilities
    }

    pub fn policy(&self) -> LoadPolicy {
        self.inner.policy
    }

    pub fn paths(&self) -> AssetPaths {
        self.inner.paths.borrow().clone()
    }

    /// Replace the URL prefixes used by later loads.
    pub fn set_paths(&self, paths: AssetPaths) {
        *self.inner.paths.borrow_mut() = paths;
    }

    pub(crate) fn resolve_url(&self, kind: AssetKind, locator: &str) -> String {
        self.inner.paths.borrow().resolve(kind, locator)
    }

    /// Register one or more empty bundles.
    ///
    /// Fails with [`AssetError::DuplicateBundle`] at the first name that exists
    /// already; names before it in the call stay registered.
    pub fn create_bundle(&self, names: impl Into<BundleNames>) -> AssetResult<()> {
        self.inner.bundles.borrow_mut().create(&names.into())
    }

    /// Merge asset specs into an existing bundle.
    pub fn add_bundle_asset<I, K, V>(&self, bundle: &str, assets: I) -> AssetResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AssetSpec>,
    {
        self.inner
            .bundles
            .borrow_mut()
            .add_assets(bundle, spec_map(assets))
    }

    pub fn bundle_status(&self, name: &str) -> Option<BundleStatus> {
        self.inner.bundles.borrow().status(name)
    }

    /// A snapshot of a bundle.
    pub fn bundle(&self, name: &str) -> Option<Bundle> {
        self.inner.bundles.borrow().get(name).cloned()
    }

    /// Bundle names in creation order.
    pub fn bundle_names(&self) -> Vec<String> {
        self.inner.bundles.borrow().names()
    }

    /// Load a batch of assets, classifying each by extension.
    ///
    /// Fulfils with every value keyed by name once all succeed, or rejects
    /// with the first failure. Progress reports `{loaded, total}` once per
    /// completed asset; deferred audio is not counted. An empty batch fulfils
    /// immediately.
    pub fn load_assets<I, K, V>(&self, assets: I) -> AssetPromise<LoadedAssets>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AssetSpec>,
    {
        self.dispatch_all(&spec_map(assets))
    }

    fn dispatch_all(&self, assets: &SpecMap) -> AssetPromise<LoadedAssets> {
        profile_function!();
        let scheduler = &self.inner.scheduler;
        let aggregate = scheduler.defer::<LoadedAssets, AssetError>();
        if assets.is_empty() {
            aggregate.resolve(LoadedAssets::new());
            return aggregate.promise();
        }

        let total = self.tracked_count(assets);
        let loaded = Rc::new(Cell::new(0usize));
        tracing::debug!(assets = assets.len(), total, "loading assets");

        let mut members = IndexMap::with_capacity(assets.len());
        for (name, spec) in assets {
            let mut promise = self.dispatch(name, spec);
            if !self.skips_progress(spec) {
                let loaded = Rc::clone(&loaded);
                let progress = aggregate.clone();
                promise = promise.map(move |value| {
                    loaded.set(loaded.get() + 1);
                    progress.notify(Progress::new(loaded.get(), total));
                    value
                });
            }
            members.insert(name.clone(), Next::Promise(promise));
        }

        let on_ok = aggregate.clone();
        let on_err = aggregate.clone();
        scheduler.all_keyed(members).then_or_else(
            move |values| {
                on_ok.resolve(values);
                Ok(Next::Value(()))
            },
            move |error| {
                on_err.reject(error);
                Ok(Next::Value(()))
            },
        );
        aggregate.promise()
    }

    /// Start the load for one spec.
    fn dispatch(&self, name: &str, spec: &AssetSpec) -> AssetPromise<Option<Resource>> {
        let locator = match spec {
            AssetSpec::Candidates(_) => {
                return self
                    .load_audio(spec.clone(), Some(name))
                    .map(|audio| Some(Resource::Audio(audio)));
            }
            AssetSpec::Single(locator) => locator,
        };

        match classify(locator) {
            Some(AssetKind::Image) => self
                .load_image(locator, Some(name))
                .map(|image| Some(Resource::Image(image))),
            Some(AssetKind::Audio) => self
                .load_audio(locator.as_str(), Some(name))
                .map(|audio| Some(Resource::Audio(audio))),
            Some(AssetKind::Script) => self.load_script(locator, Some(name)).map(|()| None),
            Some(AssetKind::Stylesheet) => {
                self.load_stylesheet(locator, Some(name)).map(|()| None)
            }
            Some(AssetKind::Data) => self
                .load_data(locator, Some(name), DataFormat::Auto)
                .map(|data| Some(Resource::Data(data))),
            None => {
                tracing::warn!(name, locator = locator.as_str(), "unsupported asset type");
                self.inner.scheduler.rejected(AssetError::UnsupportedType {
                    name: name.to_string(),
                    locator: locator.clone(),
                })
            }
        }
    }

    fn is_audio(spec: &AssetSpec) -> bool {
        match spec {
            AssetSpec::Candidates(_) => true,
            AssetSpec::Single(locator) => classify(locator) == Some(AssetKind::Audio),
        }
    }

    /// Audio handed out early produces no progress. Unplayable audio still
    /// rejects and so still counts.
    fn skips_progress(&self, spec: &AssetSpec) -> bool {
        self.inner.policy.defer_audio_until_interaction
            && Self::is_audio(spec)
            && self.inner.capabilities.negotiate(spec.locators()).is_some()
    }

    fn tracked_count(&self, assets: &SpecMap) -> usize {
        assets
            .values()
            .filter(|spec| !self.skips_progress(spec))
            .count()
    }

    /// Load one or more bundles.
    ///
    /// Every name is checked first; an unknown name rejects with
    /// [`AssetError::BundleNotFound`] and nothing is dispatched. Bundles are
    /// marked [`Loading`](BundleStatus::Loading) on dispatch and
    /// [`Loaded`](BundleStatus::Loaded) once every bundle succeeds. A failure
    /// leaves them `Loading`.
    ///
    /// Progress reports one step per completed asset across all bundles, with
    /// `total` summed over the bundles.
    pub fn load_bundle(&self, names: impl Into<BundleNames>) -> AssetPromise<()> {
        profile_function!();
        let names = names.into().into_vec();
        let scheduler = &self.inner.scheduler;

        let specs: Vec<SpecMap> = {
            let registry = self.inner.bundles.borrow();
            let mut specs = Vec::with_capacity(names.len());
            for name in &names {
                match registry.get(name) {
                    Some(bundle) => specs.push(bundle.assets().clone()),
                    None => {
                        tracing::warn!(bundle = name.as_str(), "bundle has not been created");
                        return scheduler.rejected(AssetError::BundleNotFound {
                            bundle: name.clone(),
                        });
                    }
                }
            }
            specs
        };

        {
            let mut registry = self.inner.bundles.borrow_mut();
            for name in &names {
                registry.set_status(name, BundleStatus::Loading);
            }
        }

        let total: usize = specs.iter().map(|assets| self.tracked_count(assets)).sum();
        tracing::debug!(bundles = ?names, total, "loading bundles");
        let members: Vec<Next<LoadedAssets, AssetError>> = specs
            .iter()
            .map(|assets| Next::Promise(self.dispatch_all(assets)))
            .collect();

        let deferred = scheduler.defer::<(), AssetError>();
        let on_ok = deferred.clone();
        let on_err = deferred.clone();
        let on_progress = deferred.clone();
        let mut loaded = 0usize;
        let manager = self.clone();
        scheduler.all(members).then_with_progress(
            move |_| {
                let mut registry = manager.inner.bundles.borrow_mut();
                for name in &names {
                    registry.set_status(name, BundleStatus::Loaded);
                }
                drop(registry);
                tracing::debug!(bundles = ?names, "bundles loaded");
                on_ok.resolve(());
                Ok(Next::Value(()))
            },
            move |error| {
                tracing::warn!(%error, "bundle load failed");
                on_err.reject(error);
                Ok(Next::Value(()))
            },
            move |_| {
                loaded += 1;
                on_progress.notify(Progress::new(loaded, total));
            },
        );
        deferred.promise()
    }

    /// A step that rejects the child without reporting a thrown error.
    pub(crate) fn reject_with<T: Value>(&self, error: AssetError) -> Step<T, AssetError> {
        Ok(Next::Promise(self.inner.scheduler.rejected(error)))
    }
}

impl fmt::Debug for AssetManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetManager")
            .field("paths", &*self.inner.paths.borrow())
            .field("policy", &self.inner.policy)
            .field("bundles", &self.inner.bundles.borrow().len())
            .field("resources", &self.inner.resources.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::io::MemoryIo;

    fn manager_with(io: Rc<MemoryIo>, config: LoaderConfig) -> AssetManager {
        AssetManager::new(
            Scheduler::new(),
            io,
            AudioCapabilities::new(["mp3", "ogg"]),
            config,
        )
    }

    fn recorded_progress(promise: &AssetPromise<impl Clone + 'static>) -> Rc<RefCell<Vec<Progress>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        promise.on_progress(move |p| sink.borrow_mut().push(p));
        seen
    }

    #[test]
    fn test_create_bundle_duplicate() {
        let manager = manager_with(Rc::new(MemoryIo::new()), LoaderConfig::default());
        manager.create_bundle(["a", "b"]).unwrap();
        let err = manager.create_bundle("a").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateBundle);
        assert_eq!(manager.bundle_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_add_bundle_asset_requires_bundle() {
        let manager = manager_with(Rc::new(MemoryIo::new()), LoaderConfig::default());
        let err = manager
            .add_bundle_asset("missing", [("hero", "hero.png")])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BundleNotFound);
    }

    #[test]
    fn test_load_assets_keys_values_by_name() {
        let io = Rc::new(MemoryIo::new());
        io.insert("hero.png", b"px".to_vec());
        io.insert("level.json", r#"{"width": 3}"#);
        io.insert("game.js", "run()");
        let manager = manager_with(io, LoaderConfig::default());

        let promise = manager.load_assets([
            ("hero", "hero.png"),
            ("level", "level.json"),
            ("game", "game.js"),
        ]);
        manager.scheduler().run_until_idle();

        let loaded = promise.outcome().unwrap().unwrap();
        assert_eq!(loaded.keys().collect::<Vec<_>>(), vec!["hero", "level", "game"]);
        assert!(loaded["hero"].as_ref().is_some_and(|r| r.as_image().is_some()));
        assert!(loaded["game"].is_none());
        let json = manager.resources().data("level");
        assert_eq!(
            json.as_ref().and_then(|d| d.as_json()).map(|v| v["width"].clone()),
            Some(serde_json::json!(3))
        );
    }

    #[test]
    fn test_load_assets_empty_fulfils() {
        let manager = manager_with(Rc::new(MemoryIo::new()), LoaderConfig::default());
        let promise = manager.load_assets(Vec::<(String, AssetSpec)>::new());
        assert_eq!(promise.outcome(), Some(Ok(LoadedAssets::new())));
    }

    #[test]
    fn test_unsupported_type_rejects_batch() {
        let io = Rc::new(MemoryIo::new());
        io.insert("hero.png", b"px".to_vec());
        let manager = manager_with(io, LoaderConfig::default());

        let promise = manager.load_assets([("hero", "hero.png"), ("map", "map.tmx")]);
        manager.scheduler().run_until_idle();

        let err = promise.outcome().unwrap().unwrap_err();
        assert_eq!(
            err,
            AssetError::UnsupportedType {
                name: "map".into(),
                locator: "map.tmx".into()
            }
        );
    }

    #[test]
    fn test_progress_counts_each_asset() {
        let io = Rc::new(MemoryIo::new());
        io.insert("a.png", b"a".to_vec());
        io.insert("b.png", b"b".to_vec());
        io.insert("c.json", "[]");
        let manager = manager_with(io, LoaderConfig::default());

        let promise = manager.load_assets([("a", "a.png"), ("b", "b.png"), ("c", "c.json")]);
        let seen = recorded_progress(&promise);
        manager.scheduler().run_until_idle();

        assert_eq!(
            *seen.borrow(),
            vec![Progress::new(1, 3), Progress::new(2, 3), Progress::new(3, 3)]
        );
    }

    #[test]
    fn test_deferred_audio_excluded_from_progress() {
        let io = Rc::new(MemoryIo::new());
        io.insert("a.png", b"a".to_vec());
        let manager = manager_with(io, LoaderConfig::new().defer_audio_until_interaction(true));

        // The audio bytes never arrive; the clip is handed out regardless.
        let promise = manager.load_assets([
            ("a", AssetSpec::from("a.png")),
            ("music", AssetSpec::from(["music.wav", "music.ogg"])),
        ]);
        let seen = recorded_progress(&promise);
        manager.scheduler().run_until_idle();

        let loaded = promise.outcome().unwrap().unwrap();
        let audio = loaded["music"].as_ref().and_then(|r| r.as_audio()).cloned();
        assert_eq!(audio.map(|a| (a.url().to_string(), a.is_buffered())), Some(("music.ogg".into(), false)));
        assert_eq!(*seen.borrow(), vec![Progress::new(1, 1)]);
    }

    #[test]
    fn test_load_bundle_unknown_name_changes_nothing() {
        let manager = manager_with(Rc::new(MemoryIo::new()), LoaderConfig::default());
        manager.create_bundle("ui").unwrap();

        let promise = manager.load_bundle(["ui", "ghost"]);
        manager.scheduler().run_until_idle();

        let err = promise.outcome().unwrap().unwrap_err();
        assert_eq!(err, AssetError::BundleNotFound { bundle: "ghost".into() });
        assert_eq!(manager.bundle_status("ui"), Some(BundleStatus::Created));
    }

    #[test]
    fn test_load_bundle_status_lifecycle() {
        let io = Rc::new(MemoryIo::new());
        io.insert("hero.png", b"px".to_vec());
        let manager = manager_with(io, LoaderConfig::default());
        manager.create_bundle("level1").unwrap();
        manager
            .add_bundle_asset("level1", [("hero", "hero.png")])
            .unwrap();

        let promise = manager.load_bundle("level1");
        assert_eq!(manager.bundle_status("level1"), Some(BundleStatus::Loading));

        manager.scheduler().run_until_idle();
        assert_eq!(promise.outcome(), Some(Ok(())));
        assert_eq!(manager.bundle_status("level1"), Some(BundleStatus::Loaded));
    }

    #[test]
    fn test_load_bundle_failure_stays_loading() {
        let io = Rc::new(MemoryIo::new());
        io.insert_failure("hero.png", "decode error");
        let manager = manager_with(io, LoaderConfig::default());
        manager.create_bundle("level1").unwrap();
        manager
            .add_bundle_asset("level1", [("hero", "hero.png")])
            .unwrap();

        let promise = manager.load_bundle("level1");
        manager.scheduler().run_until_idle();

        let err = promise.outcome().unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LoadFailed);
        assert_eq!(manager.bundle_status("level1"), Some(BundleStatus::Loading));
    }

    #[test]
    fn test_load_bundle_empty_bundle() {
        let manager = manager_with(Rc::new(MemoryIo::new()), LoaderConfig::default());
        manager.create_bundle("empty").unwrap();

        let promise = manager.load_bundle("empty");
        manager.scheduler().run_until_idle();
        assert_eq!(promise.outcome(), Some(Ok(())));
        assert!(manager.bundle_status("empty").is_some_and(|s| s.is_loaded()));
    }
}
