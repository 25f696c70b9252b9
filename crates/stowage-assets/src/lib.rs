//! Bundle and manifest driven resource loading.
//!
//! An [`AssetManager`] classifies locators by extension, dispatches them to a
//! per-kind loader over a callback-based [`AssetIo`] platform, stores results
//! in a shared [`ResourceTable`], and reports each batch through a
//! [`Promise`](stowage_promise::Promise) carrying `{loaded, total}` progress.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use stowage_assets::prelude::*;
//!
//! let io = Rc::new(MemoryIo::new());
//! io.insert("hero.png", b"png bytes".to_vec());
//!
//! let manager = AssetManager::new(
//!     Scheduler::new(),
//!     io,
//!     AudioCapabilities::new(["ogg"]),
//!     LoaderConfig::default(),
//! );
//! manager.create_bundle("level1").unwrap();
//! manager.add_bundle_asset("level1", [("hero", "hero.png")]).unwrap();
//!
//! let loaded = manager.load_bundle("level1");
//! manager.scheduler().run_until_idle();
//!
//! assert_eq!(loaded.outcome(), Some(Ok(())));
//! assert!(manager.resources().image("hero").is_some());
//! ```

pub mod audio;
pub mod bundle;
pub mod config;
pub mod error;
pub mod io;
pub mod kind;
pub mod loaders;
pub mod manager;
pub mod manifest;
pub mod resource;

pub use audio::AudioCapabilities;
pub use bundle::{AssetSpec, Bundle, BundleNames, BundleRegistry, BundleStatus, SpecMap, spec_map};
pub use config::{AssetPaths, LoadPolicy, LoaderConfig};
pub use error::{AssetError, AssetResult, ErrorKind};
pub use io::{AssetIo, Completion, FileIo, IoFailure, MemoryIo};
pub use kind::{AssetKind, SUPPORTED_EXTENSIONS, asset_name, classify, extension};
pub use loaders::DataFormat;
pub use manager::{AssetManager, AssetPromise, LoadedAssets};
pub use manifest::{LoadBundles, Manifest, ManifestBundle};
pub use resource::{Audio, DataValue, Image, Resource, ResourceTable};

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        AssetError, AssetIo, AssetKind, AssetManager, AssetPaths, AssetSpec, AudioCapabilities,
        BundleStatus, DataFormat, DataValue, FileIo, LoaderConfig, MemoryIo, Resource,
    };
    pub use stowage_promise::{Next, Progress, Promise, Scheduler};
}
