//! Stowage - promise-based asset loading
//!
//! Stowage loads images, audio, scripts, stylesheets and data documents
//! through a small, single-threaded promise core:
//!
//! - **Promises**: deferred results with fulfilment, rejection and progress
//!   channels, driven by an explicit [`Scheduler`]
//! - **Bundles**: named groups of assets loaded together with aggregate progress
//! - **Manifests**: JSON documents declaring paths and bundles
//!
//! # Quick Start
//!
//! ```
//! use std::rc::Rc;
//! use stowage::prelude::*;
//!
//! let io = Rc::new(MemoryIo::new());
//! io.insert("level.json", r#"{"width": 16}"#);
//!
//! let manager = AssetManager::new(
//!     Scheduler::new(),
//!     io,
//!     AudioCapabilities::none(),
//!     LoaderConfig::default(),
//! );
//! let loaded = manager.load_assets([("level", "level.json")]);
//! manager.scheduler().run_until_idle();
//!
//! assert!(loaded.outcome().is_some_and(|r| r.is_ok()));
//! ```

// Re-export core types
pub use stowage_core as core;
pub use stowage_core::logging;
pub use stowage_promise as promise;
pub use stowage_promise::{Deferred, Next, Progress, Promise, Scheduler, Step};

#[cfg(feature = "assets")]
pub use stowage_assets as assets;

#[cfg(feature = "assets")]
pub use stowage_assets::{
    AssetError, AssetManager, AssetPromise, AssetSpec, AudioCapabilities, BundleStatus,
    LoaderConfig, Resource, ResourceTable,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use stowage_promise::{Deferred, Next, Progress, Promise, Scheduler, Step};

    // Asset types
    #[cfg(feature = "assets")]
    pub use stowage_assets::prelude::*;
    #[cfg(feature = "assets")]
    pub use stowage_assets::{AssetPromise, ResourceTable};
}
