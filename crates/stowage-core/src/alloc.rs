//! Hash collections used across Stowage.
//!
//! Everything here is keyed by strings (URLs, asset names, extensions), so the
//! faster AHash hasher is used instead of SipHash.

pub use ahash::{AHashMap as HashMap, AHashSet as HashSet, RandomState};
