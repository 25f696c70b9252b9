//! Stowage Core
//!
//! Shared utilities for the Stowage crates: hashed collections, logging setup and
//! optional profiling scopes.

pub mod alloc;
pub mod logging;
pub mod profiling;
