// src/watch/mod.rs

//! File watching and path matching.
//!
//! This module is responsible for:
//! - Compiling include/exclude glob patterns (`patterns`).
//! - The change-set type handed to the orchestration loop (`changeset`).
//! - Wiring up a cross-platform filesystem watcher with a lull window
//!   (`watcher`) and a static lister for runs without a trigger (`list`).
//!
//! It knows nothing about preps or daemons; it only turns filesystem
//! changes into change-sets.

pub mod changeset;
pub mod list;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use changeset::ChangeSet;
pub use list::list;
pub use patterns::{DEFAULT_EXCLUDES, PathMatcher, PatternSet};
pub use watcher::{WatchHandle, watch};
