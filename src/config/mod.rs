// src/config/mod.rs

//! Configuration loading and validation for penwatch.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Resolve signal names and reject reserved variables (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, parse};
pub use model::{Block, Config, Daemon, Prep};
pub use validate::{RESERVED_VARIABLES, validate_config};
