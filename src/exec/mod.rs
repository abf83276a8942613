// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`shell`] resolves a shell name to an interpreter on `PATH`.
//! - [`executor`] runs one command under that shell with
//!   `tokio::process::Command`, streaming or buffering its output.
//! - [`prep`] runs a block's one-shot prep commands in order and tracks the
//!   one currently in the foreground.

pub mod executor;
pub mod prep;
pub mod shell;

pub use executor::{ExecutionResult, ProcessFailure, ShellExecutor, ShellProcess};
pub use prep::{Foreground, PrepContext, run_preps};
pub use shell::{Shell, ShellKind};
