#![allow(dead_code)]

use std::path::{Path, PathBuf};

pub use penwatch_test_utils::builders::{BlockBuilder, ConfigBuilder};
pub use penwatch_test_utils::capture::{CaptureSink, RecordingNotifier};
pub use penwatch_test_utils::{eventually, init_tracing, with_timeout};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Write `text` to `name` inside `dir` and return the full path.
pub fn write_file(dir: &Path, name: &str, text: &str) -> std::io::Result<PathBuf> {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, text)?;
    Ok(path)
}

/// Canonical form of a temp directory, so paths compare equal to the ones
/// the watcher and lister produce.
pub fn canonical(dir: &Path) -> PathBuf {
    dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf())
}
