// src/watch/list.rs

use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::errors::Result;
use crate::watch::patterns::PathMatcher;

/// Walk `root` and return every file selected by `includes`/`excludes`, as
/// absolute paths in sorted order.
///
/// Used in place of a change-set when preps run without a filesystem trigger
/// (initial run, `--prep`).
pub fn list(root: &Path, includes: &[String], excludes: &[String]) -> Result<Vec<PathBuf>> {
    let matcher = PathMatcher::new(root, includes, excludes)?;
    list_with(&matcher)
}

pub fn list_with(matcher: &PathMatcher) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(matcher.root()).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        if matcher.is_match(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn lists_matching_files_only() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        fs::create_dir_all(dir.path().join("src/nested"))?;
        fs::create_dir_all(dir.path().join(".git"))?;
        fs::write(dir.path().join("src/a.rs"), "")?;
        fs::write(dir.path().join("src/nested/b.rs"), "")?;
        fs::write(dir.path().join("src/readme.md"), "")?;
        fs::write(dir.path().join(".git/c.rs"), "")?;

        let files = list(
            dir.path(),
            &["**/*.rs".to_string()],
            &["**/.git/**".to_string()],
        )?;

        assert_eq!(
            files,
            vec![
                dir.path().join("src/a.rs"),
                dir.path().join("src/nested/b.rs"),
            ]
        );
        Ok(())
    }
}
