// src/watch/changeset.rs

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::errors::Result;
use crate::watch::patterns::PathMatcher;

/// A sorted, de-duplicated set of changed absolute paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    paths: BTreeSet<PathBuf>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: PathBuf) {
        self.paths.insert(path);
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    /// All paths, in sorted order.
    pub fn all(&self) -> Vec<PathBuf> {
        self.paths.iter().cloned().collect()
    }

    /// The subset of paths selected by `includes`/`excludes` evaluated
    /// relative to `root`.
    pub fn filter(&self, root: &Path, includes: &[String], excludes: &[String]) -> Result<ChangeSet> {
        let matcher = PathMatcher::new(root, includes, excludes)?;
        Ok(self.filter_with(&matcher))
    }

    pub fn filter_with(&self, matcher: &PathMatcher) -> ChangeSet {
        self.paths
            .iter()
            .filter(|p| matcher.is_match(p))
            .cloned()
            .collect()
    }
}

impl FromIterator<PathBuf> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().collect(),
        }
    }
}

impl Extend<PathBuf> for ChangeSet {
    fn extend<I: IntoIterator<Item = PathBuf>>(&mut self, iter: I) {
        self.paths.extend(iter);
    }
}
