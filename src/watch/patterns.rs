// src/watch/patterns.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Context;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::errors::Result;
use crate::watch::path_utils::{relative_str, slashed};

/// Patterns appended to every block's excludes unless the block sets
/// `noignore = true`.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "**/.git/**",
    "**/.hg/**",
    "**/.svn/**",
    "**/.bzr/**",
    "**/.DS_Store/**",
    "**.tmp",
    "**~",
    "**#",
    "**.bak",
    "**.swp",
    "**.___jb_old___",
    "**.___jb_bak___",
    "**mage_output_file.go",
    "**.py[cod]",
    "**/node_modules/**",
];

/// Fully expanded include/exclude lists for one block (or for the watcher as
/// a whole).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternSet {
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
}

/// Compiled include/exclude globs anchored at a root directory.
///
/// Relative patterns are matched against the path relative to `root`;
/// absolute patterns are matched against the absolute path. An empty include
/// list matches everything.
#[derive(Clone)]
pub struct PathMatcher {
    root: PathBuf,
    includes: Option<Globs>,
    excludes: Option<Globs>,
}

impl fmt::Debug for PathMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathMatcher")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl PathMatcher {
    pub fn new(root: &Path, includes: &[String], excludes: &[String]) -> Result<Self> {
        Ok(Self {
            root: root.to_path_buf(),
            includes: Globs::compile(includes).context("building include globset")?,
            excludes: Globs::compile(excludes).context("building exclude globset")?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// True if `path` (absolute, or relative to the root) is included and
    /// not excluded.
    pub fn is_match(&self, path: &Path) -> bool {
        let abs = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        let rel = relative_str(&self.root, &abs);
        let abs = slashed(&abs);

        if let Some(inc) = &self.includes {
            if !inc.is_match(rel.as_deref(), &abs) {
                return false;
            }
        }
        if let Some(exc) = &self.excludes {
            if exc.is_match(rel.as_deref(), &abs) {
                return false;
            }
        }
        true
    }
}

#[derive(Clone)]
struct Globs {
    relative: GlobSet,
    absolute: GlobSet,
}

impl Globs {
    fn compile(patterns: &[String]) -> anyhow::Result<Option<Self>> {
        if patterns.is_empty() {
            return Ok(None);
        }
        let mut relative = GlobSetBuilder::new();
        let mut absolute = GlobSetBuilder::new();
        for pat in patterns {
            let normalised = normalise_glob(&slashed(Path::new(pat)));
            let glob = GlobBuilder::new(&normalised)
                .literal_separator(true)
                .build()
                .with_context(|| format!("invalid glob pattern: {pat}"))?;
            if Path::new(pat).is_absolute() {
                absolute.add(glob);
            } else {
                relative.add(glob);
            }
        }
        Ok(Some(Self {
            relative: relative.build()?,
            absolute: absolute.build()?,
        }))
    }

    fn is_match(&self, rel: Option<&str>, abs: &str) -> bool {
        rel.is_some_and(|r| self.relative.is_match(r)) || self.absolute.is_match(abs)
    }
}

/// Rewrite a `**` glued to a following name (`**.tmp`, `**~`) into
/// `**/*.tmp` so that it matches at any depth under separator-aware globbing.
pub fn normalise_glob(pat: &str) -> String {
    let mut out = String::with_capacity(pat.len() + 4);
    let mut rest = pat;
    while let Some(idx) = rest.find("**") {
        out.push_str(&rest[..idx]);
        let at_segment_start = out.is_empty() || out.ends_with('/');
        out.push_str("**");
        let after = &rest[idx + 2..];
        if at_segment_start && !after.is_empty() && !after.starts_with('/') {
            out.push_str("/*");
        }
        rest = after;
    }
    out.push_str(rest);
    out
}
