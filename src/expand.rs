// src/expand.rs

//! `@name` variable expansion for commands, patterns and directories.
//! Names are ASCII word characters.
//!
//! A run of backslashes immediately before `@` is halved in the output; an
//! odd count leaves `@name` unexpanded. User variables are themselves
//! expanded (depth-first, with cycle detection), builtins are substituted
//! verbatim.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::config::model::Block;
use crate::errors::{PenwatchError, Result};
use crate::watch::path_utils::{absolutize, clean_path, relative_to, slashed};
use crate::watch::patterns::{DEFAULT_EXCLUDES, PatternSet};

static VAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\\*)@([A-Za-z0-9_]+)").expect("variable pattern is valid"));

#[cfg(windows)]
pub const DEFAULT_SHELL: &str = "powershell";
#[cfg(not(windows))]
pub const DEFAULT_SHELL: &str = "sh";

/// Expand `template` against `user` variables, falling back to `builtins`.
pub fn expand(
    template: &str,
    user: &BTreeMap<String, String>,
    builtins: &BTreeMap<&str, String>,
) -> Result<String> {
    let mut active = HashSet::new();
    expand_inner(template, user, builtins, &mut active)
}

fn expand_inner<'a>(
    s: &str,
    user: &'a BTreeMap<String, String>,
    builtins: &BTreeMap<&str, String>,
    active: &mut HashSet<&'a str>,
) -> Result<String> {
    let mut out = String::with_capacity(s.len());
    let mut last = 0;

    for caps in VAR_PATTERN.captures_iter(s) {
        let (Some(whole), Some(slashes), Some(name)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        out.push_str(&s[last..whole.start()]);
        last = whole.end();

        let n = slashes.as_str().len();
        out.push_str(&"\\".repeat(n / 2));
        let name = name.as_str();

        if n % 2 == 1 {
            out.push('@');
            out.push_str(name);
            continue;
        }

        if active.contains(name) {
            return Err(PenwatchError::RecursiveVariable(name.to_string()));
        }
        if let Some((key, value)) = user.get_key_value(name) {
            active.insert(key.as_str());
            let expanded = expand_inner(value, user, builtins, active);
            active.remove(key.as_str());
            out.push_str(&expanded?);
        } else if let Some(value) = builtins.get(name) {
            out.push_str(value);
        } else {
            return Err(PenwatchError::UndefinedVariable(name.to_string()));
        }
    }

    out.push_str(&s[last..]);
    Ok(out)
}

/// Variables of one loaded config plus the directory it was read from.
#[derive(Debug, Clone)]
pub struct Expander {
    vars: BTreeMap<String, String>,
    confdir: PathBuf,
}

impl Expander {
    pub fn new(vars: BTreeMap<String, String>, confdir: impl Into<PathBuf>) -> Self {
        Self {
            vars,
            confdir: confdir.into(),
        }
    }

    /// Expander for a config read from `conf_path`.
    pub fn for_config(config: &crate::config::Config, conf_path: &Path) -> Self {
        let confdir = match conf_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self::new(config.variables(), confdir)
    }

    pub fn confdir(&self) -> &Path {
        &self.confdir
    }

    fn globals(&self) -> BTreeMap<&'static str, String> {
        let confdir = slashed(&self.confdir);
        BTreeMap::from([
            ("shell", DEFAULT_SHELL.to_string()),
            ("confpath", confdir.clone()),
            ("confdir", confdir),
        ])
    }

    /// Expansion without `@mods`/`@dirmods`: patterns, directories, daemons.
    pub fn global(&self, template: &str) -> Result<String> {
        expand(template, &self.vars, &self.globals())
    }

    pub fn global_list(&self, templates: &[String]) -> Result<Vec<String>> {
        templates.iter().map(|t| self.global(t)).collect()
    }

    /// The configured shell name.
    pub fn shell(&self) -> Result<String> {
        self.global("@shell")
    }

    /// Expansion for a prep command triggered by `modified` (absolute
    /// paths). Paths beneath `workdir` are rendered relative to it.
    pub fn per_trigger(&self, template: &str, modified: &[PathBuf], workdir: &Path) -> Result<String> {
        let rel: Vec<PathBuf> = modified.iter().map(|p| relative_to(p, workdir)).collect();
        let mut builtins = self.globals();
        builtins.insert("mods", mk_args(&rel));
        builtins.insert("dirmods", mk_args(&containing_dirs(&rel)));
        expand(template, &self.vars, &builtins)
    }

    /// Expanded include/exclude lists for `block`, with the default excludes
    /// appended unless the block opts out.
    pub fn block_patterns(&self, block: &Block) -> Result<PatternSet> {
        let includes = self.global_list(&block.include)?;
        let mut excludes = self.global_list(&block.exclude)?;
        if !block.noignore {
            excludes.extend(DEFAULT_EXCLUDES.iter().map(|s| s.to_string()));
        }
        Ok(PatternSet { includes, excludes })
    }

    /// Working directory for `block`: its expanded `indir` resolved against
    /// `root`, or `root` itself.
    pub fn workdir(&self, block: &Block, root: &Path) -> Result<PathBuf> {
        match &block.indir {
            Some(indir) => {
                let dir = self.global(indir)?;
                Ok(absolutize(Path::new(&dir), root))
            }
            None => Ok(root.to_path_buf()),
        }
    }
}

/// Cleaned, forward-slash path that always reads as relative on a command
/// line: `.` becomes `./`, other relative paths gain a `./` prefix.
pub fn real_rel(path: &Path) -> String {
    let cleaned = clean_path(path);
    let s = slashed(&cleaned);
    if cleaned.is_absolute() {
        s
    } else if s == "." {
        "./".to_string()
    } else {
        format!("./{s}")
    }
}

/// Wrap in double quotes, escaping embedded double quotes.
pub fn quote_path(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\\\""))
}

/// Space-joined, quoted, really-relative rendering of `paths`.
pub fn mk_args(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| quote_path(&real_rel(p)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Sorted, de-duplicated parent directories of `paths`.
pub fn containing_dirs(paths: &[PathBuf]) -> Vec<PathBuf> {
    paths
        .iter()
        .map(|p| match p.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            Some(_) => PathBuf::from("."),
            None => p.clone(),
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
