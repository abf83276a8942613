// src/config/model.rs

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Deserialize;

use crate::signals::Signal;

/// Configuration as read from a TOML file, before signal names are resolved.
///
/// ```toml
/// [variables]
/// shell = "bash"
///
/// [[block]]
/// include = ["**/*.rs"]
///
/// [[block.prep]]
/// cmd = "cargo build"
///
/// [[block.daemon]]
/// cmd = "./target/debug/server"
/// signal = "sigterm"
/// signal_map = { sigint = "sigterm" }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    #[serde(default)]
    pub variables: BTreeMap<String, String>,

    #[serde(default)]
    pub block: Vec<RawBlock>,
}

/// `[[block]]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawBlock {
    #[serde(default)]
    pub include: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,

    /// Skip the default excludes for this block.
    #[serde(default)]
    pub noignore: bool,

    /// Working directory template for this block's commands.
    #[serde(default)]
    pub indir: Option<String>,

    #[serde(default)]
    pub prep: Vec<Prep>,

    #[serde(default)]
    pub daemon: Vec<RawDaemon>,
}

/// `[[block.daemon]]` section with signal names still as written.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawDaemon {
    pub cmd: String,

    /// Restart signal; `sighup` when omitted.
    #[serde(default)]
    pub signal: Option<String>,

    /// Received signal → signal delivered to this daemon.
    #[serde(default)]
    pub signal_map: BTreeMap<String, String>,
}

/// `[[block.prep]]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Prep {
    pub cmd: String,

    /// Skip this prep on the initial run.
    #[serde(default)]
    pub onchange: bool,
}

/// Validated configuration. Blocks are identified by position.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub blocks: Vec<Block>,
    pub variables: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct Block {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub noignore: bool,
    pub indir: Option<String>,
    pub prep: Vec<Prep>,
    pub daemon: Vec<Daemon>,
}

#[derive(Debug, Clone)]
pub struct Daemon {
    pub cmd: String,
    pub restart_signal: Signal,
    pub signal_map: HashMap<Signal, Signal>,
}

impl Daemon {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            restart_signal: Signal::Hup,
            signal_map: HashMap::new(),
        }
    }

    /// Signal to deliver to this daemon when the supervisor receives `sig`.
    pub fn mapped(&self, sig: Signal) -> Signal {
        self.signal_map.get(&sig).copied().unwrap_or(sig)
    }
}

impl Prep {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            onchange: false,
        }
    }
}

impl Config {
    /// Copy of the user variable table.
    pub fn variables(&self) -> BTreeMap<String, String> {
        self.variables.clone()
    }

    /// Sorted, de-duplicated union of every block's raw include patterns.
    pub fn include_patterns(&self) -> Vec<String> {
        self.blocks
            .iter()
            .flat_map(|b| b.include.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
