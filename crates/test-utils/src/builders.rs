#![allow(dead_code)]

use std::collections::BTreeMap;

use penwatch::config::{Block, Config, Daemon, Prep};
use penwatch::signals::Signal;

/// Builder for a validated `Config`, skipping the TOML round trip.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    blocks: Vec<Block>,
    variables: BTreeMap<String, String>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn variable(mut self, name: &str, value: &str) -> Self {
        self.variables.insert(name.to_string(), value.to_string());
        self
    }

    pub fn block(mut self, block: BlockBuilder) -> Self {
        self.blocks.push(block.build());
        self
    }

    pub fn build(self) -> Config {
        Config {
            blocks: self.blocks,
            variables: self.variables,
        }
    }
}

/// Builder for one `Block`.
#[derive(Debug, Default)]
pub struct BlockBuilder {
    block: Block,
}

impl BlockBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include(mut self, pattern: &str) -> Self {
        self.block.include.push(pattern.to_string());
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.block.exclude.push(pattern.to_string());
        self
    }

    pub fn noignore(mut self, val: bool) -> Self {
        self.block.noignore = val;
        self
    }

    pub fn indir(mut self, dir: &str) -> Self {
        self.block.indir = Some(dir.to_string());
        self
    }

    pub fn prep(mut self, cmd: &str) -> Self {
        self.block.prep.push(Prep::new(cmd));
        self
    }

    pub fn onchange_prep(mut self, cmd: &str) -> Self {
        self.block.prep.push(Prep {
            cmd: cmd.to_string(),
            onchange: true,
        });
        self
    }

    pub fn daemon(mut self, cmd: &str) -> Self {
        self.block.daemon.push(Daemon::new(cmd));
        self
    }

    /// Daemon restarted with `restart` and with `map` applied to forwarded
    /// signals.
    pub fn daemon_with(mut self, cmd: &str, restart: Signal, map: &[(Signal, Signal)]) -> Self {
        let mut daemon = Daemon::new(cmd);
        daemon.restart_signal = restart;
        daemon.signal_map = map.iter().copied().collect();
        self.block.daemon.push(daemon);
        self
    }

    pub fn build(self) -> Block {
        self.block
    }
}
