// src/config/validate.rs

use std::collections::HashMap;
use std::path::Path;

use crate::config::model::{Block, Config, Daemon, RawBlock, RawConfig, RawDaemon};
use crate::errors::{PenwatchError, Result};
use crate::signals::{Signal, SignalTable};

/// Builtin variable names users may not define.
///
/// `shell` is a builtin too, but only as a default; defining it in
/// `[variables]` is how a config picks its shell.
pub const RESERVED_VARIABLES: &[&str] = &["confdir", "confpath", "mods", "dirmods"];

/// Resolve signal names and check variable names, producing a [`Config`].
///
/// `path` is only used to label errors.
pub fn validate_config(path: &Path, raw: RawConfig, signals: &SignalTable) -> Result<Config> {
    validate_variables(path, &raw)?;

    let blocks = raw
        .block
        .into_iter()
        .map(|b| validate_block(path, b, signals))
        .collect::<Result<Vec<_>>>()?;

    Ok(Config {
        blocks,
        variables: raw.variables,
    })
}

fn validate_variables(path: &Path, raw: &RawConfig) -> Result<()> {
    for name in raw.variables.keys() {
        if RESERVED_VARIABLES.contains(&name.as_str()) {
            return Err(PenwatchError::config(
                path,
                format!("{name:?} is a built-in variable, may not be overridden"),
            ));
        }
    }
    Ok(())
}

fn validate_block(path: &Path, raw: RawBlock, signals: &SignalTable) -> Result<Block> {
    let daemon = raw
        .daemon
        .into_iter()
        .map(|d| validate_daemon(path, d, signals))
        .collect::<Result<Vec<_>>>()?;

    Ok(Block {
        include: raw.include,
        exclude: raw.exclude,
        noignore: raw.noignore,
        indir: raw.indir.filter(|s| !s.is_empty()),
        prep: raw.prep,
        daemon,
    })
}

fn validate_daemon(path: &Path, raw: RawDaemon, signals: &SignalTable) -> Result<Daemon> {
    let lookup = |name: &str| -> Result<Signal> {
        signals
            .lookup(name)
            .map_err(|e| PenwatchError::config(path, e))
    };

    let restart_signal = match raw.signal.as_deref() {
        Some(name) => lookup(name)?,
        None => Signal::Hup,
    };

    let mut signal_map = HashMap::with_capacity(raw.signal_map.len());
    for (from, to) in &raw.signal_map {
        signal_map.insert(lookup(from)?, lookup(to)?);
    }

    Ok(Daemon {
        cmd: raw.cmd,
        restart_signal,
        signal_map,
    })
}
