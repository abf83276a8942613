// src/daemon/world.rs

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::config::model::Config;
use crate::daemon::pen::DaemonPen;
use crate::errors::Result;
use crate::exec::shell::Shell;
use crate::expand::Expander;
use crate::logging::OutputSink;
use crate::signals::Signal;

/// One [`DaemonPen`] per config block, indexed by block position.
#[derive(Debug)]
pub struct DaemonWorld {
    pens: Vec<DaemonPen>,
}

impl DaemonWorld {
    /// One pen per block. Only a missing shell is fatal; a block whose
    /// daemon templates cannot be expanded gets an empty pen.
    pub fn new(
        config: &Config,
        expander: &Expander,
        root: &Path,
        sink: Arc<dyn OutputSink>,
    ) -> Result<Self> {
        let shell = Shell::resolve(&expander.shell()?)?;
        let pens = config
            .blocks
            .iter()
            .enumerate()
            .map(|(i, block)| {
                match DaemonPen::new(i, block, expander, &shell, root, Arc::clone(&sink)) {
                    Ok(pen) => pen,
                    Err(e) => {
                        error!(block = i, error = %e, "could not set up daemons, block runs without them");
                        DaemonPen::empty(i, &shell, root, Arc::clone(&sink))
                    }
                }
            })
            .collect();
        Ok(Self { pens })
    }

    pub fn len(&self) -> usize {
        self.pens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pens.is_empty()
    }

    pub fn pen(&self, index: usize) -> Option<&DaemonPen> {
        self.pens.get(index)
    }

    pub async fn restart(&self, index: usize) {
        match self.pens.get(index) {
            Some(pen) => pen.restart().await,
            None => warn!(block = index, "no daemon pen for block"),
        }
    }

    /// Forward `sig` to every pen without waiting.
    pub fn signal(&self, sig: Signal) {
        debug!(signal = %sig, "forwarding signal to daemons");
        for pen in &self.pens {
            pen.signal(sig);
        }
    }

    /// Deliver `sig` to every pen first, then wait for every pen.
    pub async fn shutdown(&self, sig: Signal) {
        debug!(signal = %sig, "shutting down daemons");
        for pen in &self.pens {
            pen.begin_shutdown(sig);
        }
        for pen in &self.pens {
            pen.wait_stopped().await;
        }
    }
}
