// src/exec/prep.rs

//! Sequential one-shot prep commands for a block.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tracing::{debug, error, info};

use crate::config::model::Block;
use crate::errors::{PenwatchError, Result};
use crate::exec::executor::{ShellExecutor, ShellProcess};
use crate::exec::shell::Shell;
use crate::expand::Expander;
use crate::logging::{OutputSink, OutputStream};
use crate::notify::{ERROR_TITLE, Notifier};
use crate::signals::Signal;
use crate::watch::changeset::ChangeSet;
use crate::watch::list::list;

/// The prep currently running in the foreground, if any.
///
/// The signal router uses this to forward fatal signals to a prep and to
/// force-kill it on escalation. Once [`Foreground::stop`] has been called no
/// further prep is started.
#[derive(Debug, Default)]
pub struct Foreground {
    current: Mutex<Option<Arc<ShellExecutor>>>,
    stopping: AtomicBool,
}

impl Foreground {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<Arc<ShellExecutor>>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn `executor` and register it, unless shutdown has begun.
    pub fn start(&self, executor: &Arc<ShellExecutor>) -> Result<ShellProcess> {
        let mut slot = self.slot();
        if self.is_stopping() {
            return Err(PenwatchError::ShutdownRequested);
        }
        let process = executor.spawn()?;
        *slot = Some(Arc::clone(executor));
        Ok(process)
    }

    pub fn finish(&self) {
        *self.slot() = None;
    }

    /// Forward `sig` to the running prep, if there is one.
    pub fn signal(&self, sig: Signal) {
        if let Some(executor) = self.slot().as_ref() {
            match executor.signal(sig) {
                Ok(()) | Err(PenwatchError::NoRunningProcess) => {}
                Err(e) => debug!(cmd = executor.command(), error = %e, "could not signal prep"),
            }
        }
    }

    /// Refuse further preps and forward `sig` to the running one.
    pub fn stop(&self, sig: Signal) {
        self.stopping.store(true, Ordering::SeqCst);
        self.signal(sig);
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }
}

/// Everything a prep sweep needs besides the block itself.
#[derive(Clone, Copy)]
pub struct PrepContext<'a> {
    pub expander: &'a Expander,
    /// Watch root; working directory for blocks without `indir`.
    pub root: &'a Path,
    pub sink: &'a dyn OutputSink,
    pub notifiers: &'a [Arc<dyn Notifier>],
    pub foreground: &'a Foreground,
}

/// Run `block`'s preps in order, stopping at the first failure.
///
/// `changes == None` means "no filesystem trigger": `@mods` is computed from
/// a listing of every currently matching file. With `initial` set, preps
/// marked `onchange` are skipped.
pub async fn run_preps(
    ctx: &PrepContext<'_>,
    block: &Block,
    changes: Option<&ChangeSet>,
    initial: bool,
) -> Result<()> {
    let shell = Shell::resolve(&ctx.expander.shell()?)?;

    let modified: Vec<PathBuf> = match changes {
        Some(cs) => cs.all(),
        None if block.prep.is_empty() => Vec::new(),
        None => {
            let patterns = ctx.expander.block_patterns(block)?;
            list(ctx.root, &patterns.includes, &patterns.excludes)?
        }
    };
    let workdir = ctx.expander.workdir(block, ctx.root)?;

    for prep in &block.prep {
        let cmd = ctx.expander.per_trigger(&prep.cmd, &modified, &workdir);
        if initial && prep.onchange {
            info!(cmd = %cmd.as_deref().unwrap_or(&prep.cmd), "skipping prep");
            continue;
        }
        run_proc(ctx, &shell, cmd?, &workdir).await?;
    }
    Ok(())
}

async fn run_proc(ctx: &PrepContext<'_>, shell: &Shell, cmd: String, workdir: &Path) -> Result<()> {
    info!(cmd = %cmd, dir = %workdir.display(), "prep");

    let executor = Arc::new(ShellExecutor::with_shell(shell.clone(), cmd, workdir));
    let process = ctx.foreground.start(&executor)?;
    let start = Instant::now();
    let result = process.wait(ctx.sink, true).await;
    ctx.foreground.finish();
    let result = result?;

    for line in result.err_output.lines() {
        ctx.sink.line(executor.command(), OutputStream::Stderr, line);
    }

    if let Some(failure) = result.error {
        error!(cmd = executor.command(), "{failure}");
        for notifier in ctx.notifiers {
            notifier.push(ERROR_TITLE, &result.err_output, "");
        }
        return Err(PenwatchError::ProcessExit {
            message: failure.to_string(),
            output: result.err_output,
        });
    }

    info!(cmd = executor.command(), ">> done ({:?})", start.elapsed());
    Ok(())
}
