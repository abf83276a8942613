// src/daemon/pen.rs

//! Per-block daemon supervisor.
//!
//! Each declared daemon gets a slot holding at most one live instance.
//! `restart` is serialised per slot on an async mutex so a replacement never
//! starts before its predecessor has exited; `signal` only touches a short
//! synchronous section and never waits.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::model::{Block, Daemon};
use crate::errors::{PenwatchError, Result};
use crate::exec::executor::ShellExecutor;
use crate::exec::shell::Shell;
use crate::expand::Expander;
use crate::logging::OutputSink;
use crate::signals::Signal;

/// Lifecycle of one daemon slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PenState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

struct RunningDaemon {
    executor: Arc<ShellExecutor>,
    task: JoinHandle<()>,
}

struct DaemonSlot {
    daemon: Daemon,
    command: String,
    current: tokio::sync::Mutex<Option<RunningDaemon>>,
    live: Mutex<Option<Arc<ShellExecutor>>>,
    state: Mutex<PenState>,
}

impl DaemonSlot {
    fn set_state(&self, state: PenState) {
        *guard(&self.state) = state;
    }

    fn state(&self) -> PenState {
        *guard(&self.state)
    }

    /// Deliver `sig` to the live instance, ignoring "nothing running".
    fn deliver(&self, sig: Signal) {
        if let Some(executor) = guard(&self.live).as_ref() {
            match executor.signal(sig) {
                Ok(()) | Err(PenwatchError::NoRunningProcess) => {}
                Err(e) => warn!(cmd = %self.command, signal = %sig, error = %e, "could not signal daemon"),
            }
        }
    }
}

/// Supervisor for the daemons of one block.
pub struct DaemonPen {
    index: usize,
    shell: Shell,
    workdir: PathBuf,
    sink: Arc<dyn OutputSink>,
    slots: Vec<Arc<DaemonSlot>>,
    closed: AtomicBool,
}

impl std::fmt::Debug for DaemonPen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DaemonPen")
            .field("index", &self.index)
            .field("daemons", &self.slots.len())
            .finish_non_exhaustive()
    }
}

impl DaemonPen {
    /// Build a pen for `block`. Daemon commands and the working directory
    /// are expanded here, once.
    pub fn new(
        index: usize,
        block: &Block,
        expander: &Expander,
        shell: &Shell,
        root: &std::path::Path,
        sink: Arc<dyn OutputSink>,
    ) -> Result<Self> {
        let workdir = expander.workdir(block, root)?;
        let slots = block
            .daemon
            .iter()
            .map(|daemon| -> Result<Arc<DaemonSlot>> {
                Ok(Arc::new(DaemonSlot {
                    command: expander.global(&daemon.cmd)?,
                    daemon: daemon.clone(),
                    current: tokio::sync::Mutex::new(None),
                    live: Mutex::new(None),
                    state: Mutex::new(PenState::Stopped),
                }))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            index,
            shell: shell.clone(),
            workdir,
            sink,
            slots,
            closed: AtomicBool::new(false),
        })
    }

    /// A pen with no daemons, for a block whose daemons could not be built.
    pub fn empty(
        index: usize,
        shell: &Shell,
        root: &std::path::Path,
        sink: Arc<dyn OutputSink>,
    ) -> Self {
        Self {
            index,
            shell: shell.clone(),
            workdir: root.to_path_buf(),
            sink,
            slots: Vec::new(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// States of the daemon slots, in declaration order.
    pub fn states(&self) -> Vec<PenState> {
        self.slots.iter().map(|s| s.state()).collect()
    }

    /// Stop every live instance with its restart signal, wait for it, then
    /// start a fresh one. Spawn failures are logged and leave the slot
    /// `Stopped`.
    pub async fn restart(&self) {
        for slot in &self.slots {
            self.restart_slot(slot).await;
        }
    }

    async fn restart_slot(&self, slot: &Arc<DaemonSlot>) {
        let mut current = slot.current.lock().await;
        if self.is_closed() {
            return;
        }

        if let Some(old) = current.take() {
            info!(block = self.index, cmd = %slot.command, signal = %slot.daemon.restart_signal, "restarting daemon");
            match old.executor.signal(slot.daemon.restart_signal) {
                Ok(()) | Err(PenwatchError::NoRunningProcess) => {}
                Err(e) => warn!(cmd = %slot.command, error = %e, "could not signal daemon"),
            }
            if let Err(e) = old.task.await {
                warn!(cmd = %slot.command, error = %e, "daemon wait task failed");
            }
        }

        // Shutdown may have begun while the old instance was exiting.
        if self.is_closed() {
            slot.set_state(PenState::Stopped);
            return;
        }
        slot.set_state(PenState::Starting);
        info!(block = self.index, cmd = %slot.command, "starting daemon");

        let executor = Arc::new(ShellExecutor::with_shell(
            self.shell.clone(),
            slot.command.clone(),
            self.workdir.clone(),
        ));
        let process = match executor.spawn() {
            Ok(p) => p,
            Err(e) => {
                error!(block = self.index, cmd = %slot.command, error = %e, "could not start daemon");
                slot.set_state(PenState::Stopped);
                return;
            }
        };

        *guard(&slot.live) = Some(Arc::clone(&executor));
        slot.set_state(PenState::Running);

        let sink = Arc::clone(&self.sink);
        let watched = Arc::clone(slot);
        let task = tokio::spawn(async move {
            match process.wait(sink.as_ref(), false).await {
                Ok(result) => match result.error {
                    None => info!(cmd = %watched.command, "daemon exited"),
                    Some(failure) => warn!(cmd = %watched.command, "daemon exited: {failure}"),
                },
                Err(e) => error!(cmd = %watched.command, error = %e, "daemon wait failed"),
            }
            watched.set_state(PenState::Stopped);
        });

        *current = Some(RunningDaemon { executor, task });
    }

    /// Forward `sig` (through each daemon's signal map) to every live
    /// instance. Never waits.
    pub fn signal(&self, sig: Signal) {
        for slot in &self.slots {
            slot.deliver(slot.daemon.mapped(sig));
        }
    }

    /// Refuse further restarts and deliver the mapped `sig` to every live
    /// instance without waiting.
    pub fn begin_shutdown(&self, sig: Signal) {
        self.closed.store(true, Ordering::SeqCst);
        for slot in &self.slots {
            if slot.state() == PenState::Running {
                slot.set_state(PenState::Stopping);
            }
            slot.deliver(slot.daemon.mapped(sig));
        }
    }

    /// Wait for every instance to exit.
    pub async fn wait_stopped(&self) {
        for slot in &self.slots {
            let mut current = slot.current.lock().await;
            if let Some(old) = current.take() {
                if let Err(e) = old.task.await {
                    warn!(cmd = %slot.command, error = %e, "daemon wait task failed");
                }
            }
            slot.set_state(PenState::Stopped);
        }
    }

    /// Deliver `sig` and wait for every instance to exit. Idempotent.
    pub async fn shutdown(&self, sig: Signal) {
        self.begin_shutdown(sig);
        self.wait_stopped().await;
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

fn guard<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
