// src/exec/executor.rs

//! Run one command under a shell, streaming or buffering its output, and
//! classify how it ended.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Child;
use tracing::debug;

use crate::errors::{PenwatchError, Result};
use crate::exec::shell::Shell;
use crate::logging::{OutputSink, OutputStream};
use crate::signals::Signal;

/// How a command that did not succeed ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessFailure {
    /// Non-zero exit code.
    Exit(i32),
    /// Terminated by a signal (raw number).
    Signal(i32),
    /// Neither code nor signal was reported.
    Unknown,
}

impl ProcessFailure {
    fn from_status(status: ExitStatus) -> Option<Self> {
        if status.success() {
            return None;
        }
        if let Some(code) = status.code() {
            return Some(ProcessFailure::Exit(code));
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(sig) = status.signal() {
                return Some(ProcessFailure::Signal(sig));
            }
        }
        Some(ProcessFailure::Unknown)
    }
}

impl fmt::Display for ProcessFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessFailure::Exit(code) => write!(f, "exit status {code}"),
            ProcessFailure::Signal(raw) => {
                #[cfg(unix)]
                {
                    if let Some(sig) = Signal::from_raw(*raw) {
                        return write!(f, "signal: {}", sig.description());
                    }
                }
                write!(f, "signal: {raw}")
            }
            ProcessFailure::Unknown => f.write_str("exit status unknown"),
        }
    }
}

/// Outcome of a command that was started successfully.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    /// `None` when the command exited with status 0.
    pub error: Option<ProcessFailure>,
    /// Buffered stderr (empty unless buffering was requested).
    pub err_output: String,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.error.is_none()
    }
}

type PidSlot = Arc<Mutex<Option<u32>>>;

/// A command bound to a shell and a working directory.
///
/// Spawning is synchronous; [`ShellExecutor::signal`] can be used from any
/// task while another task waits on the process.
#[derive(Debug)]
pub struct ShellExecutor {
    shell: Shell,
    command: String,
    workdir: PathBuf,
    pid: PidSlot,
}

impl ShellExecutor {
    /// Resolve `shell_name` and bind `command` to it. Fails with
    /// `UnknownShell`/`ShellNotFound` before anything is spawned.
    pub fn new(shell_name: &str, command: impl Into<String>, workdir: impl Into<PathBuf>) -> Result<Self> {
        let shell = Shell::resolve(shell_name)?;
        Ok(Self::with_shell(shell, command, workdir))
    }

    pub fn with_shell(shell: Shell, command: impl Into<String>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            shell,
            command: command.into(),
            workdir: workdir.into(),
            pid: Arc::new(Mutex::new(None)),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Start the command. Stdout and stderr are piped; on unix the child
    /// leads its own process group.
    pub fn spawn(&self) -> Result<ShellProcess> {
        let mut cmd = self.shell.command(&self.command, &self.workdir);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd.spawn().map_err(|source| PenwatchError::Invocation {
            command: self.command.clone(),
            source,
        })?;

        let pid = child.id();
        debug!(cmd = %self.command, pid, "spawned process");
        *lock(&self.pid) = pid;

        Ok(ShellProcess {
            child,
            command: self.command.clone(),
            pid: Arc::clone(&self.pid),
        })
    }

    /// Spawn and wait.
    pub async fn run(&self, sink: &dyn OutputSink, buffer_stderr: bool) -> Result<ExecutionResult> {
        self.spawn()?.wait(sink, buffer_stderr).await
    }

    pub fn is_running(&self) -> bool {
        lock(&self.pid).is_some()
    }

    /// Deliver `sig` to the running command's process group.
    #[cfg(unix)]
    pub fn signal(&self, sig: Signal) -> Result<()> {
        use nix::sys::signal::killpg;
        use nix::unistd::Pid;

        let pid = (*lock(&self.pid)).ok_or(PenwatchError::NoRunningProcess)?;
        let pgid = i32::try_from(pid).map_err(|_| PenwatchError::NoRunningProcess)?;
        debug!(cmd = %self.command, pid, signal = %sig, "signalling process group");
        killpg(Pid::from_raw(pgid), sig.to_nix()).map_err(|errno| match errno {
            nix::errno::Errno::ESRCH => PenwatchError::NoRunningProcess,
            other => PenwatchError::IoError(other.into()),
        })
    }

    #[cfg(not(unix))]
    pub fn signal(&self, sig: Signal) -> Result<()> {
        if lock(&self.pid).is_none() {
            return Err(PenwatchError::NoRunningProcess);
        }
        Err(PenwatchError::Other(anyhow::anyhow!(
            "cannot deliver {sig} on this platform"
        )))
    }
}

/// A started command.
#[derive(Debug)]
pub struct ShellProcess {
    child: Child,
    command: String,
    pid: PidSlot,
}

impl ShellProcess {
    /// Drive the process to completion. Stdout is always streamed into
    /// `sink`; stderr is streamed too, or collected into `err_output` when
    /// `buffer_stderr` is set.
    pub async fn wait(mut self, sink: &dyn OutputSink, buffer_stderr: bool) -> Result<ExecutionResult> {
        let stdout = self.child.stdout.take();
        let stderr = self.child.stderr.take();
        let command = self.command.as_str();

        let pump_stdout = async {
            if let Some(out) = stdout {
                let mut lines = BufReader::new(out).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    sink.line(command, OutputStream::Stdout, &line);
                }
            }
        };

        let pump_stderr = async {
            let mut buffered = String::new();
            if let Some(err) = stderr {
                let mut lines = BufReader::new(err).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if buffer_stderr {
                        buffered.push_str(&line);
                        buffered.push('\n');
                    } else {
                        sink.line(command, OutputStream::Stderr, &line);
                    }
                }
            }
            buffered
        };

        let ((), err_output, status) = tokio::join!(pump_stdout, pump_stderr, self.child.wait());
        *lock(&self.pid) = None;

        let status = status.map_err(|source| PenwatchError::Invocation {
            command: self.command.clone(),
            source,
        })?;
        let error = ProcessFailure::from_status(status);
        debug!(cmd = %self.command, ?error, "process exited");

        Ok(ExecutionResult { error, err_output })
    }
}

fn lock(slot: &Mutex<Option<u32>>) -> std::sync::MutexGuard<'_, Option<u32>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_texts() {
        assert_eq!(ProcessFailure::Exit(1).to_string(), "exit status 1");
        #[cfg(unix)]
        assert_eq!(
            ProcessFailure::Signal(Signal::Kill.raw()).to_string(),
            "signal: killed"
        );
    }

    #[test]
    fn signalling_an_idle_executor_fails() {
        let Ok(ex) = ShellExecutor::new(crate::expand::DEFAULT_SHELL, "true", ".") else {
            return;
        };
        assert!(matches!(
            ex.signal(Signal::Term),
            Err(PenwatchError::NoRunningProcess)
        ));
    }
}
