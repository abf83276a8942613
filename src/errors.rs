// src/errors.rs

//! Crate-wide error type.
//!
//! Every failure the orchestrator can observe is a variant of
//! [`PenwatchError`]. Callers that need to branch on the *class* of a
//! failure (e.g. "was this a process exit that has already been reported?")
//! match on [`ErrorKind`] instead of inspecting messages.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PenwatchError {
    #[error("error reading config file {}: {reason}", .path.display())]
    ConfigError { path: PathBuf, reason: String },

    #[error("unknown shell: {0}")]
    UnknownShell(String),

    #[error("shell not found: {0}")]
    ShellNotFound(String),

    #[error("unknown signal: {0}")]
    UnknownSignal(String),

    #[error("could not start `{command}`: {source}")]
    Invocation {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The command ran and failed. `output` holds whatever stderr was
    /// buffered for notifications.
    #[error("{message}")]
    ProcessExit { message: String, output: String },

    #[error("variable @{0} is not defined")]
    UndefinedVariable(String),

    #[error("infinite recursion of variable @{0}")]
    RecursiveVariable(String),

    #[error("no running process")]
    NoRunningProcess,

    #[error("error watching: {0}")]
    Watch(String),

    #[error("shutdown requested")]
    ShutdownRequested,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Discriminant of [`PenwatchError`], used by the orchestration loop to
/// decide between "log and continue", "already reported" and "stop".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    ShellNotFound,
    Signal,
    Invocation,
    ProcessExit,
    UndefinedVariable,
    RecursiveVariable,
    NoRunningProcess,
    Watch,
    ShutdownRequested,
    Io,
    Other,
}

impl PenwatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PenwatchError::ConfigError { .. } => ErrorKind::Config,
            PenwatchError::UnknownShell(_) | PenwatchError::ShellNotFound(_) => {
                ErrorKind::ShellNotFound
            }
            PenwatchError::UnknownSignal(_) => ErrorKind::Signal,
            PenwatchError::Invocation { .. } => ErrorKind::Invocation,
            PenwatchError::ProcessExit { .. } => ErrorKind::ProcessExit,
            PenwatchError::UndefinedVariable(_) => ErrorKind::UndefinedVariable,
            PenwatchError::RecursiveVariable(_) => ErrorKind::RecursiveVariable,
            PenwatchError::NoRunningProcess => ErrorKind::NoRunningProcess,
            PenwatchError::Watch(_) => ErrorKind::Watch,
            PenwatchError::ShutdownRequested => ErrorKind::ShutdownRequested,
            PenwatchError::IoError(_) => ErrorKind::Io,
            PenwatchError::Other(_) => ErrorKind::Other,
        }
    }

    pub(crate) fn config(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        PenwatchError::ConfigError {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PenwatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_texts_name_the_offending_token() {
        assert_eq!(
            PenwatchError::UnknownShell("fish".into()).to_string(),
            "unknown shell: fish"
        );
        assert_eq!(
            PenwatchError::UnknownSignal("sigfoo".into()).to_string(),
            "unknown signal: sigfoo"
        );
        assert_eq!(
            PenwatchError::UndefinedVariable("z".into()).to_string(),
            "variable @z is not defined"
        );
    }

    #[test]
    fn shell_errors_share_a_kind() {
        assert_eq!(
            PenwatchError::UnknownShell("x".into()).kind(),
            PenwatchError::ShellNotFound("x".into()).kind()
        );
        assert_eq!(
            PenwatchError::ProcessExit {
                message: "exit status 1".into(),
                output: String::new()
            }
            .kind(),
            ErrorKind::ProcessExit
        );
    }
}
