// src/exec/shell.rs

//! Shell selection: which interpreter runs a command string, and how.

use std::env;
use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::errors::{PenwatchError, Result};

/// Shells a command can be run under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellKind {
    Sh,
    Bash,
    PowerShell,
    Pwsh,
}

impl ShellKind {
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "sh" => Ok(ShellKind::Sh),
            "bash" => Ok(ShellKind::Bash),
            "powershell" => Ok(ShellKind::PowerShell),
            "pwsh" => Ok(ShellKind::Pwsh),
            other => Err(PenwatchError::UnknownShell(other.to_string())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ShellKind::Sh => "sh",
            ShellKind::Bash => "bash",
            ShellKind::PowerShell => "powershell",
            ShellKind::Pwsh => "pwsh",
        }
    }

    fn command_args(self, command: &str) -> Vec<&str> {
        match self {
            ShellKind::Sh | ShellKind::Bash => vec!["-c", command],
            ShellKind::PowerShell | ShellKind::Pwsh => {
                vec!["-NoProfile", "-NonInteractive", "-Command", command]
            }
        }
    }
}

/// A shell that exists on this machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shell {
    kind: ShellKind,
    program: PathBuf,
}

impl Shell {
    /// Resolve `name` to a known shell found on `PATH`.
    pub fn resolve(name: &str) -> Result<Self> {
        let kind = ShellKind::from_name(name)?;
        let program = find_in_path(kind.name())
            .ok_or_else(|| PenwatchError::ShellNotFound(name.to_string()))?;
        Ok(Self { kind, program })
    }

    pub fn kind(&self) -> ShellKind {
        self.kind
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// A `Command` that runs `command` under this shell in `workdir`.
    pub fn command(&self, command: &str, workdir: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.kind.command_args(command)).current_dir(workdir);
        cmd
    }
}

fn find_in_path(program: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths).find_map(|dir| {
        let candidate = dir.join(program);
        if candidate.is_file() {
            return Some(candidate);
        }
        if cfg!(windows) {
            let exe = candidate.with_extension("exe");
            if exe.is_file() {
                return Some(exe);
            }
        }
        None
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_shell_is_rejected_before_lookup() {
        let err = Shell::resolve("fish").unwrap_err();
        assert_eq!(err.to_string(), "unknown shell: fish");
    }

    #[cfg(unix)]
    #[test]
    fn sh_is_found_on_path() {
        let shell = Shell::resolve("sh").unwrap();
        assert_eq!(shell.kind(), ShellKind::Sh);
        assert!(shell.program().is_absolute() || shell.program().exists());
    }

    #[test]
    fn powershell_flags_are_non_interactive() {
        assert_eq!(
            ShellKind::Pwsh.command_args("ls"),
            vec!["-NoProfile", "-NonInteractive", "-Command", "ls"]
        );
        assert_eq!(ShellKind::Bash.command_args("ls"), vec!["-c", "ls"]);
    }
}
