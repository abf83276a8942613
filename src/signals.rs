// src/signals.rs

//! Signal names, classification and the config-facing lookup table.
//!
//! There is no process-wide mutable signal state: a [`SignalTable`] is built
//! once at startup and handed by reference to the config parser and to the
//! run loop.

use std::collections::BTreeMap;
use std::fmt;

use crate::errors::{PenwatchError, Result};

/// Signals penwatch can name, listen for or deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Signal {
    Hup,
    Int,
    Quit,
    Ill,
    Trap,
    Abrt,
    Bus,
    Fpe,
    Kill,
    Usr1,
    Segv,
    Usr2,
    Alrm,
    Term,
    Cont,
    Tstp,
    Ttin,
    Ttou,
    Xcpu,
    Xfsz,
    Vtalrm,
    Prof,
    Winch,
    Io,
    Sys,
}

impl Signal {
    pub fn name(self) -> &'static str {
        match self {
            Signal::Hup => "SIGHUP",
            Signal::Int => "SIGINT",
            Signal::Quit => "SIGQUIT",
            Signal::Ill => "SIGILL",
            Signal::Trap => "SIGTRAP",
            Signal::Abrt => "SIGABRT",
            Signal::Bus => "SIGBUS",
            Signal::Fpe => "SIGFPE",
            Signal::Kill => "SIGKILL",
            Signal::Usr1 => "SIGUSR1",
            Signal::Segv => "SIGSEGV",
            Signal::Usr2 => "SIGUSR2",
            Signal::Alrm => "SIGALRM",
            Signal::Term => "SIGTERM",
            Signal::Cont => "SIGCONT",
            Signal::Tstp => "SIGTSTP",
            Signal::Ttin => "SIGTTIN",
            Signal::Ttou => "SIGTTOU",
            Signal::Xcpu => "SIGXCPU",
            Signal::Xfsz => "SIGXFSZ",
            Signal::Vtalrm => "SIGVTALRM",
            Signal::Prof => "SIGPROF",
            Signal::Winch => "SIGWINCH",
            Signal::Io => "SIGIO",
            Signal::Sys => "SIGSYS",
        }
    }

    /// Human-readable description, as used in "signal: killed".
    pub fn description(self) -> &'static str {
        match self {
            Signal::Hup => "hangup",
            Signal::Int => "interrupt",
            Signal::Quit => "quit",
            Signal::Ill => "illegal instruction",
            Signal::Trap => "trace/breakpoint trap",
            Signal::Abrt => "aborted",
            Signal::Bus => "bus error",
            Signal::Fpe => "floating point exception",
            Signal::Kill => "killed",
            Signal::Usr1 => "user defined signal 1",
            Signal::Segv => "segmentation fault",
            Signal::Usr2 => "user defined signal 2",
            Signal::Alrm => "alarm clock",
            Signal::Term => "terminated",
            Signal::Cont => "continued",
            Signal::Tstp => "stopped",
            Signal::Ttin => "stopped (tty input)",
            Signal::Ttou => "stopped (tty output)",
            Signal::Xcpu => "CPU time limit exceeded",
            Signal::Xfsz => "file size limit exceeded",
            Signal::Vtalrm => "virtual timer expired",
            Signal::Prof => "profiling timer expired",
            Signal::Winch => "window changed",
            Signal::Io => "I/O possible",
            Signal::Sys => "bad system call",
        }
    }

    /// True for signals whose default disposition terminates the process.
    ///
    /// Job-control and user-defined signals are non-fatal: penwatch forwards
    /// them to its daemons and keeps running.
    pub fn is_fatal(self) -> bool {
        !matches!(
            self,
            Signal::Cont
                | Signal::Tstp
                | Signal::Ttin
                | Signal::Ttou
                | Signal::Usr1
                | Signal::Usr2
                | Signal::Winch
        )
    }

    #[cfg(unix)]
    pub fn to_nix(self) -> nix::sys::signal::Signal {
        use nix::sys::signal::Signal as N;
        match self {
            Signal::Hup => N::SIGHUP,
            Signal::Int => N::SIGINT,
            Signal::Quit => N::SIGQUIT,
            Signal::Ill => N::SIGILL,
            Signal::Trap => N::SIGTRAP,
            Signal::Abrt => N::SIGABRT,
            Signal::Bus => N::SIGBUS,
            Signal::Fpe => N::SIGFPE,
            Signal::Kill => N::SIGKILL,
            Signal::Usr1 => N::SIGUSR1,
            Signal::Segv => N::SIGSEGV,
            Signal::Usr2 => N::SIGUSR2,
            Signal::Alrm => N::SIGALRM,
            Signal::Term => N::SIGTERM,
            Signal::Cont => N::SIGCONT,
            Signal::Tstp => N::SIGTSTP,
            Signal::Ttin => N::SIGTTIN,
            Signal::Ttou => N::SIGTTOU,
            Signal::Xcpu => N::SIGXCPU,
            Signal::Xfsz => N::SIGXFSZ,
            Signal::Vtalrm => N::SIGVTALRM,
            Signal::Prof => N::SIGPROF,
            Signal::Winch => N::SIGWINCH,
            Signal::Io => N::SIGIO,
            Signal::Sys => N::SIGSYS,
        }
    }

    /// Raw signal number on this platform.
    #[cfg(unix)]
    pub fn raw(self) -> i32 {
        self.to_nix() as i32
    }

    /// Reverse of [`Signal::raw`], used to describe how a child died.
    #[cfg(unix)]
    pub fn from_raw(raw: i32) -> Option<Signal> {
        ALL.iter().copied().find(|s| s.raw() == raw)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(unix)]
const ALL: &[Signal] = &[
    Signal::Hup,
    Signal::Int,
    Signal::Quit,
    Signal::Ill,
    Signal::Trap,
    Signal::Abrt,
    Signal::Bus,
    Signal::Fpe,
    Signal::Kill,
    Signal::Usr1,
    Signal::Segv,
    Signal::Usr2,
    Signal::Alrm,
    Signal::Term,
    Signal::Cont,
    Signal::Tstp,
    Signal::Ttin,
    Signal::Ttou,
    Signal::Xcpu,
    Signal::Xfsz,
    Signal::Vtalrm,
    Signal::Prof,
    Signal::Winch,
    Signal::Io,
    Signal::Sys,
];

/// Immutable name → signal table plus the set of signals the run loop
/// subscribes to.
#[derive(Debug, Clone)]
pub struct SignalTable {
    by_name: BTreeMap<&'static str, Signal>,
    listened: Vec<Signal>,
}

impl SignalTable {
    /// Table for the current platform.
    #[cfg(unix)]
    pub fn platform() -> Self {
        let by_name = BTreeMap::from([
            ("sighup", Signal::Hup),
            ("sigterm", Signal::Term),
            ("sigint", Signal::Int),
            ("sigkill", Signal::Kill),
            ("sigquit", Signal::Quit),
            ("sigusr1", Signal::Usr1),
            ("sigusr2", Signal::Usr2),
            ("sigwinch", Signal::Winch),
        ]);

        // SIGKILL and SIGSTOP cannot be caught. SIGILL, SIGFPE, SIGSEGV and
        // SIGBUS are synchronous faults: they still classify as fatal, but
        // tokio refuses to register handlers for SIGILL, SIGFPE and SIGSEGV,
        // and SIGBUS is left alone with them.
        let listened = vec![
            Signal::Hup,
            Signal::Int,
            Signal::Quit,
            Signal::Trap,
            Signal::Abrt,
            Signal::Alrm,
            Signal::Term,
            Signal::Xcpu,
            Signal::Xfsz,
            Signal::Vtalrm,
            Signal::Prof,
            Signal::Io,
            Signal::Sys,
            Signal::Cont,
            Signal::Tstp,
            Signal::Ttin,
            Signal::Ttou,
            Signal::Usr1,
            Signal::Usr2,
            Signal::Winch,
        ];

        Self { by_name, listened }
    }

    #[cfg(not(unix))]
    pub fn platform() -> Self {
        let by_name = BTreeMap::from([
            ("sighup", Signal::Hup),
            ("sigterm", Signal::Term),
            ("sigint", Signal::Int),
            ("sigkill", Signal::Kill),
            ("sigquit", Signal::Quit),
        ]);
        Self {
            by_name,
            listened: vec![Signal::Int],
        }
    }

    /// Resolve a config spelling such as `"sigterm"`.
    pub fn lookup(&self, name: &str) -> Result<Signal> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| PenwatchError::UnknownSignal(name.to_string()))
    }

    /// Signals the run loop subscribes to.
    pub fn listened(&self) -> &[Signal] {
        &self.listened
    }
}

impl Default for SignalTable {
    fn default() -> Self {
        Self::platform()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_reports_unknown_names_verbatim() {
        let table = SignalTable::platform();
        assert_eq!(table.lookup("sigterm").unwrap(), Signal::Term);
        let err = table.lookup("foobar").unwrap_err();
        assert_eq!(err.to_string(), "unknown signal: foobar");
    }

    #[test]
    fn job_control_and_user_signals_are_not_fatal() {
        for sig in [Signal::Usr1, Signal::Usr2, Signal::Winch, Signal::Cont, Signal::Tstp] {
            assert!(!sig.is_fatal(), "{sig} should be non-fatal");
        }
        for sig in [Signal::Hup, Signal::Int, Signal::Term, Signal::Quit, Signal::Xcpu] {
            assert!(sig.is_fatal(), "{sig} should be fatal");
        }
    }

    #[cfg(unix)]
    #[test]
    fn fault_signals_are_fatal_but_not_listened_for() {
        let table = SignalTable::platform();
        for sig in [Signal::Ill, Signal::Fpe, Signal::Segv, Signal::Bus, Signal::Kill] {
            assert!(sig.is_fatal(), "{sig} should be fatal");
            assert!(!table.listened().contains(&sig), "{sig} should not be listened for");
        }
    }

    #[cfg(unix)]
    #[test]
    fn raw_numbers_round_trip() {
        assert_eq!(Signal::from_raw(Signal::Kill.raw()), Some(Signal::Kill));
        assert_eq!(Signal::from_raw(libc_sigterm()), Some(Signal::Term));
    }

    #[cfg(unix)]
    fn libc_sigterm() -> i32 {
        nix::sys::signal::Signal::SIGTERM as i32
    }
}
