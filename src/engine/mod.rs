// src/engine/mod.rs

//! Orchestration engine for penwatch.
//!
//! This module ties together:
//! - the run loop that reacts to change-sets, one block at a time
//!   ([`orchestrator`])
//! - hot reload of the config file
//! - signal routing: forwarding to daemons and the escalating shutdown
//!   sequence ([`signals`])
//!
//! Every producer (watcher, signal router) feeds one typed channel consumed
//! by a single loop, so signal-driven shutdown is serialised against
//! file-driven triggers.

use std::time::Duration;

use crate::watch::changeset::ChangeSet;

/// Quiet period the watcher waits for before delivering a change-set.
pub const LULL: Duration = Duration::from_millis(100);

/// Pause between forwarding the first fatal signal and stopping the loop.
pub const GRACE: Duration = Duration::from_millis(100);

/// Capacity of the loop's event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Events flowing into the run loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopEvent {
    /// Coalesced filesystem changes.
    Changes(ChangeSet),
    /// Stop the loop; the process is shutting down.
    Shutdown,
}

pub mod orchestrator;
pub mod signals;

pub use orchestrator::Orchestrator;
pub use signals::{SignalRouter, listen};
