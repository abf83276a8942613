// src/engine/signals.rs

//! OS signal intake and the escalating shutdown sequence.
//!
//! OS signals are read by one task per subscribed signal and funnelled into
//! a channel of [`Signal`]s. A [`SignalRouter`] consumes that channel:
//! non-fatal signals go to every daemon, the first fatal signal starts an
//! orderly shutdown (daemons stop, then a grace period, then the loop
//! stops) and a later interrupt cuts the shutdown short.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::daemon::DaemonWorld;
use crate::engine::LoopEvent;
use crate::errors::Result;
use crate::exec::prep::Foreground;
use crate::signals::{Signal, SignalTable};

/// Subscribe to every signal in `table` and return a channel they are
/// delivered on.
#[cfg(unix)]
pub fn listen(table: &SignalTable) -> Result<mpsc::Receiver<Signal>> {
    use tokio::signal::unix::{SignalKind, signal};

    let (tx, rx) = mpsc::channel(64);
    for &sig in table.listened() {
        let mut stream = signal(SignalKind::from_raw(sig.raw()))?;
        let tx = tx.clone();
        tokio::spawn(async move {
            while stream.recv().await.is_some() {
                debug!(signal = %sig, "received signal");
                if tx.send(sig).await.is_err() {
                    break;
                }
            }
        });
    }
    Ok(rx)
}

#[cfg(not(unix))]
pub fn listen(_table: &SignalTable) -> Result<mpsc::Receiver<Signal>> {
    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if tx.send(Signal::Int).await.is_err() {
                break;
            }
        }
    });
    Ok(rx)
}

/// Reacts to received signals on behalf of one loop cycle.
pub struct SignalRouter {
    world: Arc<DaemonWorld>,
    foreground: Arc<Foreground>,
    tx: mpsc::Sender<LoopEvent>,
    grace: Duration,
    seen_fatal: bool,
}

impl SignalRouter {
    pub fn new(
        world: Arc<DaemonWorld>,
        foreground: Arc<Foreground>,
        tx: mpsc::Sender<LoopEvent>,
        grace: Duration,
    ) -> Self {
        Self {
            world,
            foreground,
            tx,
            grace,
            seen_fatal: false,
        }
    }

    /// Consume signals until the channel closes.
    pub async fn run(mut self, rx: &mut mpsc::Receiver<Signal>) {
        while let Some(sig) = rx.recv().await {
            self.handle(sig).await;
        }
        debug!("signal channel closed");
    }

    pub async fn handle(&mut self, sig: Signal) {
        if !sig.is_fatal() {
            self.world.signal(sig);
            return;
        }

        if self.seen_fatal {
            if sig == Signal::Int {
                warn!("second interrupt, stopping without waiting");
                self.foreground.stop(Signal::Kill);
                self.request_stop().await;
            } else {
                debug!(signal = %sig, "shutdown already in progress");
            }
            return;
        }

        self.seen_fatal = true;
        info!(signal = %sig, "shutting down");
        self.foreground.stop(sig);

        // Daemons get to exit on their own before the grace period starts.
        // The router keeps reading meanwhile so a second interrupt still
        // cuts this short.
        let world = Arc::clone(&self.world);
        let tx = self.tx.clone();
        let grace = self.grace;
        tokio::spawn(async move {
            world.shutdown(sig).await;
            debug!(signal = %sig, "daemons stopped, waiting out grace period");
            tokio::time::sleep(grace).await;
            if tx.send(LoopEvent::Shutdown).await.is_err() {
                debug!("run loop already gone");
            }
        });
    }

    async fn request_stop(&self) {
        if self.tx.send(LoopEvent::Shutdown).await.is_err() {
            debug!("run loop already gone");
        }
    }
}
