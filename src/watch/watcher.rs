// src/watch/watcher.rs

use std::path::Path;
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::LoopEvent;
use crate::errors::{PenwatchError, Result};
use crate::watch::changeset::ChangeSet;
use crate::watch::patterns::PathMatcher;

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive. Dropping the handle (or
/// calling [`WatchHandle::stop`]) stops watching and ends the debounce task.
pub struct WatchHandle {
    _inner: RecommendedWatcher,
    debounce: JoinHandle<()>,
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle").finish()
    }
}

impl WatchHandle {
    pub fn stop(self) {
        debug!("stopping file watcher");
        drop(self);
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.debounce.abort();
    }
}

/// Watch `root` recursively and deliver coalesced change-sets to `tx`.
///
/// Raw events are collected until `lull` passes without a new one, filtered
/// through `includes`/`excludes`, and sent as a single
/// [`LoopEvent::Changes`]. Access-only events are ignored.
pub fn watch(
    root: &Path,
    includes: &[String],
    excludes: &[String],
    lull: Duration,
    tx: mpsc::Sender<LoopEvent>,
) -> Result<WatchHandle> {
    let matcher = PathMatcher::new(root, includes, excludes)?;

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if event_tx.send(event).is_err() {
                    debug!("dropping notify event after debounce task ended");
                }
            }
            Err(err) => warn!(error = %err, "file watch error"),
        },
        Config::default(),
    )
    .map_err(|e| PenwatchError::Watch(e.to_string()))?;

    watcher
        .watch(root, RecursiveMode::Recursive)
        .map_err(|e| PenwatchError::Watch(e.to_string()))?;

    info!(root = %root.display(), "file watcher started");

    let debounce = tokio::spawn(async move {
        while let Some(first) = event_rx.recv().await {
            let mut pending = ChangeSet::new();
            absorb(&mut pending, first, &matcher);

            loop {
                match tokio::time::timeout(lull, event_rx.recv()).await {
                    Ok(Some(event)) => absorb(&mut pending, event, &matcher),
                    Ok(None) | Err(_) => break,
                }
            }

            if pending.is_empty() {
                continue;
            }
            debug!(count = pending.len(), "delivering change-set");
            if tx.send(LoopEvent::Changes(pending)).await.is_err() {
                break;
            }
        }
        debug!("watcher debounce loop finished");
    });

    Ok(WatchHandle {
        _inner: watcher,
        debounce,
    })
}

fn absorb(pending: &mut ChangeSet, event: Event, matcher: &PathMatcher) {
    if matches!(event.kind, EventKind::Access(_)) {
        return;
    }
    for path in event.paths {
        if matcher.is_match(&path) {
            pending.insert(path);
        }
    }
}
