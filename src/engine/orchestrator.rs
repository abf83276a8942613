// src/engine/orchestrator.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info, warn};

use crate::config::{self, Config};
use crate::daemon::DaemonWorld;
use crate::engine::signals::{SignalRouter, listen};
use crate::engine::{EVENT_CHANNEL_CAPACITY, GRACE, LULL, LoopEvent};
use crate::errors::{ErrorKind, PenwatchError, Result};
use crate::exec::prep::{Foreground, PrepContext, run_preps};
use crate::exec::shell::Shell;
use crate::expand::Expander;
use crate::logging::OutputSink;
use crate::notify::Notifier;
use crate::signals::{Signal, SignalTable};
use crate::watch::changeset::ChangeSet;
use crate::watch::path_utils::absolutize;
use crate::watch::patterns::PatternSet;
use crate::watch::watcher::watch;

type SignalFeed = Arc<Mutex<mpsc::Receiver<Signal>>>;

/// Top-level run loop: owns the config, rebuilds the daemon world every
/// cycle and dispatches change-sets to blocks in order.
pub struct Orchestrator {
    conf_path: PathBuf,
    root: PathBuf,
    config: Arc<Config>,
    expander: Expander,
    sink: Arc<dyn OutputSink>,
    notifiers: Vec<Arc<dyn Notifier>>,
    watch_config: bool,
    signals: SignalTable,
    lull: Duration,
    grace: Duration,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("conf_path", &self.conf_path)
            .field("root", &self.root)
            .field("blocks", &self.config.blocks.len())
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Orchestrator rooted at the current directory. Fails if the config
    /// cannot be read or `@shell` does not name a usable shell.
    pub fn new(
        conf_path: impl AsRef<Path>,
        sink: Arc<dyn OutputSink>,
        notifiers: Vec<Arc<dyn Notifier>>,
        watch_config: bool,
    ) -> Result<Self> {
        let root = std::env::current_dir()?;
        Self::with_root(conf_path, root, sink, notifiers, watch_config)
    }

    /// As [`Orchestrator::new`], with an explicit watch root.
    pub fn with_root(
        conf_path: impl AsRef<Path>,
        root: impl AsRef<Path>,
        sink: Arc<dyn OutputSink>,
        notifiers: Vec<Arc<dyn Notifier>>,
        watch_config: bool,
    ) -> Result<Self> {
        let root = root.as_ref();
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        let conf_path = absolutize(conf_path.as_ref(), &root);

        let mut orchestrator = Self {
            expander: Expander::new(Default::default(), root.clone()),
            conf_path,
            root,
            config: Arc::new(Config::default()),
            sink,
            notifiers,
            watch_config,
            signals: SignalTable::platform(),
            lull: LULL,
            grace: GRACE,
        };
        orchestrator.read_config()?;
        Ok(orchestrator)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Re-read the config file. On failure the current config is kept.
    pub fn read_config(&mut self) -> Result<()> {
        let config = config::load_and_validate(&self.conf_path, &self.signals)?;
        let expander = Expander::for_config(&config, &self.conf_path);
        Shell::resolve(&expander.shell()?)?;

        debug!(path = %self.conf_path.display(), blocks = config.blocks.len(), "config loaded");
        self.config = Arc::new(config);
        self.expander = expander;
        Ok(())
    }

    /// Run every block's preps once, without watching or daemons.
    pub async fn run_preps_only(&self, initial: bool) -> Result<()> {
        let foreground = Foreground::new();
        let ctx = self.prep_context(&foreground);
        for block in &self.config.blocks {
            run_preps(&ctx, block, None, initial).await?;
        }
        Ok(())
    }

    /// The long-running loop. Returns only on an unrecoverable error or
    /// `ShutdownRequested`; a config reload starts a fresh cycle.
    pub async fn run(&mut self) -> Result<()> {
        let signals = listen(&self.signals)?;
        self.run_with_signals(signals).await
    }

    /// As [`Orchestrator::run`], reading signals from `signals` instead of
    /// subscribing to the OS.
    pub async fn run_with_signals(&mut self, signals: mpsc::Receiver<Signal>) -> Result<()> {
        let feed: SignalFeed = Arc::new(Mutex::new(signals));
        loop {
            self.run_cycle(&feed).await?;
        }
    }

    async fn run_cycle(&mut self, feed: &SignalFeed) -> Result<()> {
        let (tx, mut rx) = mpsc::channel::<LoopEvent>(EVENT_CHANNEL_CAPACITY);
        let world = Arc::new(DaemonWorld::new(
            &self.config,
            &self.expander,
            &self.root,
            Arc::clone(&self.sink),
        )?);
        let foreground = Arc::new(Foreground::new());

        let router = SignalRouter::new(
            Arc::clone(&world),
            Arc::clone(&foreground),
            tx.clone(),
            self.grace,
        );
        let feed = Arc::clone(feed);
        let router_task = tokio::spawn(async move {
            let mut signals = feed.lock().await;
            router.run(&mut signals).await;
        });

        let result = self.drive(&world, &foreground, tx, &mut rx).await;

        router_task.abort();
        world.shutdown(Signal::Kill).await;
        result
    }

    async fn drive(
        &mut self,
        world: &DaemonWorld,
        foreground: &Foreground,
        tx: mpsc::Sender<LoopEvent>,
        rx: &mut mpsc::Receiver<LoopEvent>,
    ) -> Result<()> {
        let patterns = self.watch_patterns();
        let _watcher = watch(&self.root, &patterns.includes, &patterns.excludes, self.lull, tx)?;

        self.trigger(world, foreground, None).await;

        while let Some(event) = rx.recv().await {
            let changes = match event {
                LoopEvent::Shutdown => return Err(PenwatchError::ShutdownRequested),
                LoopEvent::Changes(changes) => changes,
            };

            if self.watch_config && changes.contains(&self.conf_path) {
                info!(path = %self.conf_path.display(), "reloading config");
                match self.read_config() {
                    Ok(()) => return Ok(()),
                    Err(e) => {
                        warn!(error = %e, "keeping previous config");
                        continue;
                    }
                }
            }

            debug!(changes = ?changes.all(), "delta");
            self.trigger(world, foreground, Some(&changes)).await;
        }
        Ok(())
    }

    /// Patterns for the watcher: the union of every block's includes (or
    /// everything, if any block has none), plus the config file itself.
    /// Blocks whose includes cannot be expanded are left out.
    fn watch_patterns(&self) -> PatternSet {
        let mut includes = Vec::new();
        let mut match_all = false;
        for (i, block) in self.config.blocks.iter().enumerate() {
            if block.include.is_empty() {
                match_all = true;
                continue;
            }
            match self.expander.global_list(&block.include) {
                Ok(expanded) => includes.extend(expanded),
                Err(e) => error!(block = i, error = %e, "could not evaluate include patterns"),
            }
        }
        includes.sort();
        includes.dedup();

        if match_all {
            includes.clear();
        } else if self.watch_config {
            includes.push(globset::escape(&self.conf_path.to_string_lossy()));
        }

        PatternSet {
            includes,
            excludes: Vec::new(),
        }
    }

    fn prep_context<'a>(&'a self, foreground: &'a Foreground) -> PrepContext<'a> {
        PrepContext {
            expander: &self.expander,
            root: &self.root,
            sink: self.sink.as_ref(),
            notifiers: &self.notifiers,
            foreground,
        }
    }

    /// Evaluate every block in order against `changes` (`None` for the
    /// initial run, which activates every block).
    async fn trigger(&self, world: &DaemonWorld, foreground: &Foreground, changes: Option<&ChangeSet>) {
        let ctx = self.prep_context(foreground);

        for (i, block) in self.config.blocks.iter().enumerate() {
            if foreground.is_stopping() {
                debug!("shutdown in progress, skipping remaining blocks");
                break;
            }

            let filtered;
            let block_changes = match changes {
                None => None,
                Some(cs) => {
                    let patterns = match self.expander.block_patterns(block) {
                        Ok(p) => p,
                        Err(e) => {
                            error!(block = i, error = %e, "could not evaluate patterns");
                            continue;
                        }
                    };
                    match cs.filter(&self.root, &patterns.includes, &patterns.excludes) {
                        Ok(f) if f.is_empty() => continue,
                        Ok(f) => {
                            filtered = f;
                            Some(&filtered)
                        }
                        Err(e) => {
                            error!(block = i, error = %e, "error filtering events");
                            continue;
                        }
                    }
                }
            };

            match run_preps(&ctx, block, block_changes, changes.is_none()).await {
                Ok(()) => world.restart(i).await,
                Err(e) => match e.kind() {
                    ErrorKind::ProcessExit => {}
                    ErrorKind::ShutdownRequested => break,
                    _ => error!(block = i, error = %e, "error running prep"),
                },
            }
        }
    }

    /// Override the watcher lull and the shutdown grace interval.
    pub fn set_timings(&mut self, lull: Duration, grace: Duration) {
        self.lull = lull;
        self.grace = grace;
    }
}
