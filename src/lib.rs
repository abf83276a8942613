// src/lib.rs

pub mod cli;
pub mod config;
pub mod daemon;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod expand;
pub mod logging;
pub mod notify;
pub mod signals;
pub mod watch;

use std::sync::Arc;

use tracing::info;

use crate::cli::CliArgs;
use crate::engine::Orchestrator;
use crate::errors::Result;
use crate::logging::{OutputSink, TracingSink};
use crate::notify::{BellNotifier, Notifier};
use crate::watch::DEFAULT_EXCLUDES;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - `--ignores` (print the default excludes)
/// - notifiers
/// - the orchestrator, in prep-only or watching mode
pub async fn run(args: CliArgs) -> Result<()> {
    if args.ignores {
        for pattern in DEFAULT_EXCLUDES {
            println!("{pattern}");
        }
        return Ok(());
    }

    let mut notifiers: Vec<Arc<dyn Notifier>> = Vec::new();
    if args.bell {
        notifiers.push(Arc::new(BellNotifier));
    }

    let sink: Arc<dyn OutputSink> = Arc::new(TracingSink);
    let mut orchestrator = Orchestrator::new(&args.file, sink, notifiers, !args.noconf)?;
    info!(config = %args.file.display(), "penwatch started");

    if args.prep {
        orchestrator.run_preps_only(true).await
    } else {
        orchestrator.run().await
    }
}
