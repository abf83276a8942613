// src/notify.rs

//! Failure notifications.

use std::io::Write;

use tracing::debug;

/// Title used for prep failure notifications.
pub const ERROR_TITLE: &str = "penwatch error";

/// Something that tells the user a command failed.
pub trait Notifier: Send + Sync {
    fn push(&self, title: &str, body: &str, subtitle: &str);
}

/// Rings the terminal bell.
#[derive(Debug, Clone, Copy, Default)]
pub struct BellNotifier;

impl Notifier for BellNotifier {
    fn push(&self, title: &str, _body: &str, _subtitle: &str) {
        debug!(title, "ringing terminal bell");
        let mut stderr = std::io::stderr();
        if stderr.write_all(b"\x07").and_then(|_| stderr.flush()).is_err() {
            debug!("could not write bell to stderr");
        }
    }
}
