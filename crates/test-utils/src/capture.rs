use std::sync::{Arc, Mutex};

use penwatch::logging::{OutputSink, OutputStream};
use penwatch::notify::Notifier;

/// One line of captured command output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedLine {
    pub command: String,
    pub stream: OutputStream,
    pub line: String,
}

/// Output sink that records every line it is given.
#[derive(Debug, Clone, Default)]
pub struct CaptureSink {
    lines: Arc<Mutex<Vec<CapturedLine>>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<CapturedLine> {
        self.lines.lock().unwrap().clone()
    }

    /// Just the text of lines written on `stream`, in arrival order.
    pub fn texts(&self, stream: OutputStream) -> Vec<String> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.stream == stream)
            .map(|l| l.line.clone())
            .collect()
    }

    pub fn stdout(&self) -> Vec<String> {
        self.texts(OutputStream::Stdout)
    }

    pub fn stderr(&self) -> Vec<String> {
        self.texts(OutputStream::Stderr)
    }
}

impl OutputSink for CaptureSink {
    fn line(&self, command: &str, stream: OutputStream, line: &str) {
        self.lines.lock().unwrap().push(CapturedLine {
            command: command.to_string(),
            stream,
            line: line.to_string(),
        });
    }
}

/// A notification as pushed: (title, body, subtitle).
pub type Pushed = (String, String, String);

/// Notifier that records every push.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    pushed: Arc<Mutex<Vec<Pushed>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pushed(&self) -> Vec<Pushed> {
        self.pushed.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn push(&self, title: &str, body: &str, subtitle: &str) {
        self.pushed
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string(), subtitle.to_string()));
    }
}
