//! Reporting collaborator for warnings and failure messages.
//!
//! Galley never logs through a process-wide singleton: anything that wants
//! to emit a warning takes a `Reporter` explicitly, so tests can capture
//! output without touching global state.

use std::sync::{Arc, Mutex};

/// Sink for single-line warning and error messages.
pub trait Reporter: Send + Sync {
    /// Emit a warning line.
    fn warn(&self, message: &str);

    /// Emit an error line.
    fn error(&self, message: &str);
}

/// Default reporter that forwards to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn warn(&self, message: &str) {
        tracing::warn!("{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!("{}", message);
    }
}

/// Reporter that records every line, for assertions in tests.
#[derive(Debug, Default)]
pub struct CapturingReporter {
    lines: Mutex<Vec<(Level, String)>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Warn,
    Error,
}

impl CapturingReporter {
    pub fn new() -> Arc<Self> {
        Arc::new(CapturingReporter::default())
    }

    /// All recorded warning messages, in emission order.
    pub fn warnings(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .filter(|(level, _)| *level == Level::Warn)
            .map(|(_, line)| line.clone())
            .collect()
    }

    /// All recorded error messages, in emission order.
    pub fn errors(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .filter(|(level, _)| *level == Level::Error)
            .map(|(_, line)| line.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().unwrap().is_empty()
    }
}

impl Reporter for CapturingReporter {
    fn warn(&self, message: &str) {
        self.lines
            .lock()
            .unwrap()
            .push((Level::Warn, message.to_string()));
    }

    fn error(&self, message: &str) {
        self.lines
            .lock()
            .unwrap()
            .push((Level::Error, message.to_string()));
    }
}
