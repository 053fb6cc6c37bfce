//! Script-level log sink.
//!
//! The run loop reports every command, failure and terminal state through a
//! [`ScriptLogger`]. The display surface decides what to do with the lines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

/// Append-only log sink, callable from the run loop's task.
pub trait ScriptLogger: Send + Sync {
    fn log(&self, message: &str);
}

/// Forwards script lines to `tracing` under the `pscript::script` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl ScriptLogger for TracingLogger {
    fn log(&self, message: &str) {
        info!(target: "pscript::script", "{}", message);
    }
}

/// A single captured script log line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

/// Keeps every line in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct CaptureLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl CaptureLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|entry| entry.message.clone())
            .collect()
    }

    /// Number of captured lines containing `needle`.
    pub fn count_containing(&self, needle: &str) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|entry| entry.message.contains(needle))
            .count()
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl ScriptLogger for CaptureLogger {
    fn log(&self, message: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(LogEntry {
                timestamp: Utc::now(),
                message: message.to_string(),
            });
    }
}

impl<T: ScriptLogger + ?Sized> ScriptLogger for Arc<T> {
    fn log(&self, message: &str) {
        (**self).log(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_logger_shares_buffer_between_clones() {
        let logger = CaptureLogger::new();
        let clone = logger.clone();
        logger.log("first");
        clone.log("second line");

        assert_eq!(logger.lines(), vec!["first", "second line"]);
        assert_eq!(logger.count_containing("line"), 1);

        clone.clear();
        assert!(logger.entries().is_empty());
    }
}
