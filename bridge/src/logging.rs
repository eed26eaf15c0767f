//! Host logging sink for script-originated messages
//!
//! Script failures are reported through this sink instead of being thrown
//! across the bridge boundary. The production implementation forwards to
//! `tracing`; tests use [`MemoryLogger`] to assert on emitted messages.

use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

/// Severity of a logged script message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

/// Sink for messages originating from scripts or from bridge components.
pub trait ScriptLogger: Send + Sync {
    fn log(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Logger that forwards to the `tracing` infrastructure.
#[derive(Debug, Default, Clone)]
pub struct TracingLogger;

impl ScriptLogger for TracingLogger {
    fn log(&self, message: &str) {
        info!(target: "script", "{message}");
    }

    fn warn(&self, message: &str) {
        warn!(target: "script", "{message}");
    }

    fn error(&self, message: &str) {
        error!(target: "script", "{message}");
    }
}

/// A single captured log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
}

/// In-memory logger for tests and diagnostic tooling.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLogger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, level: LogLevel, message: &str) {
        self.entries.lock().unwrap().push(LogEntry {
            level,
            message: message.to_string(),
        });
    }

    /// Snapshot of all captured entries.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap().clone()
    }

    /// Messages captured at a given level.
    pub fn messages_at(&self, level: LogLevel) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.level == level)
            .map(|e| e.message.clone())
            .collect()
    }

    /// True if any captured message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .any(|e| e.message.contains(needle))
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

impl ScriptLogger for MemoryLogger {
    fn log(&self, message: &str) {
        self.push(LogLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.push(LogLevel::Warning, message);
    }

    fn error(&self, message: &str) {
        self.push(LogLevel::Error, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_logger_records_levels() {
        let logger = MemoryLogger::new();
        logger.log("hello");
        logger.warn("careful");
        logger.error("boom");

        assert_eq!(logger.messages_at(LogLevel::Info), vec!["hello"]);
        assert_eq!(logger.messages_at(LogLevel::Warning), vec!["careful"]);
        assert_eq!(logger.messages_at(LogLevel::Error), vec!["boom"]);
        assert!(logger.contains("care"));
        assert!(!logger.contains("missing"));
    }
}
