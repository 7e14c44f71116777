// src/logging.rs

use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::{debug, error, info, warn};

/// Severity levels accepted by a [`Logger`], following the PSR-3 set used by the portal's ecosystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Notice => "notice",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Critical => "critical",
            LogLevel::Alert => "alert",
            LogLevel::Emergency => "emergency",
        };
        f.write_str(name)
    }
}

/// Structured key/value context attached to a log entry.
pub type LogContext = Vec<(&'static str, String)>;

/// Diagnostics sink injected into the service. Calls never affect control flow.
pub trait Logger: Send + Sync {
    fn log(&self, level: LogLevel, message: &str, context: &[(&'static str, String)]);

    fn debug(&self, message: &str, context: &[(&'static str, String)]) {
        self.log(LogLevel::Debug, message, context);
    }

    fn info(&self, message: &str, context: &[(&'static str, String)]) {
        self.log(LogLevel::Info, message, context);
    }

    fn warning(&self, message: &str, context: &[(&'static str, String)]) {
        self.log(LogLevel::Warning, message, context);
    }

    fn error(&self, message: &str, context: &[(&'static str, String)]) {
        self.log(LogLevel::Error, message, context);
    }
}

fn render_context(context: &[(&'static str, String)]) -> String {
    context
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Forwards entries to `tracing`. Levels without a tracing counterpart are folded into the nearest one.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str, context: &[(&'static str, String)]) {
        let context = render_context(context);
        match level {
            LogLevel::Debug => debug!(context = %context, "{}", message),
            LogLevel::Info | LogLevel::Notice => info!(severity = %level, context = %context, "{}", message),
            LogLevel::Warning => warn!(context = %context, "{}", message),
            LogLevel::Error | LogLevel::Critical | LogLevel::Alert | LogLevel::Emergency => {
                error!(severity = %level, context = %context, "{}", message)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn log(&self, _level: LogLevel, _message: &str, _context: &[(&'static str, String)]) {}
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub context: LogContext,
}

/// Keeps every entry in memory. Used by tests to assert on diagnostics.
#[derive(Debug, Clone, Default)]
pub struct MemoryLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn contains(&self, level: LogLevel, message: &str) -> bool {
        self.entries()
            .iter()
            .any(|e| e.level == level && e.message == message)
    }
}

impl Logger for MemoryLogger {
    fn log(&self, level: LogLevel, message: &str, context: &[(&'static str, String)]) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(LogEntry {
                level,
                message: message.to_string(),
                context: context.to_vec(),
            });
        }
    }
}
