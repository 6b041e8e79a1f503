//! Logging
//!
//! Structured logging for Keycloak operations.
//!
//! Logger methods return nothing and the bundled loggers never panic, so a
//! log call can never fail the request that emitted it.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::core::sync::lock;

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// Structured fields attached to a log line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogContext {
    /// Operation name, e.g. `login_client`.
    pub operation: Option<String>,
    /// Realm the operation targets.
    pub realm: Option<String>,
    /// Client ID.
    pub client_id: Option<String>,
    /// Request ID for correlation.
    pub request_id: Option<String>,
    /// Additional fields, kept sorted for stable output.
    pub extra: BTreeMap<String, String>,
}

impl LogContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = Some(realm.into());
        self
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Add an extra field.
    pub fn extra(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.extra.insert(key.into(), value.to_string());
        self
    }

    fn extra_fields(&self) -> String {
        self.extra
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Logger interface.
pub trait Logger: Send + Sync {
    fn trace(&self, message: &str, context: &LogContext);

    fn debug(&self, message: &str, context: &LogContext);

    fn info(&self, message: &str, context: &LogContext);

    fn warn(&self, message: &str, context: &LogContext);

    fn error(&self, message: &str, context: &LogContext);

    /// Check if a log level is enabled.
    fn is_enabled(&self, level: LogLevel) -> bool;
}

/// Logger that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn trace(&self, _message: &str, _context: &LogContext) {}
    fn debug(&self, _message: &str, _context: &LogContext) {}
    fn info(&self, _message: &str, _context: &LogContext) {}
    fn warn(&self, _message: &str, _context: &LogContext) {}
    fn error(&self, _message: &str, _context: &LogContext) {}
    fn is_enabled(&self, _level: LogLevel) -> bool {
        false
    }
}

/// Logger forwarding to the `tracing` ecosystem.
///
/// Context members become structured fields on the event; extras are
/// flattened into a single `extra` field.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

macro_rules! forward_event {
    ($level:expr, $message:expr, $context:expr) => {
        tracing::event!(
            target: "keycloak_integration",
            $level,
            operation = $context.operation.as_deref().unwrap_or_default(),
            realm = $context.realm.as_deref().unwrap_or_default(),
            client_id = $context.client_id.as_deref().unwrap_or_default(),
            request_id = $context.request_id.as_deref().unwrap_or_default(),
            extra = %$context.extra_fields(),
            "{}",
            $message
        )
    };
}

impl Logger for TracingLogger {
    fn trace(&self, message: &str, context: &LogContext) {
        forward_event!(tracing::Level::TRACE, message, context);
    }

    fn debug(&self, message: &str, context: &LogContext) {
        forward_event!(tracing::Level::DEBUG, message, context);
    }

    fn info(&self, message: &str, context: &LogContext) {
        forward_event!(tracing::Level::INFO, message, context);
    }

    fn warn(&self, message: &str, context: &LogContext) {
        forward_event!(tracing::Level::WARN, message, context);
    }

    fn error(&self, message: &str, context: &LogContext) {
        forward_event!(tracing::Level::ERROR, message, context);
    }

    fn is_enabled(&self, level: LogLevel) -> bool {
        match level {
            LogLevel::Trace => tracing::enabled!(tracing::Level::TRACE),
            LogLevel::Debug => tracing::enabled!(tracing::Level::DEBUG),
            LogLevel::Info => tracing::enabled!(tracing::Level::INFO),
            LogLevel::Warn => tracing::enabled!(tracing::Level::WARN),
            LogLevel::Error => tracing::enabled!(tracing::Level::ERROR),
        }
    }
}

/// Log entry captured by [`InMemoryLogger`].
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub context: LogContext,
    pub timestamp: DateTime<Utc>,
}

/// In-memory logger for testing.
pub struct InMemoryLogger {
    entries: Mutex<Vec<LogEntry>>,
    min_level: LogLevel,
}

impl InMemoryLogger {
    pub fn new() -> Self {
        Self::with_level(LogLevel::Trace)
    }

    /// Create in-memory logger with minimum level.
    pub fn with_level(min_level: LogLevel) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            min_level,
        }
    }

    /// Get all log entries.
    pub fn get_entries(&self) -> Vec<LogEntry> {
        lock(&self.entries).clone()
    }

    /// Get entries by level.
    pub fn get_entries_by_level(&self, level: LogLevel) -> Vec<LogEntry> {
        lock(&self.entries)
            .iter()
            .filter(|e| e.level == level)
            .cloned()
            .collect()
    }

    /// Count entries whose message contains `needle`.
    pub fn count_containing(&self, needle: &str) -> usize {
        lock(&self.entries)
            .iter()
            .filter(|e| e.message.contains(needle))
            .count()
    }

    /// Clear all entries.
    pub fn clear(&self) {
        lock(&self.entries).clear();
    }

    // A panicking test thread must not turn every later log call into a panic.
    fn log(&self, level: LogLevel, message: &str, context: &LogContext) {
        if level >= self.min_level {
            lock(&self.entries).push(LogEntry {
                level,
                message: message.to_string(),
                context: context.clone(),
                timestamp: Utc::now(),
            });
        }
    }
}

impl Default for InMemoryLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger for InMemoryLogger {
    fn trace(&self, message: &str, context: &LogContext) {
        self.log(LogLevel::Trace, message, context);
    }

    fn debug(&self, message: &str, context: &LogContext) {
        self.log(LogLevel::Debug, message, context);
    }

    fn info(&self, message: &str, context: &LogContext) {
        self.log(LogLevel::Info, message, context);
    }

    fn warn(&self, message: &str, context: &LogContext) {
        self.log(LogLevel::Warn, message, context);
    }

    fn error(&self, message: &str, context: &LogContext) {
        self.log(LogLevel::Error, message, context);
    }

    fn is_enabled(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }
}

/// Create in-memory logger for testing.
pub fn create_in_memory_logger() -> InMemoryLogger {
    InMemoryLogger::new()
}

/// Create the default logger.
pub fn create_tracing_logger() -> TracingLogger {
    TracingLogger
}
