//! Telemetry
//!
//! Structured logging for Keycloak operations. The default logger forwards to
//! `tracing`; tests capture lines with the in-memory logger.

pub mod logging;

pub use logging::{
    create_in_memory_logger, create_tracing_logger, InMemoryLogger, LogContext, LogEntry,
    LogLevel, Logger, NoOpLogger, TracingLogger,
};
