//! Structured milestone logging

use tracing_subscriber::EnvFilter;

/// Env var holding a `tracing` filter directive, e.g. `RNS_LOG=debug`.
pub const LOG_ENV: &str = "RNS_LOG";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }
}

/// One milestone or failure, as narrated to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: LogLevel,
    pub title: Option<String>,
    pub message: String,
    pub category: Option<String>,
}

impl LogRecord {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            title: None,
            message: message.into(),
            category: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }

    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn in_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Sink for structured log records. Raw process output never goes here.
pub trait Logger: Send + Sync {
    fn log(&self, record: LogRecord);
}

/// Forwards records to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, record: LogRecord) {
        let title = record.title.as_deref().unwrap_or_default();
        let category = record.category.as_deref().unwrap_or_default();
        match record.level {
            LogLevel::Info => tracing::info!(title, category, "{}", record.message),
            LogLevel::Warning => tracing::warn!(title, category, "{}", record.message),
            LogLevel::Error => tracing::error!(title, category, "{}", record.message),
        }
    }
}

/// Install the global subscriber. Output goes to stderr so stdout stays
/// free for script output.
pub fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_builders() {
        let record = LogRecord::warning("Failed to run bundle install")
            .titled("iOS gem preparations failed")
            .in_category("RN");

        assert_eq!(record.level, LogLevel::Warning);
        assert_eq!(record.title.as_deref(), Some("iOS gem preparations failed"));
        assert_eq!(record.category.as_deref(), Some("RN"));
        assert_eq!(record.level.as_str(), "WARNING");
    }

    #[test]
    fn test_tracing_logger_without_subscriber() {
        TracingLogger.log(LogRecord::error("nobody is listening"));
    }
}
