//! Structured logging support using the `tracing` crate.
//!
//! The library itself only emits `tracing` events (wrapper construction,
//! re-initialisation, state loads, optimizer steps). This module installs a
//! subscriber for binaries and experiments that want to see them.
//!
//! Only available with the `structured-logging` feature:
//!
//! ```toml
//! [dependencies]
//! evolvable-optim = { version = "0.1", features = ["structured-logging"] }
//! ```
//!
//! # Examples
//!
//! ```no_run
//! use evolvable_optim::structured_logging::{LogFormat, LogLevel, TracingLogger};
//!
//! let logger = TracingLogger::builder()
//!     .with_format(LogFormat::Json)
//!     .with_level(LogLevel::Debug)
//!     .build()
//!     .expect("Failed to initialize logger");
//! ```

use crate::{OptimError, OptimResult};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors (for development).
    Pretty,
    /// Compact format without colors.
    Compact,
    /// JSON format (for machine parsing and log aggregation).
    Json,
}

/// Log level filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Configuration builder for structured logging.
#[derive(Debug, Clone)]
pub struct TracingLoggerBuilder {
    format: LogFormat,
    level: LogLevel,
    env_filter: Option<String>,
    with_targets: bool,
    with_file_location: bool,
}

impl Default for TracingLoggerBuilder {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            level: LogLevel::Info,
            env_filter: None,
            with_targets: true,
            with_file_location: false,
        }
    }
}

impl TracingLoggerBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output format.
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the minimum log level.
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Set a custom environment filter (overrides level setting).
    ///
    /// ```
    /// # use evolvable_optim::structured_logging::TracingLoggerBuilder;
    /// let builder = TracingLoggerBuilder::new().with_env_filter("evolvable_optim=trace");
    /// ```
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Include target names in logs (module paths).
    pub fn with_targets(mut self, enabled: bool) -> Self {
        self.with_targets = enabled;
        self
    }

    /// Include file locations (file:line) in logs.
    pub fn with_file_location(mut self, enabled: bool) -> Self {
        self.with_file_location = enabled;
        self
    }

    /// Build and install the global subscriber. Fails if one is already installed.
    pub fn build(self) -> OptimResult<TracingLogger> {
        let env_filter = match &self.env_filter {
            Some(custom) => EnvFilter::try_new(custom).map_err(|e| {
                OptimError::ConfigurationError(format!("Invalid env filter: {}", e))
            })?,
            None => EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.level.as_str())),
        };

        let layer = fmt::layer()
            .with_target(self.with_targets)
            .with_file(self.with_file_location)
            .with_line_number(self.with_file_location);

        let registry = tracing_subscriber::registry().with(env_filter);
        let installed = match self.format {
            LogFormat::Pretty => registry.with(layer.pretty()).try_init(),
            LogFormat::Compact => registry.with(layer.with_ansi(false).compact()).try_init(),
            LogFormat::Json => registry.with(layer.json()).try_init(),
        };
        installed.map_err(|e| {
            OptimError::ConfigurationError(format!("Failed to initialize tracing: {}", e))
        })?;

        Ok(TracingLogger {
            format: self.format,
        })
    }
}

/// Handle to the installed `tracing` subscriber.
#[derive(Debug)]
pub struct TracingLogger {
    format: LogFormat,
}

impl TracingLogger {
    pub fn builder() -> TracingLoggerBuilder {
        TracingLoggerBuilder::new()
    }

    /// Pretty format at info level.
    pub fn init() -> OptimResult<Self> {
        Self::builder().build()
    }

    /// Pretty format at debug level with file locations.
    pub fn init_development() -> OptimResult<Self> {
        Self::builder()
            .with_level(LogLevel::Debug)
            .with_file_location(true)
            .build()
    }

    pub fn format(&self) -> LogFormat {
        self.format
    }
}
