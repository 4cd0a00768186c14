//! Logging setup
//!
//! Diagnostics go to stderr through `tracing`; stdout is left to script
//! output and results.
//!
//! - `RUST_LOG`: filter directives (e.g. `memory_profiler=debug`)
//! - `HEAP_PROBE_LOG_FORMAT`: `pretty` (default) or `json`
//!
//! Command-line flags take precedence over both.

use std::str::FromStr;
use std::{env, io};

use tracing::Level;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::error::{CliError, CliResult};

/// Environment variable selecting the log format
pub const LOG_FORMAT_ENV: &str = "HEAP_PROBE_LOG_FORMAT";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("unknown log format: {s}; use 'pretty' or 'json'")),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Errors only
    Error,
    /// Warnings and errors
    Warn,
    /// Session lifecycle
    Info,
    /// Walk and mirror details
    Debug,
    /// Every host call
    Trace,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(format!(
                "unknown log level: {s}; use 'error', 'warn', 'info', 'debug' or 'trace'"
            )),
        }
    }
}

/// Format to use when no flag is given.
pub fn format_from_env() -> LogFormat {
    env::var(LOG_FORMAT_ENV)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_default()
}

/// Filter for an explicit level, else `RUST_LOG`, else `warn`.
pub fn build_filter(level: Option<LogLevel>) -> EnvFilter {
    match level {
        Some(level) => EnvFilter::new(Level::from(level).to_string()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::WARN.to_string())),
    }
}

/// Install the global subscriber.
pub fn init_logging(level: Option<LogLevel>, format: Option<LogFormat>) -> CliResult<()> {
    let filter = build_filter(level);
    let result = match format.unwrap_or_else(format_from_env) {
        LogFormat::Pretty => {
            let layer = fmt::layer()
                .with_target(true)
                .with_writer(io::stderr)
                .with_filter(filter);
            Registry::default().with(layer).try_init()
        }
        LogFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_target(true)
                .with_current_span(true)
                .with_span_list(true)
                .with_writer(io::stderr)
                .with_filter(filter);
            Registry::default().with(layer).try_init()
        }
    };
    result.map_err(|e| CliError::Logging(e.to_string()))
}
