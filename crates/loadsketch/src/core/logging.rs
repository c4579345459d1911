//! Logging infrastructure for the diagram editor
//!
//! This module provides structured logging using the `tracing` crate.
//! It supports configurable log levels and formats, and works in the browser
//! build where the editor session is hosted by a web page.
//!
//! # Usage
//!
//! ```rust
//! use loadsketch::core::logging::init_logging;
//!
//! // Level from LOADSKETCH_LOG_LEVEL or RUST_LOG, compact format
//! init_logging(None, None)?;
//!
//! // A subscriber is installed once per process; later calls report an error
//! assert!(init_logging(Some("debug"), Some("pretty")).is_err());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Log Levels
//!
//! - `trace`: Very detailed information, typically only interesting when debugging
//! - `debug`: Detailed information for debugging
//! - `info`: General informational messages (default)
//! - `warn`: Warning messages
//! - `error`: Error messages
//!
//! # Log Formats
//!
//! - `compact`: Single-line format, good for production
//! - `pretty`: Multi-line format with colors, good for development
//! - `json`: JSON format, good for log aggregation systems
//!
//! All formats write to stderr; stdout carries command output only.
//!
//! # Environment Variables
//!
//! Logging can be configured via environment variables:
//! - `LOADSKETCH_LOG_LEVEL`: Set log level (trace|debug|info|warn|error)
//! - `RUST_LOG`: Alternative way to set log level (tracing-subscriber standard)
//!
//! - `LOADSKETCH_LOG_FORMAT`: Set log format (compact|pretty|json)
//!
//! # WASM Compatibility
//!
//! On `wasm32` targets `tracing-wasm` replaces `tracing-subscriber` and all
//! events go to the browser console.
//!
//! # Tracing Conventions
//!
//! Editor components emit events at these levels:
//!
//! - `trace`: every store mutation and interaction transition, with ids
//! - `debug`: resulting counts, history index moves, overloaded nodes
//! - `info`: one span per traffic calculation and per document import
//! - `warn`: traffic calculation requested without a users node
//!
//! ```rust
//! use tracing::{debug, span, trace, Level};
//!
//! let calc_span = span!(Level::INFO, "calculate_traffic", node_count = 3);
//! let _enter = calc_span.enter();
//! trace!(node_id = 1, rps = 100.0, "Node rate computed");
//! debug!(overloaded = 0, "Traffic calculation completed");
//! ```
//!
//! # Filtering Logs
//!
//! You can filter logs by component using the log level syntax:
//!
//! ```bash
//! # Show only the traffic engine at trace level
//! RUST_LOG="loadsketch::editor::traffic=trace" loadsketch calculate -i diagram.json
//!
//! # Show all logs at info level, but interaction transitions at trace level
//! RUST_LOG="info,loadsketch::editor::interaction=trace" loadsketch replay -i diagram.json --script events.json
//! ```

use std::str::FromStr;

#[cfg(not(target_arch = "wasm32"))]
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

#[cfg(target_arch = "wasm32")]
use tracing_wasm::WASMLayerConfig;

/// Environment variable consulted for the log level
pub const LEVEL_ENV: &str = "LOADSKETCH_LOG_LEVEL";

/// Environment variable consulted for the log format
pub const FORMAT_ENV: &str = "LOADSKETCH_LOG_FORMAT";

/// Log format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Compact single-line format
    #[default]
    Compact,
    /// Pretty multi-line format with colors
    Pretty,
    /// JSON format for log aggregation
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

impl LogFormat {
    /// Get all valid format names
    pub fn variants() -> &'static [&'static str] {
        &["compact", "pretty", "json"]
    }
}

/// Resolve the effective level string: argument, then environment, then `info`
pub fn resolve_level(level: Option<&str>) -> String {
    level
        .map(str::to_string)
        .or_else(|| std::env::var(LEVEL_ENV).ok())
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| "info".to_string())
}

/// Resolve the effective format: argument, then environment, then compact
pub fn resolve_format(format: Option<&str>) -> Result<LogFormat, String> {
    match format
        .map(str::to_string)
        .or_else(|| std::env::var(FORMAT_ENV).ok())
    {
        Some(name) => {
            LogFormat::from_str(&name).map_err(|e| format!("Invalid log format: {}", e))
        }
        None => Ok(LogFormat::default()),
    }
}

/// Initialize the tracing subscriber with the given log level and format
///
/// # Arguments
///
/// * `level` - Optional log level or filter directive (trace|debug|info|warn|error|off).
///            If None, uses `LOADSKETCH_LOG_LEVEL` or `RUST_LOG`, or defaults to `info`.
/// * `format` - Optional log format (compact|pretty|json).
///             If None, uses `LOADSKETCH_LOG_FORMAT`, or defaults to `compact`.
///
/// # Returns
///
/// Returns an error for an unknown format, or if a global subscriber is
/// already installed.
///
/// # Example
///
/// ```rust
/// use loadsketch::core::logging::init_logging;
///
/// // Errors only when a subscriber is already installed
/// let _ = init_logging(Some("debug"), Some("pretty"));
/// ```
pub fn init_logging(
    level: Option<&str>,
    format: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(target_arch = "wasm32")]
    {
        // tracing-wasm writes to the browser console; level and format
        // selection are not configurable there
        let _ = (level, format);
        tracing_wasm::set_as_global_default_with_config(WASMLayerConfig::default());
        Ok(())
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        let log_level = resolve_level(level);
        let format = resolve_format(format)?;

        let filter = if log_level == "off" {
            EnvFilter::new("off")
        } else {
            EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("info"))
        };

        let registry = Registry::default().with(filter);
        match format {
            LogFormat::Compact => registry
                .with(
                    fmt::Layer::default()
                        .with_writer(std::io::stderr)
                        .with_target(false)
                        .with_level(true)
                        .with_span_events(FmtSpan::NONE)
                        .compact(),
                )
                .try_init()?,
            LogFormat::Pretty => registry
                .with(
                    fmt::Layer::default()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_file(true)
                        .with_line_number(true)
                        .with_span_events(FmtSpan::CLOSE)
                        .pretty(),
                )
                .try_init()?,
            LogFormat::Json => registry
                .with(
                    fmt::Layer::default()
                        .with_writer(std::io::stderr)
                        .json()
                        .with_current_span(true)
                        .with_target(true)
                        .with_span_events(FmtSpan::CLOSE),
                )
                .try_init()?,
        }

        Ok(())
    }
}

/// Initialize logging with default settings (info level, compact format)
pub fn init_default_logging() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(None, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!(LogFormat::from_str("compact").unwrap(), LogFormat::Compact);
        assert_eq!(LogFormat::from_str("Pretty").unwrap(), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str("JSON").unwrap(), LogFormat::Json);
        assert!(LogFormat::from_str("xml").is_err());
    }

    #[test]
    fn test_explicit_arguments_win() {
        assert_eq!(resolve_level(Some("trace")), "trace");
        assert_eq!(resolve_format(Some("json")), Ok(LogFormat::Json));
        assert!(resolve_format(Some("yaml")).is_err());
    }
}
