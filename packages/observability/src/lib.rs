//! # Observability
//!
//! Centralized logging for the tbrelay processes.
//!
//! Processes call [`init_with_config`] (or [`init_stderr`] for short-lived
//! commands) once at startup and use plain `tracing` macros everywhere else.
//!
//! ## File output
//!
//! Structured JSONL is appended to `~/.tbrelay/logs/relay.jsonl` unless a
//! different path is configured:
//!
//! - `tail -f ~/.tbrelay/logs/relay.jsonl | jq` for pretty JSON
//! - `lnav ~/.tbrelay/logs/relay.jsonl` for interactive exploration
//!
//! ## Usage
//!
//! ```rust,ignore
//! fn main() {
//!     observability::init_with_config(observability::LogConfig {
//!         service_name: "relay".into(),
//!         default_level: "debug".into(),
//!         also_stderr: true,
//!         ..Default::default()
//!     });
//!
//!     tracing::info!("service started");
//! }
//! ```

mod file;
mod json_layer;

use std::path::PathBuf;

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service (e.g., "relay", "cli").
    /// Included in every log line for filtering.
    pub service_name: String,

    /// Default log level filter (e.g., "debug", "info", "warn").
    /// Can be overridden by `RUST_LOG` environment variable.
    pub default_level: String,

    /// Optional custom log file path.
    /// Defaults to `~/.tbrelay/logs/relay.jsonl`.
    pub log_path: Option<PathBuf>,

    /// Also emit logs to stderr for immediate feedback.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
        }
    }
}

/// Initialize with custom configuration.
///
/// If the log file cannot be opened, logging goes to stderr only.
pub fn init_with_config(config: LogConfig) {
    if let Err(e) = file::init_file_subscriber(&config) {
        init_stderr(&config.default_level);
        tracing::warn!(error = %e, "log file unavailable, logging to stderr");
    }
}

/// Initialize a compact stderr-only subscriber.
///
/// Used by short-lived client commands that should not write to the log file.
pub fn init_stderr(default_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}
