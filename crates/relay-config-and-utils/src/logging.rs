//! Logging initialization for the relay processes.

use crate::Paths;

/// Initialize logging for the background process.
///
/// Structured JSONL goes to `<base>/logs/relay.jsonl`, and a compact copy to
/// stderr when `foreground` is set. `RUST_LOG` overrides `level`.
pub fn init_logging(level: &str, paths: &Paths, foreground: bool) {
    observability::init_with_config(observability::LogConfig {
        service_name: "relay".into(),
        default_level: level.into(),
        log_path: Some(paths.log_file()),
        also_stderr: foreground,
    });
}

/// Initialize stderr logging for one-shot client commands.
pub fn init_client_logging(level: &str) {
    observability::init_stderr(level);
}
