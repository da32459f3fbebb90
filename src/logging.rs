//! Tracing configuration and log routing.
//!
//! The service logs to stdout using a compact formatter, and to a file. When
//! `CHUNKRELAY_LOG_FILE` is set, logs are appended to that path; otherwise a file logger is
//! created under `logs/chunkrelay.log`. Background pipeline runs log inside a `pipeline` span
//! carrying `trace_id` and `doc_id`, so every file line can be tied back to its submission.
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Environment variable overriding the log file path.
pub const LOG_FILE_ENV: &str = "CHUNKRELAY_LOG_FILE";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_LOG_FILE: &str = "chunkrelay.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Configure tracing subscribers for stdout and file logging.
///
/// - Respects `RUST_LOG` for filtering (defaults to `info`).
/// - Installs a compact stdout layer and, when available, a file layer.
/// - Uses a global guard to keep the non-blocking writer alive for the process lifetime.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(false).compact();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    if let Some(writer) = configure_file_writer(std::env::var(LOG_FILE_ENV).ok()) {
        let file_layer = fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .compact();

        registry.with(file_layer).init();
    } else {
        registry.init();
    }
}

/// Build a non-blocking writer for file logging.
///
/// Returns `None` when the target file or the default logs directory cannot be created.
fn configure_file_writer(path: Option<String>) -> Option<NonBlocking> {
    let writer = match path.filter(|value| !value.trim().is_empty()) {
        Some(path) => match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
        {
            Ok(file) => {
                let (non_blocking, guard) = tracing_appender::non_blocking(file);
                let _ = LOG_GUARD.set(guard);
                non_blocking
            }
            Err(err) => {
                eprintln!("Failed to open log file {path}: {err}");
                return None;
            }
        },
        None => {
            if let Err(err) = std::fs::create_dir_all(DEFAULT_LOG_DIR) {
                eprintln!("Failed to create logs directory: {err}");
                return None;
            }
            let file_appender = tracing_appender::rolling::never(DEFAULT_LOG_DIR, DEFAULT_LOG_FILE);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let _ = LOG_GUARD.set(guard);
            non_blocking
        }
    };
    Some(writer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_log_path_is_opened() {
        let path = std::env::temp_dir().join(format!("chunkrelay-{}.log", std::process::id()));
        let writer = configure_file_writer(Some(path.display().to_string()));
        assert!(writer.is_some());
        assert!(path.exists());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn unwritable_log_path_disables_file_layer() {
        let path = std::env::temp_dir()
            .join("chunkrelay-missing-dir")
            .join("nested")
            .join("out.log");
        let writer = configure_file_writer(Some(path.display().to_string()));
        assert!(writer.is_none());
    }
}
