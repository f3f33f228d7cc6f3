//! Tracing setup: compact stderr output plus a non-blocking file layer.
//!
//! Filtering is controlled by `KEYWARP_LOG` (EnvFilter syntax, default
//! `info`). The file layer writes to `<data dir>/keywarp/keywarp.log`; the
//! returned `WorkerGuard` must be held by `main` for the process lifetime or
//! buffered lines are lost on exit.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const LOG_ENV_VAR: &str = "KEYWARP_LOG";
const LOG_FILE: &str = "keywarp.log";

/// Directory holding the log file.
pub fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(std::env::temp_dir)
        .join("keywarp")
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Returns the file writer guard, or `None`
/// when the log directory could not be created (stderr logging still works).
pub fn init() -> Option<WorkerGuard> {
    let dir = log_dir();
    let file_layer = match std::fs::create_dir_all(&dir) {
        Ok(()) => {
            let appender = tracing_appender::rolling::never(&dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            Some((layer, guard))
        }
        Err(err) => {
            eprintln!(
                "keywarp: cannot create log dir {}: {err}; logging to stderr only",
                dir.display()
            );
            None
        }
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .compact();

    match file_layer {
        Some((file, guard)) => {
            tracing_subscriber::registry()
                .with(env_filter())
                .with(stderr_layer)
                .with(file)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter())
                .with(stderr_layer)
                .init();
            None
        }
    }
}
