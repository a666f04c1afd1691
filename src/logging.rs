//! Tracing setup: console output filtered by `RUST_LOG` (or the debug flag)
//! plus an error log file collecting warnings and errors of one run.

use chrono::Local;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Error log file name for a run started now
pub fn error_log_name() -> String {
    format!("error_log_{}.txt", Local::now().format("%Y-%m-%d_%H-%M-%S"))
}

/// Default directory for error logs
pub fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("armament-helper")
        .join("logs")
}

fn default_filter(debug: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "info" }))
}

/// Install the global subscriber.
///
/// Returns the error log path when `log_dir` was given. Calling this more
/// than once keeps the first subscriber.
pub fn init_tracing(debug: bool, json: bool, log_dir: Option<&Path>) -> io::Result<Option<PathBuf>> {
    let error_log = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let path = dir.join(error_log_name());
            let file = File::create(&path)?;
            Some((path, file))
        }
        None => None,
    };

    let (path, file_layer) = match error_log {
        Some((path, file)) => {
            let layer = fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_filter(LevelFilter::WARN);
            (Some(path), Some(layer))
        }
        None => (None, None),
    };

    let console = fmt::layer().with_filter(default_filter(debug));
    let (plain, structured) = if json {
        (None, Some(fmt::layer().json().flatten_event(true).with_filter(default_filter(debug))))
    } else {
        (Some(console), None)
    };

    let _ = tracing_subscriber::registry()
        .with(plain)
        .with(structured)
        .with(file_layer)
        .try_init();

    Ok(path)
}
