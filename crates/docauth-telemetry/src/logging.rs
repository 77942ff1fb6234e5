//! Subscriber setup: env filter, console layer and the optional JSON log file.
//!
//! File records are JSON lines with the standard `tracing-subscriber` fields
//! (`timestamp`, `level`, `target`, `fields`, `span`), so the same file can be
//! read by people and shipped by a log agent.

use std::fs::{self, OpenOptions};
use std::sync::Mutex;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::{TelemetryConfig, TelemetryError};

/// Install the global subscriber described by `config`.
pub(crate) fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| TelemetryError::Config(e.to_string()))?;

    let console_layer = if config.console_output {
        Some(if config.json_logs {
            tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_ansi(true)
                .boxed()
        })
    } else {
        None
    };

    let file_layer = match (&config.log_dir, config.log_file_path()) {
        (Some(dir), Some(path)) => {
            fs::create_dir_all(dir).map_err(|source| TelemetryError::LogFile {
                path: path.clone(),
                source,
            })?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|source| TelemetryError::LogFile {
                    path: path.clone(),
                    source,
                })?;
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(Mutex::new(file)),
            )
        }
        _ => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| TelemetryError::SubscriberInit(e.to_string()))?;

    tracing::info!(
        service = %config.service_name,
        log_file = ?config.log_file_path(),
        "Logging initialized"
    );

    Ok(())
}
