//! # DocAuth Telemetry
//!
//! Logging and metrics for the document authentication client.
//!
//! ## Components
//!
//! - **Logs**: `tracing-subscriber` registry with an env filter, a console
//!   layer (pretty or JSON) and an optional JSON-lines file in the session's
//!   logging directory.
//! - **Metrics**: Prometheus collectors for exchanges, engine events, listener
//!   failures and open sessions.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docauth_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = TelemetryConfig::from_env().with_log_dir("./docauth-logs");
//!     let _guard = init_telemetry(&config)?;
//!     // ...
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `DOCAUTH_SERVICE_NAME` | `docauth` | Service name in the startup record |
//! | `DOCAUTH_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `DOCAUTH_CONSOLE_OUTPUT` | `true` | Console output on/off |
//! | `DOCAUTH_JSON_LOGS` | `false` | JSON console output |
//! | `DOCAUTH_LOG_DIR` | unset | Directory for `docauth.log` |

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use metrics::{
    register_metrics, MetricsHandle, ENGINE_EVENTS_TOTAL, EXCHANGES_IN_FLIGHT, EXCHANGES_TOTAL,
    EXCHANGE_DURATION, LISTENER_FAILURES, SESSIONS_OPEN,
};

use std::path::PathBuf;
use thiserror::Error;

/// File name of the JSON log inside the log directory.
pub const LOG_FILE_NAME: &str = "docauth.log";

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to install tracing subscriber: {0}")]
    SubscriberInit(String),

    #[error("Failed to open log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and register metrics.
///
/// Returns a guard to hold for the lifetime of the application. Calling this
/// a second time in one process fails with [`TelemetryError::SubscriberInit`].
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    // Metrics first so early log lines can already be counted against them.
    let metrics = register_metrics()?;
    logging::init_logging(config)?;

    Ok(TelemetryGuard { metrics })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    metrics: MetricsHandle,
}

impl TelemetryGuard {
    pub fn metrics(&self) -> &MetricsHandle {
        &self.metrics
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry");
    }
}
