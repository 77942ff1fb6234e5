//! Telemetry configuration from environment variables.

use std::env;
use std::path::PathBuf;

/// Configuration for logging output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name attached to the startup log line
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error) or a full
    /// `EnvFilter` directive string
    pub log_level: String,

    /// Whether to enable console output
    pub console_output: bool,

    /// Whether console output is JSON instead of human-readable
    pub json_logs: bool,

    /// Directory receiving `docauth.log` (JSON lines); `None` disables file output
    pub log_dir: Option<PathBuf>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "docauth".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
            log_dir: None,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `DOCAUTH_SERVICE_NAME`: Service name (default: docauth)
    /// - `DOCAUTH_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `DOCAUTH_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `DOCAUTH_JSON_LOGS`: JSON console output (default: false)
    /// - `DOCAUTH_LOG_DIR`: Directory for the JSON log file (default: none)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            service_name: lookup("DOCAUTH_SERVICE_NAME").unwrap_or(defaults.service_name),

            log_level: lookup("DOCAUTH_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or(defaults.log_level),

            console_output: lookup("DOCAUTH_CONSOLE_OUTPUT")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(defaults.console_output),

            json_logs: lookup("DOCAUTH_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(defaults.json_logs),

            log_dir: lookup("DOCAUTH_LOG_DIR")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }

    /// Write JSON log lines under `dir`.
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// Path of the log file, if file output is enabled.
    pub fn log_file_path(&self) -> Option<PathBuf> {
        self.log_dir.as_ref().map(|dir| dir.join(crate::LOG_FILE_NAME))
    }
}
