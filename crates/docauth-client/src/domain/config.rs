//! Session configuration with validation.
//!
//! Everything here is consumed by [`AuthenticationSession::initialize`](crate::AuthenticationSession::initialize).

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Channel name used when no address is configured.
pub const DEFAULT_CHANNEL_NAME: &str = "docauth-engine";

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Directory the engine (and the CLI) write logs to
    pub logging_directory: PathBuf,
    /// Directory holding the engine's host data (templates, licences)
    pub host_data_directory: PathBuf,
    /// Channel to connect to; `None` uses [`DEFAULT_CHANNEL_NAME`]
    pub channel_address: Option<String>,
    /// Bound on connect plus handshake
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Deadline applied by `process` when the caller gives none;
    /// `None` waits for the engine
    #[serde(with = "humantime_serde::option")]
    pub default_deadline: Option<Duration>,
    /// Events buffered per observer before the oldest are dropped
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            logging_directory: PathBuf::from("./docauth-logs"),
            host_data_directory: PathBuf::from("./docauth-data"),
            channel_address: None,
            connect_timeout: Duration::from_secs(10),
            default_deadline: None,
            event_capacity: 1000,
        }
    }
}

impl SessionConfig {
    /// Defaults overlaid with environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `DOCAUTH_LOG_DIR`: logging directory
    /// - `DOCAUTH_HOST_DATA_DIR`: host data directory
    /// - `DOCAUTH_CHANNEL`: channel address
    /// - `DOCAUTH_CONNECT_TIMEOUT`: connect timeout (`"5s"`, `"500ms"`, `"2m"`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().overlay_env()
    }

    /// Apply environment overrides on top of `self`.
    pub fn overlay_env(self) -> Result<Self, ConfigError> {
        self.overlay_lookup(|key| env::var(key).ok())
    }

    /// Apply overrides from a custom variable source.
    pub fn overlay_lookup<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("DOCAUTH_LOG_DIR") {
            self.logging_directory = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("DOCAUTH_HOST_DATA_DIR") {
            self.host_data_directory = PathBuf::from(dir);
        }
        if let Some(address) = lookup("DOCAUTH_CHANNEL") {
            self.channel_address = Some(address);
        }
        if let Some(raw) = lookup("DOCAUTH_CONNECT_TIMEOUT") {
            self.connect_timeout = parse_duration(&raw).map_err(|reason| ConfigError::InvalidEnv {
                var: "DOCAUTH_CONNECT_TIMEOUT",
                value: raw.clone(),
                reason: reason.to_string(),
            })?;
        }
        Ok(self)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "connect_timeout cannot be 0".into(),
            ));
        }

        if self.default_deadline.is_some_and(|d| d.is_zero()) {
            return Err(ConfigError::InvalidTimeout(
                "default_deadline cannot be 0".into(),
            ));
        }

        if self.event_capacity == 0 {
            return Err(ConfigError::InvalidCapacity(
                "event_capacity cannot be 0".into(),
            ));
        }

        if let Some(address) = &self.channel_address {
            if address.trim().is_empty() {
                return Err(ConfigError::InvalidAddress(
                    "channel_address cannot be empty".into(),
                ));
            }
        }

        Ok(())
    }

    /// The channel to connect to.
    pub fn channel_address(&self) -> &str {
        self.channel_address.as_deref().unwrap_or(DEFAULT_CHANNEL_NAME)
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// Invalid buffer capacity
    #[error("invalid capacity: {0}")]
    InvalidCapacity(String),
    /// Invalid channel address
    #[error("invalid channel address: {0}")]
    InvalidAddress(String),
    /// Unparseable environment override
    #[error("invalid {var}={value:?}: {reason}")]
    InvalidEnv {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Parse `"500ms"`, `"5s"`, `"2m"` or a bare number of seconds.
pub fn parse_duration(s: &str) -> Result<Duration, &'static str> {
    let s = s.trim();
    // "ms" before "s" and "m": both are suffixes of it.
    if let Some(ms) = s.strip_suffix("ms") {
        ms.trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| "invalid milliseconds")
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| "invalid seconds")
    } else if let Some(mins) = s.strip_suffix('m') {
        let m = mins.trim().parse::<u64>().map_err(|_| "invalid minutes")?;
        m.checked_mul(60)
            .map(Duration::from_secs)
            .ok_or("duration too large")
    } else {
        s.parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| "invalid duration format")
    }
}

fn format_duration(duration: &Duration) -> String {
    if duration.subsec_nanos() == 0 {
        format!("{}s", duration.as_secs())
    } else {
        format!("{}ms", duration.as_millis())
    }
}

/// Humantime serde module for Duration serialization
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_duration(duration))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        super::parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};
        use std::time::Duration;

        pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match duration {
                Some(d) => serializer.serialize_some(&super::super::format_duration(d)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Option::<String>::deserialize(deserializer)?
                .map(|s| super::super::parse_duration(&s).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
