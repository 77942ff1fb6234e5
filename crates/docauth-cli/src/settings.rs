//! Session settings resolution: TOML file, then environment, then flags.

use crate::cli::Args;
use anyhow::{Context, Result};
use docauth_client::SessionConfig;
use std::fs;

/// Resolve the session configuration from the process environment.
pub fn load_session_config(args: &Args) -> Result<SessionConfig> {
    load_session_config_with(args, |key| std::env::var(key).ok())
}

/// Resolve the session configuration with a custom variable lookup.
pub fn load_session_config_with<F>(args: &Args, lookup: F) -> Result<SessionConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let base = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            toml::from_str(&text)
                .with_context(|| format!("invalid config file {}", path.display()))?
        }
        None => SessionConfig::default(),
    };

    let mut config = base.overlay_lookup(lookup)?;

    if let Some(channel) = &args.channel {
        config.channel_address = Some(channel.clone());
    }
    if let Some(dir) = &args.log_dir {
        config.logging_directory = dir.clone();
    }
    if let Some(dir) = &args.host_data_dir {
        config.host_data_directory = dir.clone();
    }

    config.validate()?;
    Ok(config)
}
