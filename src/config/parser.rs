use std::{fs, path::Path};

use anyhow::{Context, Result};

use crate::config::FileConfig;

/// Environment variable read when the webhook is written as a bare `$`.
pub const WEBHOOK_ENV: &str = "GITWATCH_WEBHOOK";

pub fn load_config(path: &Path) -> Result<FileConfig> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Error reading config file {path:?}"))?;

    let mut config: FileConfig =
        serde_yaml::from_str(&content).with_context(|| "Error parsing YAML configuration file")?;

    if let Some(webhook) = config.webhook.as_mut() {
        *webhook = resolve_env_value(webhook, WEBHOOK_ENV)?;
    }

    Ok(config)
}

/// `$NAME` is replaced by the value of `NAME`, a bare `$` by the value of
/// `default_env_name`. Anything else is returned unchanged.
pub fn resolve_env_value(value: &str, default_env_name: &str) -> Result<String> {
    let Some(env_key) = value.strip_prefix('$') else {
        return Ok(value.to_string());
    };
    let env_key = if env_key.is_empty() {
        default_env_name
    } else {
        env_key
    };

    std::env::var(env_key).with_context(|| format!("environment variable ${env_key} is not set"))
}
