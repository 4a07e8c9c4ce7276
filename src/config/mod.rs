use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::git::remote::repo_display_name;

pub mod parser;

pub const DEFAULT_BRANCH: &str = "master";
pub const DEFAULT_INTERVAL_SECONDS: u64 = 30;

/// Everything the watcher needs, fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
    pub repo: String,
    pub branch: String,
    /// Clone target. `None` means a temporary directory removed on exit.
    pub dir: Option<PathBuf>,
    pub key: Option<PathBuf>,
    pub interval_seconds: u64,
    pub command: String,
    pub args: Vec<String>,
    pub webhook: Option<String>,
    pub title: Option<String>,
}

impl WatchConfig {
    pub fn new(repo: &str, command: &str) -> Self {
        Self {
            repo: repo.to_string(),
            branch: DEFAULT_BRANCH.to_string(),
            dir: None,
            key: None,
            interval_seconds: DEFAULT_INTERVAL_SECONDS,
            command: command.to_string(),
            args: Vec::new(),
            webhook: None,
            title: None,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    /// Command and arguments joined with spaces, for logs.
    pub fn command_line(&self) -> String {
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Configured title, else a short name derived from the repo URL.
    pub fn notification_title(&self) -> String {
        self.title
            .clone()
            .or_else(|| repo_display_name(&self.repo).ok())
            .unwrap_or_else(|| self.repo.clone())
    }

    pub fn validate(&self) -> Result<()> {
        if self.repo.trim().is_empty() {
            anyhow::bail!("a repository URL is required (--repo)");
        }
        if self.command.trim().is_empty() {
            anyhow::bail!("a command to invoke is required");
        }
        if self.branch.trim().is_empty() {
            anyhow::bail!("branch name cannot be empty");
        }
        if self.interval_seconds == 0 {
            anyhow::bail!("interval must be at least one second");
        }
        Ok(())
    }
}

/// Optional YAML configuration file. Every key may be overridden on the
/// command line.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub repo: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default)]
    pub key: Option<PathBuf>,
    #[serde(default)]
    pub interval_seconds: Option<u64>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Option<Vec<String>>,
    #[serde(default)]
    pub webhook: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}
