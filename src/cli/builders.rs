use anyhow::Result;

use crate::{
    cli::Cli,
    config::{
        FileConfig, WatchConfig,
        parser::{WEBHOOK_ENV, load_config, resolve_env_value},
    },
    log::{Level, Logger},
};

/// Builds the [`WatchConfig`] from the command line, falling back to the
/// configuration file given with `--config`, then to defaults.
pub fn build_watch_config(cli: &Cli) -> Result<WatchConfig> {
    let file = match &cli.config {
        Some(path) => load_config(path)?,
        None => FileConfig::default(),
    };
    merge(cli, file)
}

/// Command-line values win over file values.
pub fn merge(cli: &Cli, file: FileConfig) -> Result<WatchConfig> {
    let repo = cli.repo.clone().or(file.repo).unwrap_or_default();

    // positional args only count when the command itself came from the CLI
    let (command, args) = match &cli.cmd {
        Some(cmd) => (cmd.clone(), cli.args.clone()),
        None => (
            file.command.unwrap_or_default(),
            file.args.unwrap_or_default(),
        ),
    };

    let mut config = WatchConfig::new(&repo, &command);
    config.args = args;
    if let Some(branch) = cli.branch.clone().or(file.branch) {
        config.branch = branch;
    }
    if let Some(interval) = cli.interval_seconds.or(file.interval_seconds) {
        config.interval_seconds = interval;
    }
    config.dir = cli.dir.clone().or(file.dir);
    config.key = cli.key.clone().or(file.key);
    config.webhook = match cli.webhook.as_deref() {
        Some(url) => Some(resolve_env_value(url, WEBHOOK_ENV)?),
        None => file.webhook,
    }
    .filter(|url| !url.is_empty());
    config.title = cli.title.clone().or(file.title);

    config.validate()?;
    Ok(config)
}

pub async fn build_logger(cli: &Cli) -> Result<Logger> {
    let level = if cli.verbose {
        Level::Debug
    } else {
        Level::Info
    };
    match &cli.log_file {
        Some(path) => Logger::new(path, level).await,
        None => Ok(Logger::stdout(level)),
    }
}
