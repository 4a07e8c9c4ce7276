use std::path::PathBuf;

use clap::Parser;

pub mod builders;

#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "gitwatch",
    author,
    version,
    about = "Watch a git repo and execute a command on updates.",
    long_about = None
)]
pub struct Cli {
    /// Verbose logging
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Seconds to wait between checks [default: 30]
    #[arg(long, value_name = "SECONDS", value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_seconds: Option<u64>,

    /// Directory where the repo is cloned. Defaults to a temporary directory
    /// that is removed on exit
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Location of the ssh private key
    #[arg(long)]
    pub key: Option<PathBuf>,

    /// Git repo to watch
    #[arg(long)]
    pub repo: Option<String>,

    /// Branch to clone and watch [default: master]
    #[arg(short = 'b', long)]
    pub branch: Option<String>,

    /// Webhook URL receiving a report after each invocation
    #[arg(long, visible_alias = "slack-webhook")]
    pub webhook: Option<String>,

    /// Title used in webhook reports, to identify where this process runs
    #[arg(long, visible_alias = "slack-title")]
    pub title: Option<String>,

    /// YAML file with default values for the options above
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Append logs to this file instead of standard output
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Command to invoke
    pub cmd: Option<String>,

    /// Argument(s) to the command
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}
