use clap::Parser;

use gitwatch::{
    cli::{
        Cli,
        builders::{build_logger, build_watch_config},
    },
    core::manager::run,
};

async fn start(cli: Cli) -> anyhow::Result<u8> {
    let logger = build_logger(&cli).await?;
    let config = build_watch_config(&cli)?;
    Ok(run(config, logger).await)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match start(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            1
        }
    };
    // leave without waiting on blocking git calls still in flight
    std::process::exit(i32::from(code));
}
