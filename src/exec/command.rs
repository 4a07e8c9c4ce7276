use std::{io, process::ExitStatus};

use tokio::process::Command;

use crate::exec::CombinedOutput;

pub struct CommandOutput {
    pub status: ExitStatus,
    pub output: String,
}

/// Spawns `program` and waits for it, without timeout.
///
/// Returns `Err` only when the process could not be started or its output
/// could not be read back; a non-zero exit is reported through `status`.
pub async fn run_command(program: &str, args: &[String]) -> io::Result<CommandOutput> {
    let combined = CombinedOutput::new()?;

    let mut cmd = Command::new(program);
    cmd.args(args);
    combined.configure(&mut cmd)?;

    let status = cmd.spawn()?.wait().await?;
    let output = combined.collect().await?;

    Ok(CommandOutput { status, output })
}
