use std::{
    fs::File,
    io::{self, SeekFrom},
    process::Stdio,
};

use tokio::{
    io::{AsyncReadExt, AsyncSeekExt},
    process::Command,
};

pub mod command;
pub mod runner;

/// Outcome of one command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub success: bool,
    pub status_code: Option<i32>,
    /// stdout and stderr, interleaved in write order.
    pub output: String,
}

impl CommandResult {
    pub fn spawn_failed() -> Self {
        Self {
            success: false,
            status_code: None,
            output: String::new(),
        }
    }
}

/// Scratch file shared by the child's stdout and stderr.
///
/// Both descriptors point at the same open file, so writes from either
/// stream land in the order they happened.
pub struct CombinedOutput {
    file: File,
}

impl CombinedOutput {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            file: tempfile::tempfile()?,
        })
    }

    fn configure(&self, cmd: &mut Command) -> io::Result<()> {
        cmd.stdout(Stdio::from(self.file.try_clone()?));
        cmd.stderr(Stdio::from(self.file.try_clone()?));
        Ok(())
    }

    async fn collect(self) -> io::Result<String> {
        let mut file = tokio::fs::File::from_std(self.file);
        file.seek(SeekFrom::Start(0)).await?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).await?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}
