use std::{
    fmt,
    io::IsTerminal,
    path::Path,
    sync::Arc,
};

use chrono::Local;
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
}

impl Level {
    fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type Sink = Box<dyn AsyncWrite + Send + Unpin>;

/// Cloneable logging handle. Every clone writes to the same sink.
#[derive(Clone)]
pub struct Logger {
    sink: Arc<Mutex<Sink>>,
    level: Level,
    color_enable: bool,
}

const RESET: &str = "\x1b[0m";
const BG_GREY: &str = "\x1b[100m"; // debug
const BG_BLUE: &str = "\x1b[44m"; // info
const BG_ORANGE: &str = "\x1b[48;5;208m"; // warning
const BG_RED: &str = "\x1b[41m";
const FG_BOLD_WHITE: &str = "\x1b[97;1m";

/// Badges are painted only on a terminal, and `GITWATCH_NO_COLOR=1` turns
/// them off there too.
fn use_color(no_color: Option<&str>, terminal: bool) -> bool {
    terminal && no_color != Some("1")
}

impl Logger {
    /// Logger writing to the process standard output.
    pub fn stdout(level: Level) -> Self {
        Self {
            sink: Arc::new(Mutex::new(Box::new(tokio::io::stdout()))),
            level,
            color_enable: use_color(
                std::env::var("GITWATCH_NO_COLOR").ok().as_deref(),
                std::io::stdout().is_terminal(),
            ),
        }
    }

    /// Logger appending to the file at `path`, created if missing.
    pub async fn new(path: &Path, level: Level) -> anyhow::Result<Self> {
        let file = tokio::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .await?;
        Ok(Self {
            sink: Arc::new(Mutex::new(Box::new(file))),
            level,
            color_enable: false,
        })
    }

    /// Logger that drops everything.
    pub fn placeholder() -> Self {
        Self {
            sink: Arc::new(Mutex::new(Box::new(tokio::io::sink()))),
            level: Level::Error,
            color_enable: false,
        }
    }

    pub fn enabled(&self, level: Level) -> bool {
        level >= self.level
    }

    fn paint_level(&self, level: Level) -> String {
        if !self.color_enable {
            return level.to_string();
        }
        let bg = match level {
            Level::Debug => BG_GREY,
            Level::Info => BG_BLUE,
            Level::Warning => BG_ORANGE,
            Level::Error => BG_RED,
        };
        format!("{bg}{FG_BOLD_WHITE} {level} {RESET}")
    }

    /// Writes one line with optional `key=value` fields appended.
    pub async fn log(&self, level: Level, msg: &str, fields: &[(&str, &str)]) {
        if !self.enabled(level) {
            return;
        }
        let now = Local::now();
        let line = format!(
            "[{}] {}: {}{}\n",
            now.format("%Y-%m-%d %H:%M:%S"),
            self.paint_level(level),
            msg,
            format_fields(fields)
        );

        let mut sink = self.sink.lock().await;
        if let Err(e) = sink.write_all(line.as_bytes()).await {
            eprintln!("failed to write log line: {e}");
            return;
        }
        if let Err(e) = sink.flush().await {
            eprintln!("failed to flush log: {e}");
        }
    }

    /// [`Logger::log`] for code running on the blocking thread pool. Outside
    /// a runtime the line is dropped.
    pub fn log_blocking(&self, level: Level, msg: &str, fields: &[(&str, &str)]) {
        if !self.enabled(level) {
            return;
        }
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.block_on(self.log(level, msg, fields));
        }
    }

    pub async fn debug(&self, msg: &str) {
        self.log(Level::Debug, msg, &[]).await
    }

    pub async fn info(&self, msg: &str) {
        self.log(Level::Info, msg, &[]).await
    }

    pub async fn warning(&self, msg: &str) {
        self.log(Level::Warning, msg, &[]).await
    }

    pub async fn error(&self, msg: &str) {
        self.log(Level::Error, msg, &[]).await
    }
}

/// Renders fields as ` key=value`, quoting values that contain whitespace
/// or quotes.
pub fn format_fields(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(key, value)| {
            if value.is_empty() || value.contains(|c: char| c.is_whitespace() || c == '"') {
                format!(" {key}={value:?}")
            } else {
                format!(" {key}={value}")
            }
        })
        .collect()
}
