use std::io::Write;

use crate::{
    config::WatchConfig,
    exec::{CommandResult, command::run_command},
    log::{Level, Logger},
    notifications::Notifier,
};

/// Runs the configured command and reports the outcome.
///
/// Nothing here is fatal: failures end up in the logs and in the
/// notification color.
#[derive(Clone)]
pub struct Runner {
    command: String,
    args: Vec<String>,
    command_line: String,
    notifier: Option<Notifier>,
    logger: Logger,
}

impl Runner {
    pub fn new(config: &WatchConfig, logger: Logger) -> Self {
        let notifier = config
            .webhook
            .as_deref()
            .filter(|url| !url.is_empty())
            .map(|url| Notifier::new(url, &config.notification_title(), logger.clone()));

        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            command_line: config.command_line(),
            notifier,
            logger,
        }
    }

    pub async fn invoke(&self) -> CommandResult {
        self.logger
            .log(
                Level::Info,
                "running command",
                &[("command", &self.command_line)],
            )
            .await;

        let result = match run_command(&self.command, &self.args).await {
            Ok(out) => {
                let result = CommandResult {
                    success: out.status.success(),
                    status_code: out.status.code(),
                    output: out.output,
                };
                if result.success {
                    self.logger.info("success").await;
                } else {
                    self.logger.error("error while running command").await;
                    self.logger
                        .error(&format!("command exited with {}", out.status))
                        .await;
                }
                result
            }
            Err(e) => {
                self.logger.error("error while running command").await;
                self.logger.error(&e.to_string()).await;
                CommandResult::spawn_failed()
            }
        };

        print_output(&result.output);

        if let Some(notifier) = &self.notifier {
            notifier.notify(&result).await;
        }

        result
    }
}

fn print_output(output: &str) {
    let mut stdout = std::io::stdout().lock();
    let _ = stdout.write_all(output.as_bytes());
    let _ = stdout.flush();
}
