use anyhow::Result;
use reqwest::{Client, StatusCode};

use crate::{exec::CommandResult, log::Logger, notifications::SlackMessage};

/// Posts invocation reports to a webhook. Best effort, never retried.
#[derive(Clone)]
pub struct Notifier {
    client: Client,
    url: String,
    title: String,
    logger: Logger,
}

impl Notifier {
    pub fn new(url: &str, title: &str, logger: Logger) -> Self {
        Self {
            client: Client::new(),
            url: url.to_string(),
            title: title.to_string(),
            logger,
        }
    }

    pub async fn send(&self, message: &SlackMessage) -> Result<()> {
        let resp = self.client.post(&self.url).json(message).send().await?;

        if resp.status() == StatusCode::OK {
            Ok(())
        } else {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            Err(anyhow::anyhow!("got non 200 from webhook ({status}): {body}"))
        }
    }

    /// Reports `result`; failures are logged as warnings and swallowed.
    pub async fn notify(&self, result: &CommandResult) {
        let message = SlackMessage::for_result(&self.title, result);
        if let Err(e) = self.send(&message).await {
            self.logger
                .warning(&format!("unable to send webhook notification: {e}"))
                .await;
        }
    }
}
