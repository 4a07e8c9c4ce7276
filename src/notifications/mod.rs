use serde::{Deserialize, Serialize};

use crate::exec::CommandResult;

pub mod sender;

pub use sender::Notifier;

pub const OUTPUT_FIELD_TITLE: &str = "stdout and stderr";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusColor {
    Ok,
    Failure,
}

impl From<&CommandResult> for StatusColor {
    fn from(result: &CommandResult) -> Self {
        if result.success {
            StatusColor::Ok
        } else {
            StatusColor::Failure
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackField {
    pub title: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackMessage {
    pub fallback: String,
    pub pretext: String,
    pub color: StatusColor,
    pub fields: Vec<SlackField>,
}

impl SlackMessage {
    pub fn new(title: &str, color: StatusColor, output: &str) -> Self {
        Self {
            fallback: title.to_string(),
            pretext: title.to_string(),
            color,
            fields: vec![SlackField {
                title: OUTPUT_FIELD_TITLE.to_string(),
                value: format!("```{output}```"),
            }],
        }
    }

    pub fn for_result(title: &str, result: &CommandResult) -> Self {
        Self::new(title, StatusColor::from(result), &result.output)
    }
}
