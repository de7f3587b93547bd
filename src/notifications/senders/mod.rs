use thiserror::Error;

use crate::db::models::WebhookKind;
use crate::notifications::models::AlertMessage;

pub mod discord;
pub mod generic;
pub mod slack;
pub mod telegram;

#[derive(Error, Debug)]
pub enum SenderError {
    #[error("webhook is disabled")]
    Disabled,
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("endpoint rejected the notification (status {status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Builds the wire payload for the given target type.
pub fn build_payload(kind: WebhookKind, message: &AlertMessage) -> serde_json::Value {
    match kind {
        WebhookKind::Discord => discord::build_payload(message),
        WebhookKind::Slack => slack::build_payload(message),
        WebhookKind::Telegram => telegram::build_payload(message),
        WebhookKind::Generic => generic::build_payload(message),
    }
}

/// Each target type treats a slightly different status set as success.
pub fn accepts_status(kind: WebhookKind, status: u16) -> bool {
    match kind {
        WebhookKind::Discord => matches!(status, 200 | 204),
        WebhookKind::Slack | WebhookKind::Telegram => status == 200,
        WebhookKind::Generic => (200..300).contains(&status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_target_success_statuses() {
        assert!(accepts_status(WebhookKind::Discord, 204));
        assert!(!accepts_status(WebhookKind::Slack, 204));
        assert!(accepts_status(WebhookKind::Generic, 202));
        assert!(!accepts_status(WebhookKind::Telegram, 302));
    }
}
