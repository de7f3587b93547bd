use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::db::models::{Webhook, WebhookKind};

use super::models::{AlertEvent, AlertKind, AlertMessage};
use super::senders::{self, SenderError};

/// Outbound delivery timeout. Delivery is a single attempt; the monitoring
/// loop treats failures as log-and-continue.
const DISPATCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Dispatch seam between the monitoring loop and the HTTP world. The loop
/// only sees this trait; tests substitute a recording fake.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_alert(&self, webhook: &Webhook, event: &AlertEvent) -> Result<(), SenderError>;
}

/// Translates an alert event plus a webhook target into an outbound POST.
pub struct NotificationService {
    client: Client,
}

impl Default for NotificationService {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationService {
    pub fn new() -> Self {
        NotificationService {
            client: Client::new(),
        }
    }

    async fn deliver(
        &self,
        kind: WebhookKind,
        url: &str,
        message: &AlertMessage,
    ) -> Result<(), SenderError> {
        let payload = senders::build_payload(kind, message);
        let response = self
            .client
            .post(url)
            .timeout(DISPATCH_TIMEOUT)
            .json(&payload)
            .send()
            .await?;

        let status = response.status().as_u16();
        if senders::accepts_status(kind, status) {
            debug!(kind = ?kind, status, "notification delivered");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(SenderError::Rejected { status, body })
        }
    }

    /// Sends a canned test payload to an arbitrary (kind, url) pair. Used for
    /// configuration validation before a webhook is saved.
    pub async fn send_test(&self, kind: WebhookKind, url: &str) -> Result<(), SenderError> {
        self.deliver(kind, url, &AlertMessage::test()).await
    }

    fn threshold_for(webhook: &Webhook, kind: AlertKind) -> Option<i64> {
        match kind {
            AlertKind::CpuHigh => Some(webhook.cpu_threshold),
            AlertKind::MemoryHigh => Some(webhook.memory_threshold),
            _ => None,
        }
    }
}

#[async_trait]
impl Notifier for NotificationService {
    async fn send_alert(&self, webhook: &Webhook, event: &AlertEvent) -> Result<(), SenderError> {
        // Disabled webhooks must never receive a dispatch; the loop filters
        // them out, this is the last line of defense.
        if !webhook.enabled {
            return Err(SenderError::Disabled);
        }
        let message = AlertMessage::for_event(event, Self::threshold_for(webhook, event.kind));
        self.deliver(webhook.kind, &webhook.url, &message).await
    }
}
