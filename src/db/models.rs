use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

/// Keeps an absent field distinct from an explicit `null` in partial
/// updates: absent deserializes to `None`, `null` to `Some(None)`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// Outbound alert target type. Stored as lowercase text in the `webhooks` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum WebhookKind {
    Discord,
    Slack,
    Telegram,
    Generic,
}

/// A configured alert webhook.
/// Corresponds to the `webhooks` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Webhook {
    pub id: i64,
    pub name: String,
    pub kind: WebhookKind,
    pub url: String,
    pub enabled: bool,
    pub alert_on_stop: bool,
    pub alert_on_start: bool,
    pub alert_on_unhealthy: bool,
    /// Per-webhook CPU alert threshold, percent (0-100).
    pub cpu_threshold: i64,
    /// Per-webhook memory alert threshold, percent (0-100).
    pub memory_threshold: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a webhook. Missing alert flags fall back to the
/// usual defaults (stop and unhealthy on, start off); missing thresholds
/// fall back to the global monitoring settings.
#[derive(Debug, Clone, Deserialize)]
pub struct NewWebhook {
    pub name: String,
    pub kind: WebhookKind,
    pub url: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub alert_on_stop: bool,
    #[serde(default)]
    pub alert_on_start: bool,
    #[serde(default = "default_true")]
    pub alert_on_unhealthy: bool,
    pub cpu_threshold: Option<i64>,
    pub memory_threshold: Option<i64>,
}

fn default_true() -> bool {
    true
}

/// Partial update for a webhook; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookUpdate {
    pub name: Option<String>,
    pub kind: Option<WebhookKind>,
    pub url: Option<String>,
    pub enabled: Option<bool>,
    pub alert_on_stop: Option<bool>,
    pub alert_on_start: Option<bool>,
    pub alert_on_unhealthy: Option<bool>,
    pub cpu_threshold: Option<i64>,
    pub memory_threshold: Option<i64>,
}

/// Monitoring loop configuration. Single row, `id = 1`.
/// Corresponds to the `monitoring_settings` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MonitoringSettings {
    pub id: i64,
    pub running: bool,
    /// Default CPU threshold applied to newly created webhooks.
    pub cpu_threshold: i64,
    /// Default memory threshold applied to newly created webhooks.
    pub memory_threshold: i64,
    pub poll_interval_seconds: i64,
}

/// Partial update for monitoring settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsUpdate {
    pub cpu_threshold: Option<i64>,
    pub memory_threshold: Option<i64>,
    pub poll_interval_seconds: Option<i64>,
}

/// A shared URL bookmark.
/// Corresponds to the `shared_urls` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SharedUrl {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

/// Payload for creating a bookmark.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSharedUrl {
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub category: Option<String>,
}

/// Partial update for a bookmark. `description` is doubly optional so a
/// request can clear it with an explicit `null`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SharedUrlUpdate {
    pub title: Option<String>,
    pub url: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub category: Option<String>,
}
