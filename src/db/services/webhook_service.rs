use chrono::Utc;
use sqlx::SqlitePool;

use crate::db::models::{NewWebhook, Webhook, WebhookUpdate};

pub async fn get_all_webhooks(pool: &SqlitePool) -> Result<Vec<Webhook>, sqlx::Error> {
    sqlx::query_as::<_, Webhook>("SELECT * FROM webhooks ORDER BY name")
        .fetch_all(pool)
        .await
}

/// Webhooks eligible for dispatch. The monitoring loop reads this every tick
/// so edits take effect without a restart.
pub async fn get_enabled_webhooks(pool: &SqlitePool) -> Result<Vec<Webhook>, sqlx::Error> {
    sqlx::query_as::<_, Webhook>("SELECT * FROM webhooks WHERE enabled = 1 ORDER BY id")
        .fetch_all(pool)
        .await
}

pub async fn get_webhook_by_id(
    pool: &SqlitePool,
    webhook_id: i64,
) -> Result<Option<Webhook>, sqlx::Error> {
    sqlx::query_as::<_, Webhook>("SELECT * FROM webhooks WHERE id = ?")
        .bind(webhook_id)
        .fetch_optional(pool)
        .await
}

/// Inserts a webhook. Threshold defaults come from the caller (the route
/// layer fills them from the monitoring settings).
pub async fn create_webhook(
    pool: &SqlitePool,
    payload: &NewWebhook,
    default_cpu_threshold: i64,
    default_memory_threshold: i64,
) -> Result<Webhook, sqlx::Error> {
    let now = Utc::now();
    sqlx::query_as::<_, Webhook>(
        "INSERT INTO webhooks \
         (name, kind, url, enabled, alert_on_stop, alert_on_start, alert_on_unhealthy, \
          cpu_threshold, memory_threshold, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING *",
    )
    .bind(&payload.name)
    .bind(payload.kind)
    .bind(&payload.url)
    .bind(payload.enabled)
    .bind(payload.alert_on_stop)
    .bind(payload.alert_on_start)
    .bind(payload.alert_on_unhealthy)
    .bind(payload.cpu_threshold.unwrap_or(default_cpu_threshold))
    .bind(payload.memory_threshold.unwrap_or(default_memory_threshold))
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
}

/// Applies a partial update; returns `None` when the webhook does not exist.
pub async fn update_webhook(
    pool: &SqlitePool,
    webhook_id: i64,
    update: &WebhookUpdate,
) -> Result<Option<Webhook>, sqlx::Error> {
    let Some(existing) = get_webhook_by_id(pool, webhook_id).await? else {
        return Ok(None);
    };

    let updated = sqlx::query_as::<_, Webhook>(
        "UPDATE webhooks SET \
         name = ?, kind = ?, url = ?, enabled = ?, alert_on_stop = ?, alert_on_start = ?, \
         alert_on_unhealthy = ?, cpu_threshold = ?, memory_threshold = ?, updated_at = ? \
         WHERE id = ? RETURNING *",
    )
    .bind(update.name.as_ref().unwrap_or(&existing.name))
    .bind(update.kind.unwrap_or(existing.kind))
    .bind(update.url.as_ref().unwrap_or(&existing.url))
    .bind(update.enabled.unwrap_or(existing.enabled))
    .bind(update.alert_on_stop.unwrap_or(existing.alert_on_stop))
    .bind(update.alert_on_start.unwrap_or(existing.alert_on_start))
    .bind(update.alert_on_unhealthy.unwrap_or(existing.alert_on_unhealthy))
    .bind(update.cpu_threshold.unwrap_or(existing.cpu_threshold))
    .bind(update.memory_threshold.unwrap_or(existing.memory_threshold))
    .bind(Utc::now())
    .bind(webhook_id)
    .fetch_one(pool)
    .await?;

    Ok(Some(updated))
}

pub async fn delete_webhook(pool: &SqlitePool, webhook_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM webhooks WHERE id = ?")
        .bind(webhook_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::WebhookKind;
    use crate::db::test_pool;

    fn sample(name: &str) -> NewWebhook {
        NewWebhook {
            name: name.to_string(),
            kind: WebhookKind::Discord,
            url: "https://discord.example/hook".to_string(),
            enabled: true,
            alert_on_stop: true,
            alert_on_start: false,
            alert_on_unhealthy: true,
            cpu_threshold: None,
            memory_threshold: None,
        }
    }

    #[tokio::test]
    async fn create_applies_threshold_defaults() {
        let pool = test_pool().await;
        let webhook = create_webhook(&pool, &sample("w1"), 80, 85).await.unwrap();
        assert_eq!(webhook.cpu_threshold, 80);
        assert_eq!(webhook.memory_threshold, 85);
        assert_eq!(webhook.kind, WebhookKind::Discord);
        assert!(webhook.enabled);
    }

    #[tokio::test]
    async fn enabled_filter_excludes_disabled() {
        let pool = test_pool().await;
        let a = create_webhook(&pool, &sample("a"), 80, 85).await.unwrap();
        let b = create_webhook(&pool, &sample("b"), 80, 85).await.unwrap();
        let update = WebhookUpdate {
            enabled: Some(false),
            ..Default::default()
        };
        update_webhook(&pool, b.id, &update).await.unwrap().unwrap();

        let enabled = get_enabled_webhooks(&pool).await.unwrap();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].id, a.id);
    }

    #[tokio::test]
    async fn partial_update_keeps_unset_fields() {
        let pool = test_pool().await;
        let webhook = create_webhook(&pool, &sample("w"), 80, 85).await.unwrap();
        let update = WebhookUpdate {
            cpu_threshold: Some(95),
            ..Default::default()
        };
        let updated = update_webhook(&pool, webhook.id, &update)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.cpu_threshold, 95);
        assert_eq!(updated.name, "w");
        assert_eq!(updated.memory_threshold, 85);
    }

    #[tokio::test]
    async fn delete_reports_missing_rows() {
        let pool = test_pool().await;
        let webhook = create_webhook(&pool, &sample("w"), 80, 85).await.unwrap();
        assert!(delete_webhook(&pool, webhook.id).await.unwrap());
        assert!(!delete_webhook(&pool, webhook.id).await.unwrap());
    }
}
