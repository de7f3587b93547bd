use sqlx::SqlitePool;

use crate::db::models::{MonitoringSettings, SettingsUpdate};

/// The settings row is seeded by the schema, so a missing row is a
/// programming error rather than a runtime condition.
pub async fn get_settings(pool: &SqlitePool) -> Result<MonitoringSettings, sqlx::Error> {
    sqlx::query_as::<_, MonitoringSettings>("SELECT * FROM monitoring_settings WHERE id = 1")
        .fetch_one(pool)
        .await
}

pub async fn set_running(pool: &SqlitePool, running: bool) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE monitoring_settings SET running = ? WHERE id = 1")
        .bind(running)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn update_settings(
    pool: &SqlitePool,
    update: &SettingsUpdate,
) -> Result<MonitoringSettings, sqlx::Error> {
    let existing = get_settings(pool).await?;
    sqlx::query_as::<_, MonitoringSettings>(
        "UPDATE monitoring_settings SET cpu_threshold = ?, memory_threshold = ?, \
         poll_interval_seconds = ? WHERE id = 1 RETURNING *",
    )
    .bind(update.cpu_threshold.unwrap_or(existing.cpu_threshold))
    .bind(update.memory_threshold.unwrap_or(existing.memory_threshold))
    .bind(
        update
            .poll_interval_seconds
            .unwrap_or(existing.poll_interval_seconds),
    )
    .fetch_one(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn settings_row_is_seeded() {
        let pool = test_pool().await;
        let settings = get_settings(&pool).await.unwrap();
        assert!(!settings.running);
        assert_eq!(settings.cpu_threshold, 80);
        assert_eq!(settings.memory_threshold, 85);
        assert_eq!(settings.poll_interval_seconds, 60);
    }

    #[tokio::test]
    async fn partial_update_and_running_flag() {
        let pool = test_pool().await;
        let updated = update_settings(
            &pool,
            &SettingsUpdate {
                cpu_threshold: Some(70),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.cpu_threshold, 70);
        assert_eq!(updated.memory_threshold, 85);

        set_running(&pool, true).await.unwrap();
        assert!(get_settings(&pool).await.unwrap().running);
    }
}
