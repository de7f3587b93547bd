use chrono::Utc;
use sqlx::SqlitePool;

use crate::db::models::{NewSharedUrl, SharedUrl, SharedUrlUpdate};

pub async fn get_all_urls(
    pool: &SqlitePool,
    category: Option<&str>,
) -> Result<Vec<SharedUrl>, sqlx::Error> {
    match category {
        Some(category) => {
            sqlx::query_as::<_, SharedUrl>(
                "SELECT * FROM shared_urls WHERE category = ? ORDER BY created_at DESC",
            )
            .bind(category)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query_as::<_, SharedUrl>("SELECT * FROM shared_urls ORDER BY created_at DESC")
                .fetch_all(pool)
                .await
        }
    }
}

pub async fn get_categories(pool: &SqlitePool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT DISTINCT category FROM shared_urls ORDER BY category")
        .fetch_all(pool)
        .await
}

pub async fn create_url(pool: &SqlitePool, payload: &NewSharedUrl) -> Result<SharedUrl, sqlx::Error> {
    sqlx::query_as::<_, SharedUrl>(
        "INSERT INTO shared_urls (title, url, description, category, created_at) \
         VALUES (?, ?, ?, ?, ?) RETURNING *",
    )
    .bind(&payload.title)
    .bind(&payload.url)
    .bind(&payload.description)
    .bind(payload.category.as_deref().unwrap_or("General"))
    .bind(Utc::now())
    .fetch_one(pool)
    .await
}

pub async fn update_url(
    pool: &SqlitePool,
    url_id: i64,
    update: &SharedUrlUpdate,
) -> Result<Option<SharedUrl>, sqlx::Error> {
    let existing = sqlx::query_as::<_, SharedUrl>("SELECT * FROM shared_urls WHERE id = ?")
        .bind(url_id)
        .fetch_optional(pool)
        .await?;
    let Some(existing) = existing else {
        return Ok(None);
    };

    let updated = sqlx::query_as::<_, SharedUrl>(
        "UPDATE shared_urls SET title = ?, url = ?, description = ?, category = ? \
         WHERE id = ? RETURNING *",
    )
    .bind(update.title.as_ref().unwrap_or(&existing.title))
    .bind(update.url.as_ref().unwrap_or(&existing.url))
    .bind(match &update.description {
        Some(description) => description.as_ref(),
        None => existing.description.as_ref(),
    })
    .bind(update.category.as_ref().unwrap_or(&existing.category))
    .bind(url_id)
    .fetch_one(pool)
    .await?;

    Ok(Some(updated))
}

pub async fn delete_url(pool: &SqlitePool, url_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM shared_urls WHERE id = ?")
        .bind(url_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn create_list_and_filter_by_category() {
        let pool = test_pool().await;
        create_url(
            &pool,
            &NewSharedUrl {
                title: "Grafana".into(),
                url: "http://host:3000".into(),
                description: None,
                category: Some("Monitoring".into()),
            },
        )
        .await
        .unwrap();
        create_url(
            &pool,
            &NewSharedUrl {
                title: "Wiki".into(),
                url: "http://host:8080".into(),
                description: Some("team wiki".into()),
                category: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(get_all_urls(&pool, None).await.unwrap().len(), 2);
        let filtered = get_all_urls(&pool, Some("Monitoring")).await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].title, "Grafana");

        let categories = get_categories(&pool).await.unwrap();
        assert_eq!(categories, vec!["General".to_string(), "Monitoring".to_string()]);
    }

    #[tokio::test]
    async fn update_and_delete() {
        let pool = test_pool().await;
        let url = create_url(
            &pool,
            &NewSharedUrl {
                title: "t".into(),
                url: "http://a".into(),
                description: None,
                category: None,
            },
        )
        .await
        .unwrap();

        let updated = update_url(
            &pool,
            url.id,
            &SharedUrlUpdate {
                title: Some("renamed".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(updated.title, "renamed");
        assert_eq!(updated.url, "http://a");

        assert!(delete_url(&pool, url.id).await.unwrap());
        assert!(update_url(&pool, url.id, &SharedUrlUpdate::default())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn explicit_null_clears_the_description() {
        let pool = test_pool().await;
        let url = create_url(
            &pool,
            &NewSharedUrl {
                title: "t".into(),
                url: "http://a".into(),
                description: Some("old text".into()),
                category: None,
            },
        )
        .await
        .unwrap();

        // Field absent: description untouched.
        let kept = update_url(
            &pool,
            url.id,
            &SharedUrlUpdate {
                title: Some("renamed".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(kept.description.as_deref(), Some("old text"));

        // Field present as null: description cleared.
        let cleared = update_url(
            &pool,
            url.id,
            &SharedUrlUpdate {
                description: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(cleared.description, None);
    }

    #[test]
    fn update_payload_distinguishes_null_from_absent() {
        let absent: SharedUrlUpdate = serde_json::from_str(r#"{"title": "t"}"#).unwrap();
        assert_eq!(absent.description, None);

        let null: SharedUrlUpdate = serde_json::from_str(r#"{"description": null}"#).unwrap();
        assert_eq!(null.description, Some(None));

        let set: SharedUrlUpdate = serde_json::from_str(r#"{"description": "d"}"#).unwrap();
        assert_eq!(set.description, Some(Some("d".to_string())));
    }
}
