use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

pub mod models;
pub mod services;

/// Schema applied at startup. `CREATE TABLE IF NOT EXISTS` keeps it safe to
/// run on every boot; the settings insert seeds the single row the loop reads.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS webhooks (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    name                TEXT    NOT NULL,
    kind                TEXT    NOT NULL,
    url                 TEXT    NOT NULL,
    enabled             INTEGER NOT NULL DEFAULT 1,
    alert_on_stop       INTEGER NOT NULL DEFAULT 1,
    alert_on_start      INTEGER NOT NULL DEFAULT 0,
    alert_on_unhealthy  INTEGER NOT NULL DEFAULT 1,
    cpu_threshold       INTEGER NOT NULL DEFAULT 90,
    memory_threshold    INTEGER NOT NULL DEFAULT 90,
    created_at          TEXT    NOT NULL,
    updated_at          TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS monitoring_settings (
    id                    INTEGER PRIMARY KEY CHECK (id = 1),
    running               INTEGER NOT NULL DEFAULT 0,
    cpu_threshold         INTEGER NOT NULL DEFAULT 80,
    memory_threshold      INTEGER NOT NULL DEFAULT 85,
    poll_interval_seconds INTEGER NOT NULL DEFAULT 60
);

INSERT OR IGNORE INTO monitoring_settings (id, running, cpu_threshold, memory_threshold, poll_interval_seconds)
VALUES (1, 0, 80, 85, 60);

CREATE TABLE IF NOT EXISTS shared_urls (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    title       TEXT NOT NULL,
    url         TEXT NOT NULL,
    description TEXT,
    category    TEXT NOT NULL DEFAULT 'General',
    created_at  TEXT NOT NULL
);
"#;

/// Opens (creating if missing) the SQLite database at `path` and applies the schema.
pub async fn connect(path: &str) -> Result<SqlitePool, sqlx::Error> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(sqlx::Error::Io)?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    init_schema(&pool).await?;
    Ok(pool)
}

/// Applies the embedded schema. Split out so tests can run it against
/// an in-memory pool.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    Ok(())
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    init_schema(&pool).await.expect("schema");
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir
            .path()
            .join("nested")
            .join("app.db")
            .to_string_lossy()
            .into_owned();

        let pool = connect(&path).await.expect("connect");
        // Schema is applied on connect; the seeded settings row must exist.
        let running: bool =
            sqlx::query_scalar("SELECT running FROM monitoring_settings WHERE id = 1")
                .fetch_one(&pool)
                .await
                .expect("settings row");
        assert!(!running);
    }
}
