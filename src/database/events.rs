// file: src/database/events.rs
use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::{NativeEvent, NewNativeEvent};

pub async fn get_between(pool: &SqlitePool, start_secs: f64, end_secs: f64) -> sqlx::Result<Vec<NativeEvent>> {
    sqlx::query_as::<_, NativeEvent>(
        r#"
        SELECT id, title, start_secs, end_secs, location, notes
        FROM events
        WHERE start_secs <= ?
            AND end_secs >= ?
        ORDER BY start_secs ASC, id ASC
        "#,
    )
    .bind(end_secs)
    .bind(start_secs)
    .fetch_all(pool)
    .await
}

pub async fn get_by_id(pool: &SqlitePool, id: &str) -> sqlx::Result<NativeEvent> {
    sqlx::query_as::<_, NativeEvent>(
        "SELECT id, title, start_secs, end_secs, location, notes FROM events WHERE id = ?",
    )
    .bind(id)
    .fetch_one(pool)
    .await
}

pub async fn insert(pool: &SqlitePool, id: &str, event: &NewNativeEvent) -> sqlx::Result<NativeEvent> {
    sqlx::query(
        "INSERT INTO events (id, title, start_secs, end_secs, location, notes, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(&event.title)
    .bind(event.start_secs)
    .bind(event.end_secs)
    .bind(&event.location)
    .bind(&event.notes)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    get_by_id(pool, id).await
}

pub async fn count(pool: &SqlitePool) -> sqlx::Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM events")
        .fetch_one(pool)
        .await
}
