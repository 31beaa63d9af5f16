//! Database query functions for the `saved_schedules` table.

use anyhow::{Context, Result};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::SavedSchedule;

/// Save a schedule document for a user. Accepts a pool or an open
/// transaction.
pub async fn insert_schedule<'e>(
    executor: impl PgExecutor<'e>,
    user_id: Uuid,
    request_id: Option<Uuid>,
    document: &serde_json::Value,
) -> Result<SavedSchedule> {
    let schedule = sqlx::query_as::<_, SavedSchedule>(
        "INSERT INTO saved_schedules (user_id, request_id, document) \
         VALUES ($1, $2, $3) \
         RETURNING *",
    )
    .bind(user_id)
    .bind(request_id)
    .bind(document)
    .fetch_one(executor)
    .await
    .with_context(|| format!("failed to save schedule for user {user_id}"))?;

    Ok(schedule)
}

/// Fetch a saved schedule by ID.
pub async fn get_schedule(pool: &PgPool, id: Uuid) -> Result<Option<SavedSchedule>> {
    let schedule = sqlx::query_as::<_, SavedSchedule>("SELECT * FROM saved_schedules WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch saved schedule")?;

    Ok(schedule)
}

/// List a user's saved schedules, newest first.
pub async fn list_schedules_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<SavedSchedule>> {
    let schedules = sqlx::query_as::<_, SavedSchedule>(
        "SELECT * FROM saved_schedules WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .with_context(|| format!("failed to list saved schedules for user {user_id}"))?;

    Ok(schedules)
}

/// The most recent schedule saved for a request, if any.
pub async fn latest_schedule_for_request(
    pool: &PgPool,
    request_id: Uuid,
) -> Result<Option<SavedSchedule>> {
    let schedule = sqlx::query_as::<_, SavedSchedule>(
        "SELECT * FROM saved_schedules WHERE request_id = $1 \
         ORDER BY created_at DESC LIMIT 1",
    )
    .bind(request_id)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("failed to fetch schedule for request {request_id}"))?;

    Ok(schedule)
}
