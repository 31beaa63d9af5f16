//! Database query functions for the `garden_requests` table.

use anyhow::{Context, Result};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::GardenRequest;

/// Parameters for inserting a new garden request row.
#[derive(Debug, Clone, Default)]
pub struct NewGardenRequest {
    pub user_id: Uuid,
    pub urgency: i32,
    pub num_people: i32,
    pub volume_goal: f64,
    pub calorie_goal: f64,
    pub additional_needs: String,
    pub garden_size: f64,
    pub existing_crops: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub region: Option<String>,
    pub climate: Option<String>,
}

/// Insert a new garden request. Returns the row with server-generated
/// defaults (id, created_at).
///
/// Accepts a pool or an open transaction (`&mut *tx`).
pub async fn insert_request<'e>(
    executor: impl PgExecutor<'e>,
    new: &NewGardenRequest,
) -> Result<GardenRequest> {
    let request = sqlx::query_as::<_, GardenRequest>(
        "INSERT INTO garden_requests \
         (user_id, urgency, num_people, volume_goal, calorie_goal, additional_needs, \
          garden_size, existing_crops, latitude, longitude, region, climate) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
         RETURNING *",
    )
    .bind(new.user_id)
    .bind(new.urgency)
    .bind(new.num_people)
    .bind(new.volume_goal)
    .bind(new.calorie_goal)
    .bind(&new.additional_needs)
    .bind(new.garden_size)
    .bind(&new.existing_crops)
    .bind(new.latitude)
    .bind(new.longitude)
    .bind(&new.region)
    .bind(&new.climate)
    .fetch_one(executor)
    .await
    .with_context(|| format!("failed to insert garden request for user {}", new.user_id))?;

    Ok(request)
}

/// Fetch a garden request by ID.
pub async fn get_request(pool: &PgPool, id: Uuid) -> Result<Option<GardenRequest>> {
    let request = sqlx::query_as::<_, GardenRequest>("SELECT * FROM garden_requests WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch garden request")?;

    Ok(request)
}

/// List a user's requests, newest first.
pub async fn list_requests_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<GardenRequest>> {
    let requests = sqlx::query_as::<_, GardenRequest>(
        "SELECT * FROM garden_requests WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .with_context(|| format!("failed to list garden requests for user {user_id}"))?;

    Ok(requests)
}

/// List every request, most urgent first, then oldest first.
pub async fn list_requests(pool: &PgPool) -> Result<Vec<GardenRequest>> {
    let requests = sqlx::query_as::<_, GardenRequest>(
        "SELECT * FROM garden_requests ORDER BY urgency DESC, created_at ASC",
    )
    .fetch_all(pool)
    .await
    .context("failed to list garden requests")?;

    Ok(requests)
}
