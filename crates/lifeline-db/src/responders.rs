//! Database operations for the `responders` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `responders` table.
///
/// `current_location` is the serialized `"(lng,lat)"` point; parsing
/// happens in the dispatch adapter, not here.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ResponderRow {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub is_verified: bool,
    pub is_on_duty: bool,
    pub current_location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Assigned-alert counts for one responder's dashboard.
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct ResponderStatsRow {
    pub assigned_today: i64,
    pub assigned_week: i64,
    pub assigned_total: i64,
    pub completed_total: i64,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns verified, on-duty responders with a stored location.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_on_duty_responders(pool: &PgPool) -> Result<Vec<ResponderRow>, DbError> {
    let rows = sqlx::query_as::<_, ResponderRow>(
        "SELECT id, name, phone, is_verified, is_on_duty, current_location, \
                created_at, updated_at \
         FROM responders \
         WHERE is_verified = true AND is_on_duty = true AND current_location IS NOT NULL \
         ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns a single responder by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_responder(pool: &PgPool, id: Uuid) -> Result<Option<ResponderRow>, DbError> {
    let row = sqlx::query_as::<_, ResponderRow>(
        "SELECT id, name, phone, is_verified, is_on_duty, current_location, \
                created_at, updated_at \
         FROM responders \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Sets a responder's duty flag and, when provided, their location.
///
/// Passing `None` for `location` keeps the previous stored point, so a
/// responder going off duty does not wipe their last-known position.
/// Returns the updated row, or `None` if the responder does not exist.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn set_responder_availability(
    pool: &PgPool,
    id: Uuid,
    on_duty: bool,
    location: Option<&str>,
) -> Result<Option<ResponderRow>, DbError> {
    let row = sqlx::query_as::<_, ResponderRow>(
        "UPDATE responders \
         SET is_on_duty = $2, \
             current_location = COALESCE($3, current_location), \
             updated_at = NOW() \
         WHERE id = $1 \
         RETURNING id, name, phone, is_verified, is_on_duty, current_location, \
                   created_at, updated_at",
    )
    .bind(id)
    .bind(on_duty)
    .bind(location)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Assigned-alert counts for a responder: today, the trailing seven
/// days, all time, and how many of those they completed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn responder_stats(pool: &PgPool, id: Uuid) -> Result<ResponderStatsRow, DbError> {
    let row = sqlx::query_as::<_, ResponderStatsRow>(
        "SELECT COUNT(*) FILTER (WHERE created_at >= date_trunc('day', NOW())) AS assigned_today, \
                COUNT(*) FILTER (WHERE created_at >= NOW() - INTERVAL '7 days') AS assigned_week, \
                COUNT(*) AS assigned_total, \
                COUNT(*) FILTER (WHERE status = 'completed') AS completed_total \
         FROM emergency_alerts \
         WHERE responder_id = $1",
    )
    .bind(id)
    .fetch_one(pool)
    .await?;

    Ok(row)
}
