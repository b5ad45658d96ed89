//! Database operations for the `hospitals` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `hospitals` table.
///
/// `latitude`/`longitude` are nullable: a hospital can be listed in the
/// directory before anyone has geocoded it, it just cannot receive
/// dispatches until then.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HospitalRow {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns all hospitals, ordered by name. Used by the public directory.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_hospitals(pool: &PgPool) -> Result<Vec<HospitalRow>, DbError> {
    let rows = sqlx::query_as::<_, HospitalRow>(
        "SELECT id, name, address, phone, email, latitude, longitude, is_available, \
                created_at, updated_at \
         FROM hospitals \
         ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns hospitals eligible for dispatch: available and geocoded.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_dispatchable_hospitals(pool: &PgPool) -> Result<Vec<HospitalRow>, DbError> {
    let rows = sqlx::query_as::<_, HospitalRow>(
        "SELECT id, name, address, phone, email, latitude, longitude, is_available, \
                created_at, updated_at \
         FROM hospitals \
         WHERE is_available = true AND latitude IS NOT NULL AND longitude IS NOT NULL \
         ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns a single hospital by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_hospital(pool: &PgPool, id: Uuid) -> Result<Option<HospitalRow>, DbError> {
    let row = sqlx::query_as::<_, HospitalRow>(
        "SELECT id, name, address, phone, email, latitude, longitude, is_available, \
                created_at, updated_at \
         FROM hospitals \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
