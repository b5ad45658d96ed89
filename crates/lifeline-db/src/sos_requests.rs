//! Database operations for the `sos_requests` table (hospital-assigned
//! emergencies) and the status lifecycle hospital staff drive.

use chrono::{DateTime, Utc};
use lifeline_core::NewSosRequest;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Statuses
// ---------------------------------------------------------------------------

/// Every status an SOS request can be in, in lifecycle order.
pub const SOS_STATUSES: [&str; 5] = [
    "pending",
    "acknowledged",
    "responding",
    "resolved",
    "dismissed",
];

/// True when `raw` names a known SOS status.
#[must_use]
pub fn is_sos_status(raw: &str) -> bool {
    SOS_STATUSES.contains(&raw)
}

/// The hospital lifecycle: pending -> acknowledged -> responding ->
/// resolved, with dismissed reachable from any non-terminal status.
#[must_use]
pub fn sos_transition_allowed(from: &str, to: &str) -> bool {
    matches!(
        (from, to),
        ("pending", "acknowledged")
            | ("acknowledged", "responding")
            | ("responding", "resolved")
            | ("pending", "dismissed")
            | ("acknowledged", "dismissed")
            | ("responding", "dismissed")
    )
}

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `sos_requests` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SosRequestRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub user_phone: String,
    pub latitude: f64,
    pub longitude: f64,
    pub emergency_type: String,
    pub description: String,
    pub user_address: String,
    pub status: String,
    pub assigned_hospital_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Inserts a new pending SOS request and returns the stored row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including a missing
/// hospital foreign key).
pub async fn insert_sos_request(
    pool: &PgPool,
    record: &NewSosRequest,
) -> Result<SosRequestRow, DbError> {
    let row = sqlx::query_as::<_, SosRequestRow>(
        "INSERT INTO sos_requests \
           (user_id, user_name, user_phone, latitude, longitude, emergency_type, \
            description, user_address, status, assigned_hospital_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending', $9) \
         RETURNING id, user_id, user_name, user_phone, latitude, longitude, emergency_type, \
                   description, user_address, status, assigned_hospital_id, created_at, updated_at",
    )
    .bind(record.user_id)
    .bind(&record.user_name)
    .bind(&record.user_phone)
    .bind(record.location.latitude())
    .bind(record.location.longitude())
    .bind(record.category.as_str())
    .bind(&record.description)
    .bind(&record.user_address)
    .bind(record.hospital_id)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Returns a single SOS request by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_sos_request(pool: &PgPool, id: Uuid) -> Result<Option<SosRequestRow>, DbError> {
    let row = sqlx::query_as::<_, SosRequestRow>(
        "SELECT id, user_id, user_name, user_phone, latitude, longitude, emergency_type, \
                description, user_address, status, assigned_hospital_id, created_at, updated_at \
         FROM sos_requests \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Lists SOS requests, newest first, optionally filtered by assigned
/// hospital and/or status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_sos_requests(
    pool: &PgPool,
    hospital_id: Option<Uuid>,
    status: Option<&str>,
    limit: i64,
) -> Result<Vec<SosRequestRow>, DbError> {
    let rows = sqlx::query_as::<_, SosRequestRow>(
        "SELECT id, user_id, user_name, user_phone, latitude, longitude, emergency_type, \
                description, user_address, status, assigned_hospital_id, created_at, updated_at \
         FROM sos_requests \
         WHERE ($1::uuid IS NULL OR assigned_hospital_id = $1) \
           AND ($2::text IS NULL OR status = $2) \
         ORDER BY created_at DESC \
         LIMIT $3",
    )
    .bind(hospital_id)
    .bind(status)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Moves an SOS request from `from` to `to` if that edge is allowed.
///
/// The update is conditional on the stored status still being `from`,
/// so two dashboards racing on the same request cannot both win.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] for an unknown id,
/// [`DbError::InvalidStatusTransition`] when the edge is not allowed or
/// the stored status moved underneath the caller, and
/// [`DbError::Sqlx`] if a query fails.
pub async fn transition_sos_status(
    pool: &PgPool,
    id: Uuid,
    to: &str,
) -> Result<SosRequestRow, DbError> {
    let current = get_sos_request(pool, id).await?.ok_or(DbError::NotFound)?;

    if !sos_transition_allowed(&current.status, to) {
        return Err(DbError::InvalidStatusTransition {
            from: current.status,
            to: to.to_owned(),
        });
    }

    let row = sqlx::query_as::<_, SosRequestRow>(
        "UPDATE sos_requests \
         SET status = $3, updated_at = NOW() \
         WHERE id = $1 AND status = $2 \
         RETURNING id, user_id, user_name, user_phone, latitude, longitude, emergency_type, \
                   description, user_address, status, assigned_hospital_id, created_at, updated_at",
    )
    .bind(id)
    .bind(&current.status)
    .bind(to)
    .fetch_optional(pool)
    .await?;

    row.ok_or(DbError::InvalidStatusTransition {
        from: current.status,
        to: to.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_moves_forward_one_step_at_a_time() {
        assert!(sos_transition_allowed("pending", "acknowledged"));
        assert!(sos_transition_allowed("acknowledged", "responding"));
        assert!(sos_transition_allowed("responding", "resolved"));

        assert!(!sos_transition_allowed("pending", "responding"));
        assert!(!sos_transition_allowed("pending", "resolved"));
        assert!(!sos_transition_allowed("acknowledged", "resolved"));
    }

    #[test]
    fn dismissal_is_reachable_from_every_non_terminal_status() {
        assert!(sos_transition_allowed("pending", "dismissed"));
        assert!(sos_transition_allowed("acknowledged", "dismissed"));
        assert!(sos_transition_allowed("responding", "dismissed"));

        assert!(!sos_transition_allowed("resolved", "dismissed"));
        assert!(!sos_transition_allowed("dismissed", "dismissed"));
    }

    #[test]
    fn terminal_statuses_never_move() {
        for to in SOS_STATUSES {
            assert!(!sos_transition_allowed("resolved", to), "resolved -> {to}");
            assert!(!sos_transition_allowed("dismissed", to), "dismissed -> {to}");
        }
    }

    #[test]
    fn status_names_are_recognized() {
        assert!(is_sos_status("pending"));
        assert!(is_sos_status("dismissed"));
        assert!(!is_sos_status("active"));
        assert!(!is_sos_status("Pending"));
    }
}
