//! Database operations for the `emergency_alerts` table
//! (responder-assigned emergencies) and their status lifecycle.

use chrono::{DateTime, Utc};
use lifeline_core::NewEmergencyAlert;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Statuses
// ---------------------------------------------------------------------------

/// Every status an emergency alert can be in, in lifecycle order.
/// Alerts start at `active`; the terminal success state is `completed`.
pub const ALERT_STATUSES: [&str; 5] = [
    "active",
    "acknowledged",
    "responding",
    "completed",
    "dismissed",
];

/// True when `raw` names a known alert status.
#[must_use]
pub fn is_alert_status(raw: &str) -> bool {
    ALERT_STATUSES.contains(&raw)
}

/// The responder lifecycle: active -> acknowledged -> responding ->
/// completed, with dismissed reachable from any non-terminal status.
#[must_use]
pub fn alert_transition_allowed(from: &str, to: &str) -> bool {
    matches!(
        (from, to),
        ("active", "acknowledged")
            | ("acknowledged", "responding")
            | ("responding", "completed")
            | ("active", "dismissed")
            | ("acknowledged", "dismissed")
            | ("responding", "dismissed")
    )
}

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `emergency_alerts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EmergencyAlertRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub user_phone: String,
    pub alert_type: String,
    pub description: String,
    pub location_lat: f64,
    pub location_lng: f64,
    pub location_description: String,
    pub status: String,
    pub responder_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Inserts a new active emergency alert and returns the stored row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including a missing
/// responder foreign key).
pub async fn insert_emergency_alert(
    pool: &PgPool,
    record: &NewEmergencyAlert,
) -> Result<EmergencyAlertRow, DbError> {
    let row = sqlx::query_as::<_, EmergencyAlertRow>(
        "INSERT INTO emergency_alerts \
           (user_id, user_name, user_phone, alert_type, description, location_lat, \
            location_lng, location_description, status, responder_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'active', $9) \
         RETURNING id, user_id, user_name, user_phone, alert_type, description, location_lat, \
                   location_lng, location_description, status, responder_id, created_at, updated_at",
    )
    .bind(record.user_id)
    .bind(&record.user_name)
    .bind(&record.user_phone)
    .bind(record.category.as_str())
    .bind(&record.description)
    .bind(record.location.latitude())
    .bind(record.location.longitude())
    .bind(&record.location_description)
    .bind(record.responder_id)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Returns a single emergency alert by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_emergency_alert(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<EmergencyAlertRow>, DbError> {
    let row = sqlx::query_as::<_, EmergencyAlertRow>(
        "SELECT id, user_id, user_name, user_phone, alert_type, description, location_lat, \
                location_lng, location_description, status, responder_id, created_at, updated_at \
         FROM emergency_alerts \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Lists emergency alerts, newest first, optionally filtered by
/// assigned responder and/or status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_emergency_alerts(
    pool: &PgPool,
    responder_id: Option<Uuid>,
    status: Option<&str>,
    limit: i64,
) -> Result<Vec<EmergencyAlertRow>, DbError> {
    let rows = sqlx::query_as::<_, EmergencyAlertRow>(
        "SELECT id, user_id, user_name, user_phone, alert_type, description, location_lat, \
                location_lng, location_description, status, responder_id, created_at, updated_at \
         FROM emergency_alerts \
         WHERE ($1::uuid IS NULL OR responder_id = $1) \
           AND ($2::text IS NULL OR status = $2) \
         ORDER BY created_at DESC \
         LIMIT $3",
    )
    .bind(responder_id)
    .bind(status)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Moves an emergency alert to `to` if the lifecycle allows it.
///
/// Conditional on the stored status, same as the SOS variant: a racing
/// update loses instead of silently double-applying.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] for an unknown id,
/// [`DbError::InvalidStatusTransition`] when the edge is not allowed or
/// the stored status moved underneath the caller, and
/// [`DbError::Sqlx`] if a query fails.
pub async fn transition_alert_status(
    pool: &PgPool,
    id: Uuid,
    to: &str,
) -> Result<EmergencyAlertRow, DbError> {
    let current = get_emergency_alert(pool, id)
        .await?
        .ok_or(DbError::NotFound)?;

    if !alert_transition_allowed(&current.status, to) {
        return Err(DbError::InvalidStatusTransition {
            from: current.status,
            to: to.to_owned(),
        });
    }

    let row = sqlx::query_as::<_, EmergencyAlertRow>(
        "UPDATE emergency_alerts \
         SET status = $3, updated_at = NOW() \
         WHERE id = $1 AND status = $2 \
         RETURNING id, user_id, user_name, user_phone, alert_type, description, location_lat, \
                   location_lng, location_description, status, responder_id, created_at, updated_at",
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
        assert!(alert_transition_allowed("active", "acknowledged"));
        assert!(alert_transition_allowed("acknowledged", "responding"));
        assert!(alert_transition_allowed("responding", "completed"));

        assert!(!alert_transition_allowed("active", "responding"));
        assert!(!alert_transition_allowed("active", "completed"));
        assert!(!alert_transition_allowed("acknowledged", "completed"));
    }

    #[test]
    fn dismissal_is_reachable_from_every_non_terminal_status() {
        assert!(alert_transition_allowed("active", "dismissed"));
        assert!(alert_transition_allowed("acknowledged", "dismissed"));
        assert!(alert_transition_allowed("responding", "dismissed"));

        assert!(!alert_transition_allowed("completed", "dismissed"));
    }

    #[test]
    fn terminal_statuses_never_move() {
        for to in ALERT_STATUSES {
            assert!(
                !alert_transition_allowed("completed", to),
                "completed -> {to}"
            );
            assert!(
                !alert_transition_allowed("dismissed", to),
                "dismissed -> {to}"
            );
        }
    }

    #[test]
    fn status_names_are_recognized() {
        assert!(is_alert_status("active"));
        assert!(is_alert_status("completed"));
        assert!(!is_alert_status("pending"));
        assert!(!is_alert_status("resolved"));
    }
}
