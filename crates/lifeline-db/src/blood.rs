//! Database operations for the blood bank: per-hospital inventory and
//! the user-to-hospital request workflow.
//!
//! Approval reserves stock and fulfilment deducts it, both inside a
//! transaction with the inventory row locked, so concurrent approvals
//! cannot promise the same units twice. The arithmetic invariant is
//! `units_reserved <= units_available`, enforced here rather than by a
//! table constraint because it spans two workflow steps.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Vocabulary
// ---------------------------------------------------------------------------

/// The eight ABO/Rh groups. Anything else is rejected at the API edge.
pub const BLOOD_GROUPS: [&str; 8] = ["A+", "A-", "B+", "B-", "AB+", "AB-", "O+", "O-"];

/// Request urgency levels, least to most urgent.
pub const URGENCY_LEVELS: [&str; 3] = ["normal", "urgent", "critical"];

const REQUEST_PENDING: &str = "pending";
const REQUEST_APPROVED: &str = "approved";

/// True when `raw` is one of the eight ABO/Rh groups (exact case).
#[must_use]
pub fn is_valid_blood_group(raw: &str) -> bool {
    BLOOD_GROUPS.contains(&raw)
}

/// True when `raw` names a known urgency level.
#[must_use]
pub fn is_valid_urgency(raw: &str) -> bool {
    URGENCY_LEVELS.contains(&raw)
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `blood_inventory` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BloodInventoryRow {
    pub id: Uuid,
    pub hospital_id: Uuid,
    pub blood_group: String,
    pub units_available: i32,
    pub units_reserved: i32,
    pub updated_at: DateTime<Utc>,
}

/// A row from the `blood_requests` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BloodRequestRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub user_phone: String,
    pub hospital_id: Uuid,
    pub blood_group: String,
    pub units_requested: i32,
    pub units_approved: Option<i32>,
    pub urgency: String,
    pub patient_name: Option<String>,
    pub notes: Option<String>,
    pub status: String,
    pub hospital_response: Option<String>,
    pub responded_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parameters for a new blood request.
#[derive(Debug, Clone)]
pub struct NewBloodRequest<'a> {
    pub user_id: Uuid,
    pub user_name: &'a str,
    pub user_phone: &'a str,
    pub hospital_id: Uuid,
    pub blood_group: &'a str,
    pub units_requested: i32,
    pub urgency: &'a str,
    pub patient_name: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Counts from one expiry sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpirySummary {
    /// Pending requests that passed their deadline.
    pub expired_pending: u64,
    /// Approved requests that passed their deadline; their reservations
    /// were returned to the pool.
    pub released_approved: u64,
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

/// Sets the available unit count for one hospital/group pair, creating
/// the row if needed. Reservations are untouched; they belong to the
/// approval workflow, not to restocking.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_inventory(
    pool: &PgPool,
    hospital_id: Uuid,
    blood_group: &str,
    units_available: i32,
) -> Result<BloodInventoryRow, DbError> {
    let row = sqlx::query_as::<_, BloodInventoryRow>(
        "INSERT INTO blood_inventory (hospital_id, blood_group, units_available) \
         VALUES ($1, $2, $3) \
         ON CONFLICT (hospital_id, blood_group) DO UPDATE SET \
             units_available = EXCLUDED.units_available, \
             updated_at = NOW() \
         RETURNING id, hospital_id, blood_group, units_available, units_reserved, updated_at",
    )
    .bind(hospital_id)
    .bind(blood_group)
    .bind(units_available)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Returns a hospital's stock, one row per blood group.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_inventory_for_hospital(
    pool: &PgPool,
    hospital_id: Uuid,
) -> Result<Vec<BloodInventoryRow>, DbError> {
    let rows = sqlx::query_as::<_, BloodInventoryRow>(
        "SELECT id, hospital_id, blood_group, units_available, units_reserved, updated_at \
         FROM blood_inventory \
         WHERE hospital_id = $1 \
         ORDER BY blood_group",
    )
    .bind(hospital_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns stock across all hospitals, for the directory listing.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_inventory(pool: &PgPool) -> Result<Vec<BloodInventoryRow>, DbError> {
    let rows = sqlx::query_as::<_, BloodInventoryRow>(
        "SELECT id, hospital_id, blood_group, units_available, units_reserved, updated_at \
         FROM blood_inventory \
         ORDER BY hospital_id, blood_group",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Inserts a new pending blood request and returns the stored row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including a missing
/// hospital foreign key or a non-positive unit count hitting the table
/// check).
pub async fn insert_blood_request(
    pool: &PgPool,
    request: &NewBloodRequest<'_>,
) -> Result<BloodRequestRow, DbError> {
    let row = sqlx::query_as::<_, BloodRequestRow>(
        "INSERT INTO blood_requests \
           (user_id, user_name, user_phone, hospital_id, blood_group, units_requested, \
            urgency, patient_name, notes, status, expires_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'pending', $10) \
         RETURNING id, user_id, user_name, user_phone, hospital_id, blood_group, \
                   units_requested, units_approved, urgency, patient_name, notes, status, \
                   hospital_response, responded_at, expires_at, created_at, updated_at",
    )
    .bind(request.user_id)
    .bind(request.user_name)
    .bind(request.user_phone)
    .bind(request.hospital_id)
    .bind(request.blood_group)
    .bind(request.units_requested)
    .bind(request.urgency)
    .bind(request.patient_name)
    .bind(request.notes)
    .bind(request.expires_at)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Returns a single blood request by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_blood_request(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<BloodRequestRow>, DbError> {
    let row = sqlx::query_as::<_, BloodRequestRow>(
        "SELECT id, user_id, user_name, user_phone, hospital_id, blood_group, \
                units_requested, units_approved, urgency, patient_name, notes, status, \
                hospital_response, responded_at, expires_at, created_at, updated_at \
         FROM blood_requests \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Lists blood requests, newest first, optionally filtered by hospital,
/// requesting user and/or status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_blood_requests(
    pool: &PgPool,
    hospital_id: Option<Uuid>,
    user_id: Option<Uuid>,
    status: Option<&str>,
    limit: i64,
) -> Result<Vec<BloodRequestRow>, DbError> {
    let rows = sqlx::query_as::<_, BloodRequestRow>(
        "SELECT id, user_id, user_name, user_phone, hospital_id, blood_group, \
                units_requested, units_approved, urgency, patient_name, notes, status, \
                hospital_response, responded_at, expires_at, created_at, updated_at \
         FROM blood_requests \
         WHERE ($1::uuid IS NULL OR hospital_id = $1) \
           AND ($2::uuid IS NULL OR user_id = $2) \
           AND ($3::text IS NULL OR status = $3) \
         ORDER BY created_at DESC \
         LIMIT $4",
    )
    .bind(hospital_id)
    .bind(user_id)
    .bind(status)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Approves a pending request for `units_approved` units, reserving
/// them against the hospital's stock in the same transaction.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] for an unknown id,
/// [`DbError::InvalidStatusTransition`] when the request is not
/// pending, [`DbError::InsufficientStock`] when unreserved stock cannot
/// cover the approval, and [`DbError::Sqlx`] if a query fails.
pub async fn approve_blood_request(
    pool: &PgPool,
    id: Uuid,
    units_approved: i32,
    response: Option<&str>,
) -> Result<BloodRequestRow, DbError> {
    let mut tx = pool.begin().await?;

    let request = lock_request(&mut tx, id).await?.ok_or(DbError::NotFound)?;
    if request.status != REQUEST_PENDING {
        return Err(DbError::InvalidStatusTransition {
            from: request.status,
            to: REQUEST_APPROVED.to_owned(),
        });
    }

    let inventory = sqlx::query_as::<_, BloodInventoryRow>(
        "SELECT id, hospital_id, blood_group, units_available, units_reserved, updated_at \
         FROM blood_inventory \
         WHERE hospital_id = $1 AND blood_group = $2 \
         FOR UPDATE",
    )
    .bind(request.hospital_id)
    .bind(&request.blood_group)
    .fetch_optional(&mut *tx)
    .await?;

    let unreserved = inventory
        .as_ref()
        .map_or(0, |row| row.units_available - row.units_reserved);
    if unreserved < units_approved {
        return Err(DbError::InsufficientStock {
            requested: units_approved,
            available: unreserved,
        });
    }

    sqlx::query(
        "UPDATE blood_inventory \
         SET units_reserved = units_reserved + $3, updated_at = NOW() \
         WHERE hospital_id = $1 AND blood_group = $2",
    )
    .bind(request.hospital_id)
    .bind(&request.blood_group)
    .bind(units_approved)
    .execute(&mut *tx)
    .await?;

    let row = sqlx::query_as::<_, BloodRequestRow>(
        "UPDATE blood_requests \
         SET status = 'approved', units_approved = $2, hospital_response = $3, \
             responded_at = NOW(), updated_at = NOW() \
         WHERE id = $1 \
         RETURNING id, user_id, user_name, user_phone, hospital_id, blood_group, \
                   units_requested, units_approved, urgency, patient_name, notes, status, \
                   hospital_response, responded_at, expires_at, created_at, updated_at",
    )
    .bind(id)
    .bind(units_approved)
    .bind(response)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(row)
}

/// Rejects a pending request. No stock is touched.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] for an unknown id,
/// [`DbError::InvalidStatusTransition`] when the request is not
/// pending, and [`DbError::Sqlx`] if a query fails.
pub async fn reject_blood_request(
    pool: &PgPool,
    id: Uuid,
    response: Option<&str>,
) -> Result<BloodRequestRow, DbError> {
    let row = sqlx::query_as::<_, BloodRequestRow>(
        "UPDATE blood_requests \
         SET status = 'rejected', hospital_response = $2, responded_at = NOW(), \
             updated_at = NOW() \
         WHERE id = $1 AND status = 'pending' \
         RETURNING id, user_id, user_name, user_phone, hospital_id, blood_group, \
                   units_requested, units_approved, urgency, patient_name, notes, status, \
                   hospital_response, responded_at, expires_at, created_at, updated_at",
    )
    .bind(id)
    .bind(response)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(row),
        None => match get_blood_request(pool, id).await? {
            Some(existing) => Err(DbError::InvalidStatusTransition {
                from: existing.status,
                to: "rejected".to_owned(),
            }),
            None => Err(DbError::NotFound),
        },
    }
}

/// Marks an approved request fulfilled, deducting the approved units
/// from stock and releasing the reservation in one transaction.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] for an unknown id,
/// [`DbError::InvalidStatusTransition`] when the request is not
/// approved, and [`DbError::Sqlx`] if a query fails.
pub async fn fulfil_blood_request(pool: &PgPool, id: Uuid) -> Result<BloodRequestRow, DbError> {
    let mut tx = pool.begin().await?;

    let request = lock_request(&mut tx, id).await?.ok_or(DbError::NotFound)?;
    if request.status != REQUEST_APPROVED {
        return Err(DbError::InvalidStatusTransition {
            from: request.status,
            to: "fulfilled".to_owned(),
        });
    }
    // Approved requests always carry a unit count.
    let units = request.units_approved.unwrap_or(0);

    sqlx::query(
        "UPDATE blood_inventory \
         SET units_available = GREATEST(units_available - $3, 0), \
             units_reserved = GREATEST(units_reserved - $3, 0), \
             updated_at = NOW() \
         WHERE hospital_id = $1 AND blood_group = $2",
    )
    .bind(request.hospital_id)
    .bind(&request.blood_group)
    .bind(units)
    .execute(&mut *tx)
    .await?;

    let row = sqlx::query_as::<_, BloodRequestRow>(
        "UPDATE blood_requests \
         SET status = 'fulfilled', updated_at = NOW() \
         WHERE id = $1 \
         RETURNING id, user_id, user_name, user_phone, hospital_id, blood_group, \
                   units_requested, units_approved, urgency, patient_name, notes, status, \
                   hospital_response, responded_at, expires_at, created_at, updated_at",
    )
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(row)
}

/// Expires overdue requests.
///
/// Pending requests past their deadline flip to `expired`. Approved
/// requests past their deadline flip to `expired` as well, and the
/// units they had reserved go back to the unreserved pool.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any query fails; the sweep is atomic.
pub async fn expire_due_requests(pool: &PgPool) -> Result<ExpirySummary, DbError> {
    let mut tx = pool.begin().await?;

    let expired_pending = sqlx::query(
        "UPDATE blood_requests \
         SET status = 'expired', updated_at = NOW() \
         WHERE status = 'pending' AND expires_at IS NOT NULL AND expires_at < NOW()",
    )
    .execute(&mut *tx)
    .await?
    .rows_affected();

    #[derive(sqlx::FromRow)]
    struct Released {
        hospital_id: Uuid,
        blood_group: String,
        units: i32,
    }

    let released = sqlx::query_as::<_, Released>(
        "UPDATE blood_requests \
         SET status = 'expired', updated_at = NOW() \
         WHERE status = 'approved' AND expires_at IS NOT NULL AND expires_at < NOW() \
         RETURNING hospital_id, blood_group, COALESCE(units_approved, 0) AS units",
    )
    .fetch_all(&mut *tx)
    .await?;

    let mut totals: HashMap<(Uuid, String), i64> = HashMap::new();
    for release in &released {
        *totals
            .entry((release.hospital_id, release.blood_group.clone()))
            .or_insert(0) += i64::from(release.units);
    }

    for ((hospital_id, blood_group), units) in totals {
        sqlx::query(
            "UPDATE blood_inventory \
             SET units_reserved = GREATEST(units_reserved - $3, 0), updated_at = NOW() \
             WHERE hospital_id = $1 AND blood_group = $2",
        )
        .bind(hospital_id)
        .bind(&blood_group)
        .bind(i32::try_from(units).unwrap_or(i32::MAX))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(ExpirySummary {
        expired_pending,
        released_approved: released.len() as u64,
    })
}

async fn lock_request(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> Result<Option<BloodRequestRow>, DbError> {
    let row = sqlx::query_as::<_, BloodRequestRow>(
        "SELECT id, user_id, user_name, user_phone, hospital_id, blood_group, \
                units_requested, units_approved, urgency, patient_name, notes, status, \
                hospital_response, responded_at, expires_at, created_at, updated_at \
         FROM blood_requests \
         WHERE id = $1 \
         FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_all_eight_blood_groups() {
        for group in BLOOD_GROUPS {
            assert!(is_valid_blood_group(group), "{group} should be valid");
        }
        assert!(!is_valid_blood_group("C+"));
        assert!(!is_valid_blood_group("a+"));
        assert!(!is_valid_blood_group("AB"));
        assert!(!is_valid_blood_group(""));
    }

    #[test]
    fn recognizes_urgency_levels() {
        assert!(is_valid_urgency("normal"));
        assert!(is_valid_urgency("urgent"));
        assert!(is_valid_urgency("critical"));
        assert!(!is_valid_urgency("asap"));
        assert!(!is_valid_urgency("NORMAL"));
    }
}
