//! Seed the `hospitals` table from the YAML catalog.

use lifeline_core::HospitalEntry;
use sqlx::PgPool;

use crate::DbError;

/// Outcome of a catalog seed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub inserted: usize,
    pub updated: usize,
}

/// Upsert catalog hospitals into the database, keyed by name.
///
/// Re-running the seed refreshes contact details and coordinates and
/// re-activates hospitals that were marked unavailable. All upserts run
/// inside a single transaction; if any operation fails the entire batch
/// is rolled back.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_hospitals(
    pool: &PgPool,
    entries: &[HospitalEntry],
) -> Result<SeedSummary, DbError> {
    let mut tx = pool.begin().await?;
    let mut summary = SeedSummary::default();

    for entry in entries {
        // xmax = 0 only holds for freshly inserted tuples, which lets one
        // round trip report insert-vs-update.
        let is_new: bool = sqlx::query_scalar(
            "INSERT INTO hospitals (name, address, phone, email, latitude, longitude, is_available) \
             VALUES ($1, $2, $3, $4, $5, $6, true) \
             ON CONFLICT (name) DO UPDATE SET \
                 address = EXCLUDED.address, \
                 phone = EXCLUDED.phone, \
                 email = EXCLUDED.email, \
                 latitude = EXCLUDED.latitude, \
                 longitude = EXCLUDED.longitude, \
                 is_available = true, \
                 updated_at = NOW() \
             RETURNING (xmax = 0) AS is_new",
        )
        .bind(entry.name.trim())
        .bind(&entry.address)
        .bind(&entry.phone)
        .bind(&entry.email)
        .bind(entry.latitude)
        .bind(entry.longitude)
        .fetch_one(&mut *tx)
        .await?;

        if is_new {
            summary.inserted += 1;
        } else {
            summary.updated += 1;
        }
    }

    tx.commit().await?;
    Ok(summary)
}
