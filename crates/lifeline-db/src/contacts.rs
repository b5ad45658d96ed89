//! Database operations for the `emergency_contacts` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `emergency_contacts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ContactRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Returns a user's emergency contacts, ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_contacts_for_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<ContactRow>, DbError> {
    let rows = sqlx::query_as::<_, ContactRow>(
        "SELECT id, user_id, name, phone, email, created_at \
         FROM emergency_contacts \
         WHERE user_id = $1 \
         ORDER BY name",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Inserts a new emergency contact and returns the stored row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_contact(
    pool: &PgPool,
    user_id: Uuid,
    name: &str,
    phone: &str,
    email: Option<&str>,
) -> Result<ContactRow, DbError> {
    let row = sqlx::query_as::<_, ContactRow>(
        "INSERT INTO emergency_contacts (user_id, name, phone, email) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id, user_id, name, phone, email, created_at",
    )
    .bind(user_id)
    .bind(name)
    .bind(phone)
    .bind(email)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Deletes a contact by id. Returns `true` when a row was removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_contact(pool: &PgPool, id: Uuid) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM emergency_contacts WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
