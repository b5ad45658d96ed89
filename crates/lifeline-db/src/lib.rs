//! Postgres access for the Lifeline emergency network.
//!
//! Pool construction, migrations and one module per table family.
//! Query functions take a `&PgPool` and return row structs; nothing in
//! here knows about HTTP.

use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;

use lifeline_core::AppConfig;

pub mod alerts;
pub mod blood;
pub mod contacts;
pub mod dispatch_adapters;
pub mod hospitals;
pub mod responders;
pub mod seed;
pub mod sos_requests;

pub use alerts::{
    alert_transition_allowed, get_emergency_alert, insert_emergency_alert, is_alert_status,
    list_emergency_alerts, transition_alert_status, EmergencyAlertRow, ALERT_STATUSES,
};
pub use blood::{
    approve_blood_request, expire_due_requests, fulfil_blood_request, get_blood_request,
    insert_blood_request, is_valid_blood_group, is_valid_urgency, list_blood_requests,
    list_inventory, list_inventory_for_hospital, reject_blood_request, upsert_inventory,
    BloodInventoryRow, BloodRequestRow, ExpirySummary, NewBloodRequest, BLOOD_GROUPS,
    URGENCY_LEVELS,
};
pub use contacts::{delete_contact, insert_contact, list_contacts_for_user, ContactRow};
pub use dispatch_adapters::{PgDispatchStore, PgProviderDirectory};
pub use hospitals::{
    get_hospital, list_dispatchable_hospitals, list_hospitals, HospitalRow,
};
pub use responders::{
    get_responder, list_on_duty_responders, responder_stats, set_responder_availability,
    ResponderRow, ResponderStatsRow,
};
pub use seed::{seed_hospitals, SeedSummary};
pub use sos_requests::{
    get_sos_request, insert_sos_request, is_sos_status, list_sos_requests, sos_transition_allowed,
    transition_sos_status, SosRequestRow, SOS_STATUSES,
};

// Path relative to crates/lifeline-db/Cargo.toml; resolves to <workspace-root>/migrations/
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Error)]
pub enum DbError {
    #[error("DATABASE_URL is not set")]
    MissingDatabaseUrl,
    #[error("record not found")]
    NotFound,
    #[error("invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },
    #[error("insufficient unreserved stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i32, available: i32 },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Pool sizing knobs, kept separate from [`AppConfig`] so callers that
/// never load full app configuration (tests, one-off tools) can still
/// open a pool.
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl PoolConfig {
    const MAX_CONNECTIONS: u32 = 10;
    const MIN_CONNECTIONS: u32 = 1;
    const ACQUIRE_TIMEOUT_SECS: u64 = 10;

    /// Read pool sizing from `LIFELINE_DB_*` variables, falling back to
    /// the defaults for anything unset or unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            max_connections: env_or("LIFELINE_DB_MAX_CONNECTIONS", Self::MAX_CONNECTIONS),
            min_connections: env_or("LIFELINE_DB_MIN_CONNECTIONS", Self::MIN_CONNECTIONS),
            acquire_timeout_secs: env_or(
                "LIFELINE_DB_ACQUIRE_TIMEOUT_SECS",
                Self::ACQUIRE_TIMEOUT_SECS,
            ),
        }
    }

    /// Copy pool sizing out of an already loaded [`AppConfig`].
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: Self::MAX_CONNECTIONS,
            min_connections: Self::MIN_CONNECTIONS,
            acquire_timeout_secs: Self::ACQUIRE_TIMEOUT_SECS,
        }
    }
}

fn env_or<T: FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

/// Open a Postgres pool against an explicit URL.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the connection cannot be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await
}

/// Open a Postgres pool from `DATABASE_URL` plus `LIFELINE_DB_*` sizing,
/// for tools that run without full app configuration.
///
/// # Errors
///
/// Returns [`DbError::MissingDatabaseUrl`] if `DATABASE_URL` is unset, or
/// [`DbError::Sqlx`] if the connection cannot be established.
pub async fn connect_pool_from_env() -> Result<PgPool, DbError> {
    let database_url = std::env::var("DATABASE_URL").map_err(|_| DbError::MissingDatabaseUrl)?;
    Ok(connect_pool(&database_url, PoolConfig::from_env()).await?)
}

/// Bring the schema up to date, returning how many migrations ran.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if any migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, sqlx::migrate::MigrateError> {
    let before = applied_count(pool).await;
    MIGRATOR.run(pool).await?;
    let after = applied_count(pool).await;

    Ok(usize::try_from((after - before).max(0)).unwrap_or(0))
}

// The _sqlx_migrations table does not exist on a fresh database; treat
// its absence as zero applied.
async fn applied_count(pool: &PgPool) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = true")
        .fetch_one(pool)
        .await
        .unwrap_or(0)
}

/// Verify the pool can serve a trivial query.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the round trip fails.
pub async fn health_check(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}
