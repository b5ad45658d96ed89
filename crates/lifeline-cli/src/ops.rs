//! Operations command handlers for the CLI.
//!
//! These are called from `main` after env loading and logging are
//! established. Each handler opens its own database pool. `drill`
//! writes real emergency records, so point it at a staging database;
//! its dispatcher never calls external relays.

use std::path::Path;
use std::sync::Arc;

use lifeline_core::{
    load_app_config, load_hospital_catalog, Coordinate, DispatchContext, DispatchOutcome,
    DispatchTrigger, Dispatcher, EmergencyCategory,
};
use lifeline_db::{
    connect_pool, connect_pool_from_env, PgDispatchStore, PgProviderDirectory, PoolConfig,
};
use lifeline_relay::{EchoEnhancer, NoopSink};
use uuid::Uuid;

/// Apply pending migrations against `DATABASE_URL`.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub(crate) async fn run_migrate() -> anyhow::Result<()> {
    let pool = connect_pool_from_env().await?;
    let applied = lifeline_db::run_migrations(&pool).await?;
    if applied == 0 {
        println!("database is up to date");
    } else {
        println!("applied {applied} migrations");
    }
    Ok(())
}

/// Load the hospital catalog and upsert it into the database.
///
/// Uses `--file` when given, otherwise the configured hospitals path.
/// Re-running refreshes contact details and re-activates hospitals that
/// were marked unavailable.
///
/// # Errors
///
/// Returns an error if the catalog fails to load or validate, or if the
/// seed transaction fails.
pub(crate) async fn run_seed(file: Option<&Path>) -> anyhow::Result<()> {
    let config = load_app_config()?;
    let path = file.unwrap_or(&config.hospitals_path);
    let catalog = load_hospital_catalog(path)?;

    let pool = connect_pool(&config.database_url, PoolConfig::from_app_config(&config)).await?;
    let summary = lifeline_db::seed_hospitals(&pool, &catalog.hospitals).await?;

    let available: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM hospitals WHERE is_available = TRUE")
            .fetch_one(&pool)
            .await?;

    println!(
        "seeded {} hospitals from {}: {} inserted, {} updated",
        catalog.hospitals.len(),
        path.display(),
        summary.inserted,
        summary.updated
    );
    println!("{available} hospitals are now available for dispatch");
    Ok(())
}

/// Run a full dispatch for a synthetic caller and print the report.
///
/// The drill exercises the real resolution path, including record
/// persistence, but wires a no-op notification sink and an echo
/// enhancer so nothing leaves the machine.
///
/// # Errors
///
/// Returns an error for an unknown category, out-of-range coordinates,
/// or a dispatch that fails outright (no location, persist failure).
pub(crate) async fn run_drill(
    lat: f64,
    lng: f64,
    category: &str,
    note: Option<String>,
) -> anyhow::Result<()> {
    let category = EmergencyCategory::parse(category)
        .ok_or_else(|| anyhow::anyhow!("category must be 'medical' or 'safety', got '{category}'"))?;
    let location = Coordinate::new(lat, lng)
        .ok_or_else(|| anyhow::anyhow!("coordinates ({lat}, {lng}) are out of range"))?;

    let config = load_app_config()?;
    let pool = connect_pool(&config.database_url, PoolConfig::from_app_config(&config)).await?;

    let dispatcher = Dispatcher::new(
        Arc::new(PgProviderDirectory::new(pool.clone())),
        Arc::new(PgDispatchStore::new(pool)),
        Arc::new(EchoEnhancer),
        Arc::new(NoopSink),
    );

    let trigger = DispatchTrigger {
        context: DispatchContext {
            user_id: Uuid::new_v4(),
            user_name: "Drill Operator".to_owned(),
            user_phone: "n/a".to_owned(),
        },
        location: Some(location),
        category,
        note,
    };

    let report = dispatcher.dispatch(trigger).await?;
    if matches!(report.outcome, DispatchOutcome::Logged) {
        tracing::warn!(
            "no provider could take the drill; check hospital seeding and responder duty status"
        );
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Run one expiry sweep over overdue blood requests.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the sweep
/// transaction fails.
pub(crate) async fn run_expire() -> anyhow::Result<()> {
    let pool = connect_pool_from_env().await?;
    let summary = lifeline_db::expire_due_requests(&pool).await?;
    println!(
        "expired {} pending requests, released {} approved reservations",
        summary.expired_pending, summary.released_approved
    );
    Ok(())
}
