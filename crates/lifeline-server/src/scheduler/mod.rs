//! Recurring background work.
//!
//! The server runs one cron job: the blood-request expiry sweep. Pending
//! requests past their deadline flip to `expired`; approved ones do too,
//! and their reserved units go back into the hospital's pool.

use std::sync::Arc;

use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Every 15 minutes, on the minute.
const EXPIRY_SWEEP_SCHEDULE: &str = "0 */15 * * * *";

/// Start the cron scheduler with the expiry sweep registered.
///
/// The returned handle must be kept alive for the lifetime of the
/// process; dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// the job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(pool: PgPool) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    scheduler.add(expiry_job(pool)?).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

fn expiry_job(pool: PgPool) -> Result<Job, JobSchedulerError> {
    let pool = Arc::new(pool);
    Job::new_async(EXPIRY_SWEEP_SCHEDULE, move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        Box::pin(async move {
            tracing::debug!("scheduler: running blood request expiry sweep");
            run_expiry_sweep(&pool).await;
        })
    })
}

/// One sweep. Quiet when nothing was due; a failed sweep is logged and
/// retried on the next tick rather than surfaced anywhere.
async fn run_expiry_sweep(pool: &PgPool) {
    match lifeline_db::expire_due_requests(pool).await {
        Ok(summary) => {
            if summary.expired_pending > 0 || summary.released_approved > 0 {
                tracing::info!(
                    expired = summary.expired_pending,
                    released = summary.released_approved,
                    "scheduler: expired overdue blood requests"
                );
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "scheduler: blood request expiry sweep failed");
        }
    }
}
