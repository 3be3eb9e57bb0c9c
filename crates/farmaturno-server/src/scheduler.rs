//! Background collection triggers.
//!
//! A cron job fires the collector on the configured schedule and timezone;
//! an optional one-shot run happens at startup. Every trigger goes through
//! [`Collector::run_exclusive`], so a trigger that fires while a run is
//! still active is skipped.

use std::sync::Arc;

use farmaturno_core::AppConfig;
use farmaturno_scraper::{Collector, Connector, SessionFactory};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

pub type SharedCollector = Arc<Collector<Connector>>;

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process. Dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// the cron expression is invalid, or the scheduler fails to start.
pub async fn build_scheduler(
    collector: SharedCollector,
    config: &AppConfig,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    register_collection_job(&scheduler, collector, config).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

async fn register_collection_job(
    scheduler: &JobScheduler,
    collector: SharedCollector,
    config: &AppConfig,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async_tz(
        config.schedule.as_str(),
        config.timezone,
        move |_uuid, _lock| {
            let collector = Arc::clone(&collector);
            Box::pin(async move {
                trigger(&collector, "cron").await;
            })
        },
    )?;

    scheduler.add(job).await?;
    tracing::info!(
        schedule = %config.schedule,
        timezone = %config.timezone,
        "scheduler: collection job registered"
    );
    Ok(())
}

/// Kick off one collection in the background without waiting for it.
pub fn spawn_startup_run(collector: SharedCollector) {
    tokio::spawn(async move {
        trigger(&collector, "startup").await;
    });
}

/// Run one collection unless another is already active. Outcomes are
/// logged; nothing is returned because triggers have no caller to report to.
pub async fn trigger<F: SessionFactory>(collector: &Collector<F>, source: &'static str) {
    tracing::info!(source, "scheduler: collection triggered");
    match collector.run_exclusive().await {
        Some(Ok(summary)) => tracing::info!(
            source,
            pharmacies = summary.pharmacies,
            elapsed_ms = summary.elapsed_ms,
            "scheduler: collection complete"
        ),
        Some(Err(e)) => tracing::warn!(source, error = %e, "scheduler: collection failed"),
        None => tracing::debug!(source, "scheduler: trigger skipped"),
    }
}
