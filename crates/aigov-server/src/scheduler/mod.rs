//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the
//! recurring per-brand metrics recomputation job.

use std::sync::Arc;

use chrono::{Duration, Utc};
use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use aigov_engine::Mention;

/// Builds and starts the background job scheduler.
///
/// Registers the recomputation job and starts the scheduler. Returns the
/// running [`JobScheduler`] handle, which must be kept alive for the
/// lifetime of the process — dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// the job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    pool: PgPool,
    config: Arc<aigov_core::AppConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_recompute_job(&scheduler, pool, config).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the recurring metrics recomputation job.
///
/// Defaults to nightly at 03:00 UTC (`0 0 3 * * *`, overridable via
/// `AIGOV_RECOMPUTE_CRON`). For each active brand the job fetches the
/// mention window, prior snapshot, and CPI override, runs the engine, and
/// appends a new snapshot.
async fn register_recompute_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    config: Arc<aigov_core::AppConfig>,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);
    let cron = config.recompute_cron.clone();

    let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let config = Arc::clone(&config);

        Box::pin(async move {
            tracing::info!("scheduler: starting metrics recompute run");
            run_recompute_job(&pool, &config).await;
            tracing::info!("scheduler: metrics recompute run complete");
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

/// Drive the recomputation for all active brands.
///
/// Collaborator failures are logged per brand and never abort the whole
/// run; the engine itself cannot fail on data shape.
async fn run_recompute_job(pool: &PgPool, config: &aigov_core::AppConfig) {
    let brands = match aigov_db::list_active_brands(pool).await {
        Ok(b) => b,
        Err(e) => {
            tracing::error!(error = %e, "scheduler: failed to load active brands");
            return;
        }
    };

    if brands.is_empty() {
        tracing::info!("scheduler: no active brands; skipping recompute");
        return;
    }

    tracing::info!(count = brands.len(), "scheduler: recomputing metrics");

    for brand in &brands {
        recompute_brand(pool, brand, config.metrics_window_days).await;
    }
}

/// Fetch inputs, run the engine, and persist the snapshot for one brand.
async fn recompute_brand(pool: &PgPool, brand: &aigov_db::BrandRow, window_days: i64) {
    let since = Utc::now() - Duration::days(window_days);

    let mentions: Vec<Mention> = match aigov_db::list_mentions_since(pool, brand.id, since).await {
        Ok(rows) => rows
            .into_iter()
            .map(aigov_db::MentionRow::into_mention)
            .collect(),
        Err(e) => {
            tracing::error!(brand = %brand.slug, error = %e, "scheduler: mention fetch failed");
            return;
        }
    };

    let prior = match aigov_db::get_latest_metrics_by_brand(pool, brand.id).await {
        Ok(row) => row.map(aigov_db::MetricsSnapshotRow::into_snapshot),
        Err(e) => {
            tracing::error!(brand = %brand.slug, error = %e, "scheduler: prior snapshot fetch failed");
            return;
        }
    };

    let cpi_override = match aigov_db::get_latest_cpi_score(pool, brand.id).await {
        Ok(score) => score,
        Err(e) => {
            tracing::error!(brand = %brand.slug, error = %e, "scheduler: cpi override fetch failed");
            return;
        }
    };

    let assessment =
        aigov_engine::evaluate_brand(&mentions, prior.as_ref(), cpi_override, brand.id, Utc::now());

    match aigov_db::insert_metrics_snapshot(pool, &assessment.snapshot).await {
        Ok(_) => {
            tracing::info!(
                brand = %brand.slug,
                compliance = assessment.snapshot.compliance_score,
                findings = assessment.findings.len(),
                insufficient = assessment.snapshot.insufficient_data,
                "scheduler: snapshot persisted"
            );
        }
        Err(e) => {
            tracing::error!(brand = %brand.slug, error = %e, "scheduler: snapshot insert failed");
        }
    }
}
