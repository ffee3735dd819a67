//! Background jobs.
//!
//! Four cron jobs drive everything that is not interaction-driven:
//! - every minute: the announcement sweep (time-window rules)
//! - every 5 minutes: the recurrence restart sweep (occurrences that
//!   completed while the process was down)
//! - every 30 minutes: the thread-closure sweep
//! - every 30 minutes: the construction cache TTL sweep
//!
//! Each job body catches and logs its own errors so a failed cycle never
//! takes the scheduler down.

use std::sync::Arc;

use chrono::Utc;
use serenity::http::Http;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::{
    error::AppError,
    service::{AnnouncementService, RecurrenceService, ThreadService},
    state::AppState,
};

/// Registers and starts the background jobs. Returns once the scheduler is
/// running; the jobs keep going on the runtime.
pub async fn start_scheduler(state: Arc<AppState>, http: Arc<Http>) -> Result<(), AppError> {
    let scheduler = JobScheduler::new().await?;

    let job_state = state.clone();
    let job_http = http.clone();
    let announcements = Job::new_async("0 * * * * *", move |_uuid, _lock| {
        let state = job_state.clone();
        let http = job_http.clone();
        Box::pin(async move {
            let service = AnnouncementService::new(http, &state.config.guild);
            if let Err(e) = service.sweep().await {
                error!("Error running announcement sweep: {e}");
            }
        })
    })?;
    scheduler.add(announcements).await?;

    let job_state = state.clone();
    let job_http = http.clone();
    let recurrences = Job::new_async("0 */5 * * * *", move |_uuid, _lock| {
        let state = job_state.clone();
        let http = job_http.clone();
        Box::pin(async move {
            let service = RecurrenceService::new(http, &state.config.guild);
            if let Err(e) = service.sweep().await {
                error!("Error running recurrence restart sweep: {e}");
            }
        })
    })?;
    scheduler.add(recurrences).await?;

    let job_state = state.clone();
    let job_http = http.clone();
    let closures = Job::new_async("0 */30 * * * *", move |_uuid, _lock| {
        let state = job_state.clone();
        let http = job_http.clone();
        Box::pin(async move {
            let service = ThreadService::new(http, &state.config.guild);
            if let Err(e) = service.sweep().await {
                error!("Error running thread closure sweep: {e}");
            }
        })
    })?;
    scheduler.add(closures).await?;

    let job_state = state.clone();
    let cache_sweep = Job::new_async("30 */30 * * * *", move |_uuid, _lock| {
        let state = job_state.clone();
        Box::pin(async move {
            let removed = state
                .events_under_construction
                .sweep_expired(Utc::now())
                .await;
            if removed > 0 {
                info!("Dropped {removed} expired event drafts");
            }
        })
    })?;
    scheduler.add(cache_sweep).await?;

    scheduler.start().await?;
    info!("Background sweep scheduler started");

    Ok(())
}
