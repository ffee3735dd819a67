//! Scheduled event transition handlers.
//!
//! Discord pushes a `guild_scheduled_event_update` when an event starts or
//! completes, and a delete when it is canceled outright. Transitions drive
//! the gateway-kind announcements (`started`/`ended`) and, on completion,
//! either the recurrence restart or nothing; the thread-closure sweep
//! retires one-shot events later.

use serenity::all::{Context, ScheduledEvent, ScheduledEventStatus};
use tracing::error;

use crate::{
    model::announcement::AnnouncementKind,
    service::{AnnouncementService, RecurrenceService, ThreadService},
    state::AppState,
};

pub async fn handle_update(state: &AppState, ctx: Context, event: ScheduledEvent) {
    let config = &state.config.guild;
    let guild_id = event.guild_id;

    match event.status {
        ScheduledEventStatus::Active => {
            let announcements = AnnouncementService::new(ctx.http.clone(), config);
            if let Err(e) = announcements
                .announce_transition(guild_id, &event, AnnouncementKind::Started)
                .await
            {
                error!("failed to announce start of {}: {e}", event.id);
            }
        }
        ScheduledEventStatus::Completed => {
            let announcements = AnnouncementService::new(ctx.http.clone(), config);
            if let Err(e) = announcements
                .announce_transition(guild_id, &event, AnnouncementKind::Ended)
                .await
            {
                error!("failed to announce end of {}: {e}", event.id);
            }

            let recurrence = RecurrenceService::new(ctx.http.clone(), config);
            if let Err(e) = recurrence.handle_completed(guild_id, &event).await {
                error!("failed to restart recurring event {}: {e}", event.id);
            }
        }
        ScheduledEventStatus::Canceled => {
            close_thread(state, &ctx, &event).await;
        }
        _ => {}
    }
}

pub async fn handle_delete(state: &AppState, ctx: Context, event: ScheduledEvent) {
    close_thread(state, &ctx, &event).await;
}

async fn close_thread(state: &AppState, ctx: &Context, event: &ScheduledEvent) {
    let threads = ThreadService::new(ctx.http.clone(), &state.config.guild);
    if let Err(e) = threads
        .close_for_scheduled_event(event.guild_id, event)
        .await
    {
        error!("failed to close thread for canceled event {}: {e}", event.id);
    }
}
