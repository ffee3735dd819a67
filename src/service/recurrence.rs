//! Restarting recurring events.
//!
//! When a recurring event's occurrence completes, the next occurrence is
//! computed, the guild scheduled event is recreated at the new times, and the
//! thread name and pinned record are rewritten with the advanced held count.
//! The gateway handler drives the common case; a five-minute sweep catches
//! occurrences that completed while the process was down.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serenity::all::{
    ChannelId, CreateEmbed, CreateMessage, GuildId, Http, ScheduledEvent, ScheduledEventStatus,
};
use tracing::{error, info, warn};

use crate::{
    config::GuildConfig,
    data::EventRepository,
    error::AppError,
    format::{embed, time},
    model::event::EventMonkeyEvent,
    recurrence::next_occurrence,
    service::EventService,
};

/// What became of a completed scheduled event.
pub enum RestartOutcome {
    /// The event recurs; the next occurrence has been published.
    Restarted(EventMonkeyEvent),
    /// One-shot event. The thread-closure sweep will retire it.
    NotRecurring,
}

pub struct RecurrenceService<'a> {
    http: Arc<Http>,
    config: &'a GuildConfig,
}

impl<'a> RecurrenceService<'a> {
    pub fn new(http: Arc<Http>, config: &'a GuildConfig) -> Self {
        Self { http, config }
    }

    /// Gateway path: a scheduled event just completed.
    pub async fn handle_completed(
        &self,
        guild_id: GuildId,
        scheduled: &ScheduledEvent,
    ) -> Result<RestartOutcome, AppError> {
        let Some(thread_id) = scheduled
            .description
            .as_deref()
            .and_then(embed::parse_discussion_thread)
        else {
            return Ok(RestartOutcome::NotRecurring);
        };

        let repository = EventRepository::new(self.http.clone(), self.config);
        let thread = repository.thread(guild_id, thread_id).await?;
        let event = repository.find_by_thread(&thread).await?;

        if event.recurrence.is_none() {
            return Ok(RestartOutcome::NotRecurring);
        }
        self.restart(guild_id, event).await.map(RestartOutcome::Restarted)
    }

    /// Poll path: restart recurring events whose occurrence ended while no
    /// live scheduled event remains (completed or canceled offline).
    pub async fn sweep(&self) -> Result<(), AppError> {
        for guild in self.http.get_guilds(None, None).await? {
            if let Err(e) = self.sweep_guild(guild.id).await {
                error!("recurrence sweep failed for guild {}: {e}", guild.id);
            }
        }
        Ok(())
    }

    async fn sweep_guild(&self, guild_id: GuildId) -> Result<(), AppError> {
        let now = Utc::now();
        let live: HashSet<ChannelId> = guild_id
            .scheduled_events(&self.http, false)
            .await?
            .iter()
            .filter(|entry| {
                matches!(
                    entry.status,
                    ScheduledEventStatus::Scheduled | ScheduledEventStatus::Active
                )
            })
            .filter_map(|entry| {
                entry
                    .description
                    .as_deref()
                    .and_then(embed::parse_discussion_thread)
            })
            .collect();

        let repository = EventRepository::new(self.http.clone(), self.config);
        for thread in repository.event_threads(guild_id).await? {
            if live.contains(&thread.id) {
                continue;
            }

            let event = match repository.find_by_thread(&thread).await {
                Ok(event) => event,
                Err(e) => {
                    warn!("skipping recurrence check for thread {}: {e}", thread.id);
                    continue;
                }
            };
            if event.recurrence.is_none() || event.scheduled_end_time() > now {
                continue;
            }

            if let Err(e) = self.restart(guild_id, event).await {
                error!("failed to restart event on thread {}: {e}", thread.id);
            }
        }

        Ok(())
    }

    async fn restart(
        &self,
        guild_id: GuildId,
        mut event: EventMonkeyEvent,
    ) -> Result<EventMonkeyEvent, AppError> {
        let recurrence = event
            .recurrence
            .as_ref()
            .ok_or_else(|| AppError::NotFound(format!("event {} does not recur", event.id)))?;

        let occurrence = next_occurrence(recurrence, event.duration_hours, Utc::now())?;
        event.scheduled_start_time = occurrence.start;
        if let Some(recurrence) = event.recurrence.as_mut() {
            recurrence.times_held = occurrence.times_held;
        }
        // The completed scheduled event is gone from the guild list already;
        // update() will create the replacement.
        event.scheduled_event_id = None;

        let service = EventService::new(self.http.clone(), self.config);
        let event = service.update(guild_id, event).await?;

        if let Some(thread_id) = event.thread_id {
            let next = time::format_time(occurrence.start, self.config.tz()?);
            thread_id
                .send_message(
                    &self.http,
                    CreateMessage::new().embed(
                        CreateEmbed::new()
                            .title("Event is over")
                            .description(format!("We'll see you next time at {next}!")),
                    ),
                )
                .await?;
        }

        info!(
            "restarted recurring event {} ({}): occurrence {} at {}",
            event.id,
            event.name,
            occurrence.times_held,
            occurrence.start
        );
        Ok(event)
    }
}
