//! Discussion thread retirement.
//!
//! A thread stays open for discussion after its event ends and is only locked
//! and archived once it has been quiet for the configured delay. Recurring
//! events never reach this sweep: their threads are kept alive by the
//! recurrence restart.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serenity::all::{
    ChannelId, Colour, CreateEmbed, CreateMessage, EditMessage, EditThread, GuildId, Http,
    ScheduledEvent, ScheduledEventStatus,
};
use tracing::{error, info, warn};

use crate::{
    config::GuildConfig,
    data::{EventRepository, ThreadRef},
    error::AppError,
    format::embed,
};

/// Why the thread is being retired; decides the closing embed's title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosureReason {
    Over,
    Canceled,
}

impl ClosureReason {
    fn title(self) -> &'static str {
        match self {
            Self::Over => "Event is Over",
            Self::Canceled => "Event is Canceled",
        }
    }
}

pub struct ThreadService<'a> {
    http: Arc<Http>,
    config: &'a GuildConfig,
}

impl<'a> ThreadService<'a> {
    pub fn new(http: Arc<Http>, config: &'a GuildConfig) -> Self {
        Self { http, config }
    }

    /// The thread-closure sweep: retire event threads with no live scheduled
    /// event once they have been quiet long enough.
    pub async fn sweep(&self) -> Result<(), AppError> {
        for guild in self.http.get_guilds(None, None).await? {
            if let Err(e) = self.sweep_guild(guild.id).await {
                error!("thread closure sweep failed for guild {}: {e}", guild.id);
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
                    warn!("skipping closure check for thread {}: {e}", thread.id);
                    continue;
                }
            };
            // Recurring events restart instead of closing, and an event that
            // has not ended yet keeps its thread even without a live
            // scheduled event entry.
            if event.recurrence.is_some() || event.scheduled_end_time() > now {
                continue;
            }
            if now - thread.last_activity < self.config.close_threads_after() {
                continue;
            }

            if let Err(e) = self.close(&thread, ClosureReason::Over).await {
                error!("failed to close thread {}: {e}", thread.id);
            }
        }

        Ok(())
    }

    /// Gateway path: the scheduled event was deleted out from under a thread.
    pub async fn close_for_scheduled_event(
        &self,
        guild_id: GuildId,
        scheduled: &ScheduledEvent,
    ) -> Result<(), AppError> {
        let Some(thread_id) = scheduled
            .description
            .as_deref()
            .and_then(embed::parse_discussion_thread)
        else {
            return Ok(());
        };

        let repository = EventRepository::new(self.http.clone(), self.config);
        let thread = repository.thread(guild_id, thread_id).await?;
        self.close(&thread, ClosureReason::Canceled).await
    }

    /// Strips the RSVP buttons, posts and pins the closing embed, then locks
    /// and archives the thread.
    pub async fn close(&self, thread: &ThreadRef, reason: ClosureReason) -> Result<(), AppError> {
        let repository = EventRepository::new(self.http.clone(), self.config);
        if let Ok(message) = repository.details_message(thread.id).await {
            if !message.components.is_empty() {
                let edit = EditMessage::new().components(Vec::new());
                self.http
                    .edit_message(thread.id, message.id, &edit, vec![])
                    .await?;
            }
        }

        let closing = thread
            .id
            .send_message(
                &self.http,
                CreateMessage::new().embed(
                    CreateEmbed::new()
                        .title(reason.title())
                        .description("Thread has been locked and archived.")
                        .colour(Colour::DARK_RED),
                ),
            )
            .await?;
        closing.pin(&self.http).await?;

        thread
            .id
            .edit_thread(&self.http, EditThread::new().locked(true).archived(true))
            .await?;

        info!("closed event thread {} ({})", thread.id, thread.name);
        Ok(())
    }
}
