//! Event publishing and updating.
//!
//! Publishing an event creates three Discord objects in order: the discussion
//! thread (named for the start time), the guild scheduled event (whose
//! description links back to the thread), and the pinned details message that
//! is the event's durable record.

use std::sync::Arc;

use serenity::all::{
    ButtonStyle, ChannelType, CreateActionRow, CreateButton, CreateMessage, CreateScheduledEvent,
    CreateThread, EditMessage, GuildId, Http, ScheduledEvent, ScheduledEventType, Timestamp,
    UserId,
};
use tracing::info;

use crate::{
    config::GuildConfig,
    data::{EventRepository, GuildDirectory, ThreadRef},
    error::AppError,
    format::{embed, thread_name},
    model::event::{EventLocation, EventMonkeyEvent},
};

pub const ATTENDING_BUTTON: &str = "attending";
pub const NOT_ATTENDING_BUTTON: &str = "not_attending";

/// Result of an RSVP button press.
pub enum AttendanceOutcome {
    Updated(EventMonkeyEvent),
    /// The attendee cap is reached and the user is not already on the list.
    Full,
}

pub struct EventService<'a> {
    http: Arc<Http>,
    config: &'a GuildConfig,
}

impl<'a> EventService<'a> {
    pub fn new(http: Arc<Http>, config: &'a GuildConfig) -> Self {
        Self { http, config }
    }

    fn repository(&self) -> EventRepository<'a> {
        EventRepository::new(self.http.clone(), self.config)
    }

    /// Publishes a fully-built event to the guild.
    pub async fn publish(
        &self,
        guild_id: GuildId,
        mut event: EventMonkeyEvent,
    ) -> Result<EventMonkeyEvent, AppError> {
        event.ensure_author_attending();

        let directory = GuildDirectory::load(&self.http, guild_id).await?;
        let event_type = self.config.event_type(&event.event_type).ok_or_else(|| {
            AppError::NotFound(format!("event type {} is not configured", event.event_type))
        })?;
        let discussion = directory
            .resolve(&event_type.discussion_channel)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "discussion channel {} not found in guild {guild_id}",
                    event_type.discussion_channel
                ))
            })?;

        let name = thread_name::thread_name(
            event.scheduled_start_time,
            &event.name,
            &event.author_name,
            self.config.tz()?,
        );
        let thread = discussion
            .create_thread(
                &self.http,
                CreateThread::new(name).kind(ChannelType::PublicThread),
            )
            .await?;
        event.discussion_channel_id = Some(discussion);
        event.thread_id = Some(thread.id);

        let scheduled = self.create_scheduled_event(guild_id, &event).await?;
        event.scheduled_event_id = Some(scheduled.id);

        self.repository()
            .insert(
                Some(guild_id),
                &event,
                CreateMessage::new().components(vec![rsvp_buttons()]),
            )
            .await?;

        info!(
            "published event {} ({}) in guild {guild_id}, thread {}",
            event.id, event.name, thread.id
        );
        Ok(event)
    }

    /// Applies an edit to a published event: rewrites the pinned record and
    /// thread name, and replaces the guild scheduled event so its times and
    /// location match.
    pub async fn update(
        &self,
        guild_id: GuildId,
        mut event: EventMonkeyEvent,
    ) -> Result<EventMonkeyEvent, AppError> {
        if let Some(id) = event.scheduled_event_id.take() {
            // A completed event is already gone from the guild list; deleting
            // it again is not an error worth aborting the update over.
            let _ = guild_id.delete_scheduled_event(&self.http, id).await;
        }
        let scheduled = self.create_scheduled_event(guild_id, &event).await?;
        event.scheduled_event_id = Some(scheduled.id);

        self.repository().save(Some(guild_id), &event).await?;

        info!("updated event {} ({}) in guild {guild_id}", event.id, event.name);
        Ok(event)
    }

    /// Records an RSVP button press on the event's pinned message.
    pub async fn set_attendance(
        &self,
        guild_id: GuildId,
        thread: &ThreadRef,
        user_id: UserId,
        attending: bool,
    ) -> Result<AttendanceOutcome, AppError> {
        let repository = self.repository();
        let mut event = repository.find_by_thread(thread).await?;

        if attending {
            if event.attendees.contains(&user_id) {
                return Ok(AttendanceOutcome::Updated(event));
            }
            if let Some(max) = event.max_attendees {
                if event.attendees.len() >= max as usize {
                    return Ok(AttendanceOutcome::Full);
                }
            }
            event.attendees.push(user_id);
        } else {
            event.attendees.retain(|id| *id != user_id);
        }

        // Only the attendees embed changed, but the record is rewritten as a
        // unit so the two embeds never drift apart.
        let message = repository.details_message(thread.id).await?;
        let edit = EditMessage::new().embeds(vec![
            embed::details_embed(&event, Some(guild_id)),
            embed::attendees_embed(&event.attendees),
        ]);
        self.http
            .edit_message(thread.id, message.id, &edit, vec![])
            .await?;

        Ok(AttendanceOutcome::Updated(event))
    }

    async fn create_scheduled_event(
        &self,
        guild_id: GuildId,
        event: &EventMonkeyEvent,
    ) -> Result<ScheduledEvent, AppError> {
        let thread_id = event.thread_id.ok_or_else(|| {
            AppError::NotFound(format!("event {} has no discussion thread", event.id))
        })?;

        let start = Timestamp::from(event.scheduled_start_time);
        let end = Timestamp::from(event.scheduled_end_time());
        let description = embed::scheduled_event_description(&event.description, thread_id);

        let builder = match &event.location {
            EventLocation::External { location } => {
                CreateScheduledEvent::new(ScheduledEventType::External, &event.name, start)
                    .location(location)
                    .end_time(end)
            }
            EventLocation::Voice { channel } => {
                CreateScheduledEvent::new(ScheduledEventType::Voice, &event.name, start)
                    .channel_id(*channel)
                    .end_time(end)
            }
            EventLocation::Stage { channel } => {
                CreateScheduledEvent::new(ScheduledEventType::StageInstance, &event.name, start)
                    .channel_id(*channel)
                    .end_time(end)
            }
        };

        guild_id
            .create_scheduled_event(&self.http, builder.description(description))
            .await
            .map_err(AppError::from)
    }

}

/// The RSVP button row attached to the pinned details message.
pub fn rsvp_buttons() -> CreateActionRow {
    CreateActionRow::Buttons(vec![
        CreateButton::new(ATTENDING_BUTTON)
            .label("Attending")
            .style(ButtonStyle::Success),
        CreateButton::new(NOT_ATTENDING_BUTTON)
            .label("Not Attending")
            .style(ButtonStyle::Danger),
    ])
}
