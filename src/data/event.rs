//! The event repository.
//!
//! Events are stored on their discussion threads: a pinned message whose
//! first embed is the "Event Details" embed (with the attendee list as a
//! second embed), under a thread whose name encodes the current start time.

use std::sync::Arc;

use serenity::all::{
    ChannelId, CreateMessage, EditMessage, EditThread, GuildChannel, GuildId, Http, Message,
    UserId,
};

use crate::{
    config::GuildConfig,
    error::{AppError, ParseError},
    format::{embed, thread_name},
    model::event::EventMonkeyEvent,
};

/// The pieces of a thread the repository needs, detached from serenity's
/// channel struct so services can carry it around cheaply.
#[derive(Debug, Clone)]
pub struct ThreadRef {
    pub id: ChannelId,
    pub name: String,
    pub parent_id: Option<ChannelId>,
    /// When the thread last saw a message, from the snowflake of its last
    /// message id, falling back to the thread's own creation time.
    pub last_activity: chrono::DateTime<chrono::Utc>,
}

impl From<&GuildChannel> for ThreadRef {
    fn from(channel: &GuildChannel) -> Self {
        let last_activity = channel
            .last_message_id
            .map(|id| *id.created_at())
            .unwrap_or(*channel.id.created_at())
            .with_timezone(&chrono::Utc);
        Self {
            id: channel.id,
            name: channel.name.clone(),
            parent_id: channel.parent_id,
            last_activity,
        }
    }
}

pub struct EventRepository<'a> {
    http: Arc<Http>,
    config: &'a GuildConfig,
}

impl<'a> EventRepository<'a> {
    pub fn new(http: Arc<Http>, config: &'a GuildConfig) -> Self {
        Self { http, config }
    }

    /// The guild's active event threads: threads the bot itself created
    /// whose name matches the hosted-by pattern. A matching name on someone
    /// else's thread is left alone.
    pub async fn event_threads(&self, guild_id: GuildId) -> Result<Vec<ThreadRef>, AppError> {
        let bot_id = self.http.get_current_user().await?.id;
        let threads = guild_id.get_active_threads(&self.http).await?;
        Ok(threads
            .threads
            .iter()
            .filter(|thread| is_event_thread(&thread.name, thread.owner_id, bot_id))
            .map(ThreadRef::from)
            .collect())
    }

    pub async fn thread(&self, guild_id: GuildId, thread_id: ChannelId) -> Result<ThreadRef, AppError> {
        self.event_threads(guild_id)
            .await?
            .into_iter()
            .find(|thread| thread.id == thread_id)
            .ok_or_else(|| AppError::NotFound(format!("no active event thread {thread_id}")))
    }

    /// Loads the event persisted on a thread.
    pub async fn find_by_thread(&self, thread: &ThreadRef) -> Result<EventMonkeyEvent, AppError> {
        let message = self.details_message(thread.id).await?;

        let details = message
            .embeds
            .first()
            .ok_or(AppError::Parse(ParseError::NoEventEmbed))?;
        let snapshot = embed::EmbedSnapshot::from_embed(details);

        let mut event = embed::parse_event(&snapshot, &thread.name, self.config)?;
        if let Some(attendees) = message.embeds.get(1) {
            event.attendees = attendees
                .fields
                .iter()
                .find(|field| field.name == embed::ATTENDING_FIELD)
                .map(|field| embed::parse_attendees(&field.value))
                .unwrap_or_default();
        }
        event.thread_id = Some(thread.id);
        event.discussion_channel_id = thread.parent_id;

        Ok(event)
    }

    /// Creates the pinned record on a fresh thread.
    pub async fn insert(
        &self,
        guild_id: Option<GuildId>,
        event: &EventMonkeyEvent,
        message: CreateMessage,
    ) -> Result<Message, AppError> {
        let thread_id = require_thread(event)?;
        let message = thread_id
            .send_message(
                &self.http,
                message
                    .add_embed(embed::details_embed(event, guild_id))
                    .add_embed(embed::attendees_embed(&event.attendees)),
            )
            .await?;
        message.pin(&self.http).await?;
        Ok(message)
    }

    /// Rewrites the pinned record and the thread name after a change.
    pub async fn save(
        &self,
        guild_id: Option<GuildId>,
        event: &EventMonkeyEvent,
    ) -> Result<(), AppError> {
        let thread_id = require_thread(event)?;

        let name = thread_name::thread_name(
            event.scheduled_start_time,
            &event.name,
            &event.author_name,
            self.config.tz()?,
        );
        thread_id
            .edit_thread(&self.http, EditThread::new().name(name))
            .await?;

        let message = self.details_message(thread_id).await?;
        let edit = EditMessage::new().embeds(vec![
            embed::details_embed(event, guild_id),
            embed::attendees_embed(&event.attendees),
        ]);
        self.http
            .edit_message(thread_id, message.id, &edit, vec![])
            .await?;

        Ok(())
    }

    /// The pinned message carrying the details embed.
    pub async fn details_message(&self, thread_id: ChannelId) -> Result<Message, AppError> {
        thread_id
            .pins(&self.http)
            .await?
            .into_iter()
            .find(|message| {
                message
                    .embeds
                    .first()
                    .is_some_and(|e| e.title.as_deref() == Some(embed::DETAILS_TITLE))
            })
            .ok_or(AppError::Parse(ParseError::NoEventEmbed))
    }
}

fn require_thread(event: &EventMonkeyEvent) -> Result<ChannelId, AppError> {
    event
        .thread_id
        .ok_or_else(|| AppError::NotFound(format!("event {} has no discussion thread", event.id)))
}

/// A thread is claimed as an event thread only when the bot created it and
/// the name carries the hosted-by pattern.
fn is_event_thread(name: &str, owner_id: Option<UserId>, bot_id: UserId) -> bool {
    owner_id == Some(bot_id) && thread_name::parse_event_name(name).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const THREAD_NAME: &str = "03/01/24 06:00 PM UTC - Game Night hosted by somebody";

    /// Tests that a thread someone else created is never claimed, even with
    /// a name that matches the hosted-by pattern.
    #[test]
    fn claims_only_bot_owned_event_threads() {
        let bot = UserId::new(42);

        assert!(is_event_thread(THREAD_NAME, Some(bot), bot));
        assert!(!is_event_thread(THREAD_NAME, Some(UserId::new(7)), bot));
        assert!(!is_event_thread(THREAD_NAME, None, bot));
        assert!(!is_event_thread("general chat", Some(bot), bot));
    }
}
