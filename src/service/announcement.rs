//! Announcement sending.
//!
//! Two entry points: the every-minute sweep evaluates the time-window rules
//! (`starting`/`ending`) for each live scheduled event, and the gateway
//! handler calls in directly when an event transitions (`started`/`ended`).
//! Both paths dedup against the destination's recent history before sending,
//! so a repeated poll or a replayed gateway delivery does not double-post.

use std::sync::Arc;

use chrono::Utc;
use serenity::all::{ChannelId, CreateMessage, GuildId, Http, ScheduledEvent, ScheduledEventStatus};
use tracing::{error, info, warn};

use crate::{
    announcement::{already_announced, dedup::embed_identities, due_triggers, LiveStatus, OccurrenceTimes},
    config::GuildConfig,
    data::{discord, EventRepository, GuildDirectory},
    error::AppError,
    format::embed,
    model::{
        announcement::{AnnouncementKind, AnnouncementRule},
        event::EventMonkeyEvent,
    },
};

pub struct AnnouncementService<'a> {
    http: Arc<Http>,
    config: &'a GuildConfig,
}

impl<'a> AnnouncementService<'a> {
    pub fn new(http: Arc<Http>, config: &'a GuildConfig) -> Self {
        Self { http, config }
    }

    /// The every-minute sweep over all guilds the bot is in.
    pub async fn sweep(&self) -> Result<(), AppError> {
        for guild in self.http.get_guilds(None, None).await? {
            if let Err(e) = self.sweep_guild(guild.id).await {
                error!("announcement sweep failed for guild {}: {e}", guild.id);
            }
        }
        Ok(())
    }

    async fn sweep_guild(&self, guild_id: GuildId) -> Result<(), AppError> {
        let now = Utc::now();
        let scheduled = guild_id.scheduled_events(&self.http, false).await?;
        if scheduled.is_empty() {
            return Ok(());
        }

        let directory = GuildDirectory::load(&self.http, guild_id).await?;
        let repository = EventRepository::new(self.http.clone(), self.config);
        let threads = repository.event_threads(guild_id).await?;

        for entry in &scheduled {
            let status = match entry.status {
                ScheduledEventStatus::Scheduled => LiveStatus::Scheduled,
                ScheduledEventStatus::Active => LiveStatus::Active,
                // Nothing left to announce on the poll path.
                _ => continue,
            };

            let Some(thread_id) = entry
                .description
                .as_deref()
                .and_then(embed::parse_discussion_thread)
            else {
                continue;
            };
            let Some(thread) = threads.iter().find(|t| t.id == thread_id) else {
                continue;
            };

            let event = match repository.find_by_thread(thread).await {
                Ok(event) => event,
                Err(e) => {
                    warn!("skipping announcements for thread {thread_id}: {e}");
                    continue;
                }
            };
            let Some(event_type) = self.config.event_type(&event.event_type) else {
                continue;
            };

            let times = OccurrenceTimes {
                start: Some(entry.start_time.with_timezone(&Utc)),
                end: entry
                    .end_time
                    .map(|end| end.with_timezone(&Utc))
                    .or(Some(event.scheduled_end_time())),
            };

            let evaluation = due_triggers(&event_type.announcements, &times, now, status);
            for rule in &evaluation.indeterminate {
                warn!(
                    "cannot evaluate {} rule for event {}: needed timestamp unresolved",
                    rule.kind.as_str(),
                    event.id
                );
            }
            for rule in &evaluation.due {
                if let Err(e) = self.send(&directory, &event, rule, thread_id).await {
                    error!(
                        "failed to send {} announcement for event {}: {e}",
                        rule.kind.as_str(),
                        event.id
                    );
                }
            }
        }

        Ok(())
    }

    /// Gateway path: the scheduled event just became active or completed.
    pub async fn announce_transition(
        &self,
        guild_id: GuildId,
        scheduled: &ScheduledEvent,
        kind: AnnouncementKind,
    ) -> Result<(), AppError> {
        let Some(thread_id) = scheduled
            .description
            .as_deref()
            .and_then(embed::parse_discussion_thread)
        else {
            // Not one of ours.
            return Ok(());
        };

        let repository = EventRepository::new(self.http.clone(), self.config);
        let thread = repository.thread(guild_id, thread_id).await?;
        let event = repository.find_by_thread(&thread).await?;
        let Some(event_type) = self.config.event_type(&event.event_type) else {
            return Ok(());
        };

        let directory = GuildDirectory::load(&self.http, guild_id).await?;
        for rule in event_type
            .announcements
            .iter()
            .filter(|rule| rule.kind == kind)
        {
            if let Err(e) = self.send(&directory, &event, rule, thread_id).await {
                error!(
                    "failed to send {} announcement for event {}: {e}",
                    kind.as_str(),
                    event.id
                );
            }
        }

        Ok(())
    }

    /// Sends one rule's announcement to its destinations, skipping any
    /// destination that already carries it.
    async fn send(
        &self,
        directory: &GuildDirectory,
        event: &EventMonkeyEvent,
        rule: &AnnouncementRule,
        thread_id: ChannelId,
    ) -> Result<(), AppError> {
        let title = embed::announcement_title(event, rule);
        let footer = embed::announcement_footer(event);

        let mut destinations: Vec<ChannelId> = Vec::new();
        for reference in &rule.channels {
            match directory.resolve(reference) {
                Some(channel) => destinations.push(channel),
                None => warn!("announcement channel {reference} not found, skipping"),
            }
        }
        // The discussion thread always hears about its own event.
        if !destinations.contains(&thread_id) {
            destinations.push(thread_id);
        }

        let content = mention_content(rule, event);
        for destination in destinations {
            let history = discord::recent_messages(&self.http, destination).await?;
            if already_announced(embed_identities(&history), &title, &footer) {
                continue;
            }

            let mut message = CreateMessage::new().embed(embed::announcement_embed(event, rule));
            if !content.is_empty() {
                message = message.content(content.clone());
            }
            destination.send_message(&self.http, message).await?;
            info!(
                "announced {} for event {} in channel {destination}",
                rule.kind.as_str(),
                event.id
            );
        }

        Ok(())
    }
}

/// The plain-text line above the announcement embed: the configured message
/// plus whichever mentions the rule asks for.
fn mention_content(rule: &AnnouncementRule, event: &EventMonkeyEvent) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(message) = &rule.message {
        parts.push(message.clone());
    }
    if rule.mention.everyone {
        parts.push("@everyone".to_string());
    }
    if rule.mention.here {
        parts.push("@here".to_string());
    }
    if rule.mention.attendees && !event.attendees.is_empty() {
        parts.push(
            event
                .attendees
                .iter()
                .map(|id| format!("<@{id}>"))
                .collect::<Vec<_>>()
                .join(" "),
        );
    }
    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::announcement::MentionOptions;
    use crate::model::event::EventLocation;
    use serenity::all::UserId;

    fn event_with_attendees(attendees: Vec<UserId>) -> EventMonkeyEvent {
        EventMonkeyEvent {
            id: "abc".to_string(),
            name: "Game Night".to_string(),
            description: String::new(),
            author_id: UserId::new(1),
            author_name: "host".to_string(),
            event_type: "Meetup".to_string(),
            scheduled_start_time: Utc::now(),
            duration_hours: 1,
            location: EventLocation::External {
                location: "here".to_string(),
            },
            max_attendees: None,
            image_url: None,
            recurrence: None,
            attendees,
            discussion_channel_id: None,
            thread_id: None,
            scheduled_event_id: None,
        }
    }

    fn rule(mention: MentionOptions, message: Option<&str>) -> AnnouncementRule {
        AnnouncementRule {
            kind: AnnouncementKind::Started,
            time_before_minutes: None,
            channels: Vec::new(),
            message: message.map(str::to_string),
            mention,
        }
    }

    /// Tests that the mention line combines the configured message and the
    /// requested mention groups.
    #[test]
    fn builds_mention_content() {
        let event = event_with_attendees(vec![UserId::new(7), UserId::new(8)]);
        let rule = rule(
            MentionOptions {
                attendees: true,
                here: true,
                everyone: false,
            },
            Some("It's happening!"),
        );

        assert_eq!(
            mention_content(&rule, &event),
            "It's happening!\n@here\n<@7> <@8>"
        );
    }

    /// Tests that no mention options and no message produce an empty line,
    /// which the sender omits entirely.
    #[test]
    fn empty_mention_content_when_nothing_requested() {
        let event = event_with_attendees(Vec::new());
        let rule = rule(MentionOptions::default(), None);

        assert!(mention_content(&rule, &event).is_empty());
    }
}
