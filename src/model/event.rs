use chrono::{DateTime, Utc};
use serde::Deserialize;
use serenity::all::{ChannelId, ScheduledEventId, UserId};

use crate::model::recurrence::EventRecurrence;

/// The kind of location a scheduled event takes place in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    External,
    Voice,
    Stage,
}

/// Where an event happens, discriminated by entity kind.
///
/// The only variation between the kinds is which field is populated: external
/// events carry a free-form location string, voice and stage events carry the
/// channel they happen in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventLocation {
    External { location: String },
    Voice { channel: ChannelId },
    Stage { channel: ChannelId },
}

impl EventLocation {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::External { .. } => EntityKind::External,
            Self::Voice { .. } => EntityKind::Voice,
            Self::Stage { .. } => EntityKind::Stage,
        }
    }
}

/// One event as the bot understands it.
///
/// Created by the event command flow and re-derived from the pinned "Event
/// Details" embed on the event's discussion thread. There is no database;
/// this struct round-trips through `format::embed` and `format::thread_name`.
#[derive(Debug, Clone)]
pub struct EventMonkeyEvent {
    /// Stable identity, persisted in the "Event ID" embed field.
    pub id: String,
    pub name: String,
    pub description: String,
    pub author_id: UserId,
    pub author_name: String,
    /// Name of the configured event type this event belongs to.
    pub event_type: String,
    pub scheduled_start_time: DateTime<Utc>,
    pub duration_hours: u32,
    pub location: EventLocation,
    pub max_attendees: Option<u32>,
    pub image_url: Option<String>,
    pub recurrence: Option<EventRecurrence>,
    /// Users who clicked the Attending button.
    pub attendees: Vec<UserId>,
    /// Channel the discussion thread lives under.
    pub discussion_channel_id: Option<ChannelId>,
    /// The discussion thread, once created.
    pub thread_id: Option<ChannelId>,
    /// The Discord scheduled event, once created.
    pub scheduled_event_id: Option<ScheduledEventId>,
}

impl EventMonkeyEvent {
    /// Scheduled end time derived from start plus duration.
    pub fn scheduled_end_time(&self) -> DateTime<Utc> {
        self.scheduled_start_time + chrono::Duration::hours(i64::from(self.duration_hours))
    }

    /// Puts the host at the head of the attendee list. The host attends
    /// their own event from the moment it is created.
    pub fn ensure_author_attending(&mut self) {
        if !self.attendees.contains(&self.author_id) {
            self.attendees.insert(0, self.author_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> EventMonkeyEvent {
        EventMonkeyEvent {
            id: "e1".to_string(),
            name: "Game Night".to_string(),
            description: String::new(),
            author_id: UserId::new(1),
            author_name: "host".to_string(),
            event_type: "Meetup".to_string(),
            scheduled_start_time: Utc::now(),
            duration_hours: 2,
            location: EventLocation::External {
                location: "somewhere".to_string(),
            },
            max_attendees: None,
            image_url: None,
            recurrence: None,
            attendees: Vec::new(),
            discussion_channel_id: None,
            thread_id: None,
            scheduled_event_id: None,
        }
    }

    /// Tests that creation puts the host on their own attendee list exactly
    /// once.
    #[test]
    fn author_joins_their_own_event_once() {
        let mut event = event();

        event.ensure_author_attending();
        event.ensure_author_attending();

        assert_eq!(event.attendees, vec![event.author_id]);
    }

    /// Tests that an existing RSVP from the host keeps its position.
    #[test]
    fn existing_author_rsvp_is_kept() {
        let mut event = event();
        event.attendees = vec![UserId::new(5), event.author_id];

        event.ensure_author_attending();

        assert_eq!(event.attendees, vec![UserId::new(5), UserId::new(1)]);
    }
}
