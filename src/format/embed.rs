//! The pinned "Event Details" embed.
//!
//! The embed's named fields (`Type`, `Location`, `Duration`, `Frequency`,
//! `Max Attendees`, `Event ID`), its author line (`name (id)`) and its URL
//! (the Discord scheduled event link) are the event's durable record. This
//! module builds those fields from an [`EventMonkeyEvent`] and parses a
//! fetched embed back into one, with a `ParseError` for each way the text can
//! be malformed.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, Months, Utc};
use regex::Regex;
use serenity::all::{
    ChannelId, CreateEmbed, CreateEmbedAuthor, CreateEmbedFooter, Embed, GuildId,
    ScheduledEventId, UserId,
};

use crate::{
    config::GuildConfig,
    error::ParseError,
    format::{recurrence as recurrence_format, thread_name},
    model::{
        announcement::{AnnouncementKind, AnnouncementRule},
        event::{EntityKind, EventLocation, EventMonkeyEvent},
        recurrence::{EventRecurrence, RecurrenceUnit},
    },
};

pub const DETAILS_TITLE: &str = "Event Details";
pub const ATTENDEES_TITLE: &str = "Attendees";
pub const ATTENDING_FIELD: &str = "Attending";
pub const NO_ATTENDEES: &str = "No one yet!";

const TYPE_FIELD: &str = "Type";
const LOCATION_FIELD: &str = "Location";
const DURATION_FIELD: &str = "Duration";
const FREQUENCY_FIELD: &str = "Frequency";
const MAX_ATTENDEES_FIELD: &str = "Max Attendees";
const EVENT_ID_FIELD: &str = "Event ID";

static AUTHOR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>.*) \((?P<id>\d+)\)$").expect("author pattern must compile")
});
static CHANNEL_MENTION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<#(?P<id>\d+)>").expect("channel pattern must compile"));
static EVENT_URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"discord\.com/events/\d+/(?P<id>\d+)").expect("event url pattern must compile")
});
static USER_MENTION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<@(?P<id>\d+)>").expect("user pattern must compile"));
static DISCUSSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Discussion: <#(?P<id>\d+)>").expect("discussion pattern must compile")
});

/// Description of a Discord scheduled event: the user's description plus the
/// marker linking it back to the discussion thread that holds the embed.
pub fn scheduled_event_description(description: &str, thread_id: ChannelId) -> String {
    if description.is_empty() {
        format!("Discussion: <#{thread_id}>")
    } else {
        format!("{description}\n\nDiscussion: <#{thread_id}>")
    }
}

/// Reads the discussion thread id back out of a scheduled event description.
/// Scheduled events without the marker were not created by the bot.
pub fn parse_discussion_thread(description: &str) -> Option<ChannelId> {
    DISCUSSION_PATTERN
        .captures(description)
        .and_then(|captures| captures["id"].parse::<u64>().ok())
        .filter(|id| *id != 0)
        .map(ChannelId::new)
}

/// The named field values of the details embed, in display order. Pure, so
/// the wire format is testable without Discord objects.
pub fn details_fields(event: &EventMonkeyEvent) -> Vec<(String, String)> {
    let mut fields = vec![
        (TYPE_FIELD.to_string(), event.event_type.clone()),
        (LOCATION_FIELD.to_string(), location_value(&event.location)),
        (
            DURATION_FIELD.to_string(),
            duration_value(event.duration_hours),
        ),
    ];

    if let Some(recurrence) = &event.recurrence {
        fields.push((
            FREQUENCY_FIELD.to_string(),
            recurrence_format::serialize(recurrence),
        ));
    }
    if let Some(max) = event.max_attendees {
        fields.push((MAX_ATTENDEES_FIELD.to_string(), max.to_string()));
    }
    fields.push((EVENT_ID_FIELD.to_string(), event.id.clone()));

    fields
}

fn location_value(location: &EventLocation) -> String {
    match location {
        EventLocation::External { location } => location.clone(),
        EventLocation::Voice { channel } | EventLocation::Stage { channel } => {
            format!("<#{}>", channel)
        }
    }
}

fn duration_value(hours: u32) -> String {
    if hours == 1 {
        "1 hour".to_string()
    } else {
        format!("{hours} hours")
    }
}

/// Builds the details embed for posting or editing.
pub fn details_embed(event: &EventMonkeyEvent, guild_id: Option<GuildId>) -> CreateEmbed {
    let mut embed = CreateEmbed::new()
        .title(DETAILS_TITLE)
        .description(event.description.clone())
        .author(CreateEmbedAuthor::new(format!(
            "{} ({})",
            event.author_name, event.author_id
        )));

    if let (Some(guild_id), Some(event_id)) = (guild_id, event.scheduled_event_id) {
        embed = embed.url(event_url(guild_id, event_id));
    }
    if let Some(image) = &event.image_url {
        embed = embed.thumbnail(image.clone());
    }

    for (name, value) in details_fields(event) {
        embed = embed.field(name, value, true);
    }

    embed
}

/// The link Discord renders for a scheduled event.
pub fn event_url(guild_id: GuildId, event_id: ScheduledEventId) -> String {
    format!("https://discord.com/events/{guild_id}/{event_id}")
}

/// Builds the attendees embed shown under the details embed.
pub fn attendees_embed(attendees: &[UserId]) -> CreateEmbed {
    CreateEmbed::new()
        .title(ATTENDEES_TITLE)
        .field(ATTENDING_FIELD, attending_value(attendees), false)
}

fn attending_value(attendees: &[UserId]) -> String {
    if attendees.is_empty() {
        NO_ATTENDEES.to_string()
    } else {
        attendees
            .iter()
            .map(|id| format!("<@{id}>"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Parses the value of the "Attending" field back into user ids.
pub fn parse_attendees(value: &str) -> Vec<UserId> {
    USER_MENTION_PATTERN
        .captures_iter(value)
        .filter_map(|captures| captures["id"].parse::<u64>().ok())
        .map(UserId::new)
        .collect()
}

/// A plain-data copy of the pieces of a fetched embed the parser reads.
///
/// Serenity's model structs are non-exhaustive and cannot be constructed in
/// tests; this snapshot is the typed boundary between the platform object
/// and the parser.
#[derive(Debug, Clone, Default)]
pub struct EmbedSnapshot {
    pub author_name: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub fields: Vec<(String, String)>,
}

impl EmbedSnapshot {
    pub fn from_embed(embed: &Embed) -> Self {
        Self {
            author_name: embed.author.as_ref().map(|author| author.name.clone()),
            description: embed.description.clone(),
            url: embed.url.clone(),
            thumbnail_url: embed.thumbnail.as_ref().map(|thumb| thumb.url.clone()),
            fields: embed
                .fields
                .iter()
                .map(|field| (field.name.clone(), field.value.clone()))
                .collect(),
        }
    }

    fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field_name, _)| field_name == name)
            .map(|(_, value)| value.as_str())
    }

    fn required_field(&self, name: &'static str) -> Result<&str, ParseError> {
        self.field(name).ok_or(ParseError::MissingField(name))
    }
}

/// Parses a details embed (plus the thread name it was pinned under) back
/// into an event.
///
/// The thread name supplies the event name and the current occurrence's start
/// time; everything else comes from the embed fields. The configured event
/// type resolves the entity kind the location text is read as.
pub fn parse_event(
    snapshot: &EmbedSnapshot,
    thread_name_text: &str,
    config: &GuildConfig,
) -> Result<EventMonkeyEvent, ParseError> {
    let tz = config
        .tz()
        .map_err(|_| ParseError::InvalidTime(config.time_zone.clone()))?;

    let id = snapshot.required_field(EVENT_ID_FIELD)?.to_string();

    let author_text = snapshot
        .author_name
        .as_deref()
        .ok_or(ParseError::InvalidAuthor(String::new()))?;
    let author_captures = AUTHOR_PATTERN
        .captures(author_text)
        .ok_or_else(|| ParseError::InvalidAuthor(author_text.to_string()))?;
    let author_id = author_captures["id"]
        .parse::<u64>()
        .map_err(|_| ParseError::InvalidAuthor(author_text.to_string()))?;
    let author_name = author_captures["name"].to_string();

    let type_name = snapshot.required_field(TYPE_FIELD)?;
    let event_type = config
        .event_type(type_name)
        .ok_or_else(|| ParseError::UnknownEventType(type_name.to_string()))?;

    let name = thread_name::parse_event_name(thread_name_text)?;
    let scheduled_start_time = thread_name::parse_start_time(thread_name_text, tz)?;

    let duration_text = snapshot.required_field(DURATION_FIELD)?;
    let duration_hours = duration_text
        .trim_end_matches(" hours")
        .trim_end_matches(" hour")
        .parse::<u32>()
        .map_err(|_| ParseError::InvalidField {
            field: DURATION_FIELD,
            value: duration_text.to_string(),
        })?;

    let location_text = snapshot.required_field(LOCATION_FIELD)?;
    let location = parse_location(location_text, event_type.entity_kind)?;

    let max_attendees = match snapshot.field(MAX_ATTENDEES_FIELD) {
        Some(value) => Some(value.parse::<u32>().map_err(|_| ParseError::InvalidField {
            field: MAX_ATTENDEES_FIELD,
            value: value.to_string(),
        })?),
        None => None,
    };

    let recurrence = match snapshot.field(FREQUENCY_FIELD) {
        Some(value) => {
            let parsed = recurrence_format::deserialize(value, scheduled_start_time)?;
            Some(anchor_recurrence(parsed, scheduled_start_time))
        }
        None => None,
    };

    let scheduled_event_id = snapshot
        .url
        .as_deref()
        .and_then(|url| EVENT_URL_PATTERN.captures(url))
        .and_then(|captures| captures["id"].parse::<u64>().ok())
        .map(ScheduledEventId::new);

    Ok(EventMonkeyEvent {
        id,
        name,
        description: snapshot.description.clone().unwrap_or_default(),
        author_id: UserId::new(author_id),
        author_name,
        event_type: event_type.name.clone(),
        scheduled_start_time,
        duration_hours,
        location,
        max_attendees,
        image_url: snapshot.thumbnail_url.clone(),
        recurrence,
        attendees: Vec::new(),
        discussion_channel_id: None,
        thread_id: None,
        scheduled_event_id,
    })
}

fn parse_location(text: &str, kind: EntityKind) -> Result<EventLocation, ParseError> {
    match kind {
        EntityKind::External => Ok(EventLocation::External {
            location: text.to_string(),
        }),
        EntityKind::Voice | EntityKind::Stage => {
            let captures =
                CHANNEL_MENTION_PATTERN
                    .captures(text)
                    .ok_or(ParseError::InvalidField {
                        field: LOCATION_FIELD,
                        value: text.to_string(),
                    })?;
            let channel = captures["id"]
                .parse::<u64>()
                .map_err(|_| ParseError::InvalidField {
                    field: LOCATION_FIELD,
                    value: text.to_string(),
                })?;
            let channel = ChannelId::new(channel);
            Ok(match kind {
                EntityKind::Stage => EventLocation::Stage { channel },
                _ => EventLocation::Voice { channel },
            })
        }
    }
}

/// Re-derives the recurrence anchor from the current occurrence's start.
///
/// The thread name carries the current start; rewinding `times_held` steps
/// recovers the first start. Exact for fixed-duration units; for month steps
/// a first start that was clamped (the 31st of a month) rewinds to the
/// clamped day, which is as much as the persisted text can reconstruct.
fn anchor_recurrence(parsed: EventRecurrence, current_start: DateTime<Utc>) -> EventRecurrence {
    let steps = parsed.times_held * parsed.amount;
    let first_start_time = match parsed.unit {
        RecurrenceUnit::Hours => current_start - Duration::hours(i64::from(steps)),
        RecurrenceUnit::Days => current_start - Duration::days(i64::from(steps)),
        RecurrenceUnit::Weeks => current_start - Duration::weeks(i64::from(steps)),
        RecurrenceUnit::Months => current_start
            .checked_sub_months(Months::new(steps))
            .unwrap_or(current_start),
    };

    EventRecurrence {
        first_start_time,
        ..parsed
    }
}

/// Title of an announcement embed. Part of the deduplication identity, so
/// distinct rules for the same event produce distinct titles.
pub fn announcement_title(event: &EventMonkeyEvent, rule: &AnnouncementRule) -> String {
    match (rule.kind, rule.time_before_minutes) {
        (AnnouncementKind::Starting, Some(minutes)) => {
            format!("Starting in {} minutes: {}", minutes, event.name)
        }
        (AnnouncementKind::Ending, Some(minutes)) => {
            format!("Ending in {} minutes: {}", minutes, event.name)
        }
        (AnnouncementKind::Started, _) => format!("Starting now: {}", event.name),
        (AnnouncementKind::Ended, _) => format!("Event is over: {}", event.name),
        // Window rules without a lead time are rejected at config load.
        (AnnouncementKind::Starting, None) => format!("Starting soon: {}", event.name),
        (AnnouncementKind::Ending, None) => format!("Ending soon: {}", event.name),
    }
}

/// Footer of an announcement embed; identifies the occurrence being
/// announced so recurring events dedup per occurrence.
pub fn announcement_footer(event: &EventMonkeyEvent) -> String {
    format!(
        "Event {} · {}",
        event.id,
        event.scheduled_start_time.format("%Y-%m-%d %H:%M UTC")
    )
}

/// Builds the announcement embed itself.
pub fn announcement_embed(event: &EventMonkeyEvent, rule: &AnnouncementRule) -> CreateEmbed {
    let mut embed = CreateEmbed::new()
        .title(announcement_title(event, rule))
        .description(event.description.clone())
        .footer(CreateEmbedFooter::new(announcement_footer(event)));

    if let Some(image) = &event.image_url {
        embed = embed.thumbnail(image.clone());
    }

    embed
}
