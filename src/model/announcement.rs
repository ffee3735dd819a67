use chrono::Duration;
use serde::Deserialize;

/// When an announcement rule fires relative to the event it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnouncementKind {
    /// A configurable lead time before the scheduled start. Polled.
    Starting,
    /// The moment the event transitions to active. Fired by the gateway.
    Started,
    /// A configurable lead time before the scheduled end. Polled.
    Ending,
    /// The moment the event completes. Fired by the gateway.
    Ended,
}

impl AnnouncementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Started => "started",
            Self::Ending => "ending",
            Self::Ended => "ended",
        }
    }
}

/// Who gets mentioned in an announcement message.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct MentionOptions {
    /// Mention every user who clicked the Attending button.
    pub attendees: bool,
    pub here: bool,
    pub everyone: bool,
}

/// A configured announcement trigger.
///
/// Sourced from the guild configuration document, read-only at runtime. The
/// destination `channels` entries may be channel names or raw channel ids;
/// when empty, the announcement is only posted to the event's discussion
/// thread.
#[derive(Debug, Clone, Deserialize)]
pub struct AnnouncementRule {
    pub kind: AnnouncementKind,
    /// Lead time for `starting`/`ending` rules. Validated present for those
    /// kinds at configuration load.
    #[serde(default)]
    pub time_before_minutes: Option<u32>,
    #[serde(default)]
    pub channels: Vec<String>,
    /// Free-form message prepended above the announcement embed.
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub mention: MentionOptions,
}

impl AnnouncementRule {
    /// Lead time as a chrono duration, if the rule carries one.
    pub fn time_before(&self) -> Option<Duration> {
        self.time_before_minutes
            .map(|minutes| Duration::minutes(i64::from(minutes)))
    }
}
