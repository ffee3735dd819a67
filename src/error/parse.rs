use thiserror::Error;

/// Malformed persisted text.
///
/// All durable state lives in Discord message embeds and thread names, so
/// reading an event back is a parse of free text. Any failure here means the
/// one event the text belongs to is unreadable; callers skip it and continue
/// with the rest of the batch.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    /// A required embed field is absent.
    #[error("Missing embed field: {0}")]
    MissingField(&'static str),

    /// An embed field is present but its value cannot be interpreted.
    #[error("Invalid value for field '{field}': {value}")]
    InvalidField {
        /// Name of the embed field
        field: &'static str,
        /// The offending text
        value: String,
    },

    /// A timestamp string that does not match the persisted time format.
    #[error("Unable to parse date from string: {0}")]
    InvalidTime(String),

    /// A recurrence string that is not one of the recognized phrases.
    #[error("Unable to parse recurrence from string: {0}")]
    InvalidRecurrence(String),

    /// Thread name that does not match the `<time> - <name> hosted by ...`
    /// pattern.
    #[error("Unable to parse event name from string: {0}")]
    InvalidThreadName(String),

    /// Embed author that does not match the `name (id)` pattern.
    #[error("Unable to parse author from embed: {0}")]
    InvalidAuthor(String),

    /// Thread with no pinned "Event Details" embed.
    #[error("Thread has no event details embed")]
    NoEventEmbed,

    /// Event type name persisted on the embed is not in the configuration.
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),
}
