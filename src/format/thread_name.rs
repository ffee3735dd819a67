//! The discussion thread's name is itself persisted state: it carries the
//! human-readable scheduled start time and the event name in a fixed text
//! pattern, `"<time> - <name> hosted by <author>"`.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use regex::Regex;

use crate::{error::ParseError, format::time};

static EVENT_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(AM|PM)(\s+\w+)?\s+-\s+(?P<name>.*) hosted by ")
        .expect("event name pattern must compile")
});

/// Builds the thread name for an event.
pub fn thread_name(
    start: DateTime<Utc>,
    event_name: &str,
    author_name: &str,
    tz: Tz,
) -> String {
    format!(
        "{} - {} hosted by {}",
        time::format_time(start, tz),
        event_name,
        author_name
    )
}

/// Extracts the event name from a thread name.
pub fn parse_event_name(text: &str) -> Result<String, ParseError> {
    EVENT_NAME_PATTERN
        .captures(text)
        .and_then(|captures| captures.name("name"))
        .map(|name| name.as_str().to_string())
        .ok_or_else(|| ParseError::InvalidThreadName(text.to_string()))
}

/// Extracts the scheduled start time from a thread name.
pub fn parse_start_time(text: &str, tz: Tz) -> Result<DateTime<Utc>, ParseError> {
    time::parse_time(text, tz)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::UTC;

    /// Tests that a built thread name parses back to the same name and start.
    #[test]
    fn round_trips_name_and_start() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 18, 0, 0).unwrap();
        let name = thread_name(start, "Game Night", "somebody", UTC);

        assert_eq!(name, "03/01/24 06:00 PM UTC - Game Night hosted by somebody");
        assert_eq!(parse_event_name(&name).unwrap(), "Game Night");
        assert_eq!(parse_start_time(&name, UTC).unwrap(), start);
    }

    /// Tests that event names containing separators survive the round trip.
    #[test]
    fn keeps_separators_inside_event_name() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 18, 0, 0).unwrap();
        let name = thread_name(start, "D&D - Session 3", "gm", UTC);
        assert_eq!(parse_event_name(&name).unwrap(), "D&D - Session 3");
    }

    /// Tests rejection of a thread name without the hosted-by pattern.
    #[test]
    fn rejects_foreign_thread_names() {
        assert!(parse_event_name("general chat").is_err());
        assert!(parse_event_name("03/01/24 06:00 PM UTC - no host marker").is_err());
    }
}
