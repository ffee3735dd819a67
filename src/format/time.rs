//! Guild-local time strings.
//!
//! Times shown to users and persisted in thread names use the guild's
//! configured time zone, formatted as `03/01/24 06:00 PM PST`. Parsing is
//! lenient about the year width and a trailing zone abbreviation but rejects
//! anything that is not a date-plus-12-hour-time.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;

static TIME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?P<month>\d{1,2})/(?P<day>\d{1,2})/(?P<year>\d{2}(?:\d{2})?),? (?P<hour>\d{1,2}):(?P<minute>\d{2}) (?P<meridiem>AM|PM)(?: [A-Za-z]{3,5})?",
    )
    .expect("time pattern must compile")
});

/// Formats an instant in the guild's time zone, e.g. `03/01/24 06:00 PM PST`.
pub fn format_time(instant: DateTime<Utc>, tz: Tz) -> String {
    instant
        .with_timezone(&tz)
        .format("%m/%d/%y %I:%M %p %Z")
        .to_string()
}

/// Parses the first guild-local time found in `text` back to an instant.
///
/// The zone abbreviation, if present, is ignored; the guild's configured time
/// zone is authoritative. An ambiguous local time (the fall-back DST hour)
/// resolves to the earlier instant.
pub fn parse_time(text: &str, tz: Tz) -> Result<DateTime<Utc>, crate::error::ParseError> {
    let captures = TIME_PATTERN
        .captures(text)
        .ok_or_else(|| crate::error::ParseError::InvalidTime(text.to_string()))?;

    let invalid = || crate::error::ParseError::InvalidTime(text.to_string());

    let month: u32 = captures["month"].parse().map_err(|_| invalid())?;
    let day: u32 = captures["day"].parse().map_err(|_| invalid())?;
    let mut year: i32 = captures["year"].parse().map_err(|_| invalid())?;
    if year < 100 {
        year += 2000;
    }

    let mut hour: u32 = captures["hour"].parse().map_err(|_| invalid())?;
    let minute: u32 = captures["minute"].parse().map_err(|_| invalid())?;
    if hour == 0 || hour > 12 {
        return Err(invalid());
    }
    let pm = captures["meridiem"].eq_ignore_ascii_case("pm");
    if hour == 12 {
        hour = 0;
    }
    if pm {
        hour += 12;
    }

    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)?;
    let time = NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(invalid)?;
    let local = NaiveDateTime::new(date, time);

    tz.from_local_datetime(&local)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::{America::Los_Angeles, UTC};

    /// Pins the persisted time string format.
    #[test]
    fn pins_time_format() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 1, 18, 0, 0).unwrap();
        assert_eq!(format_time(instant, UTC), "03/01/24 06:00 PM UTC");
        // 18:00 UTC is 10:00 PST.
        assert_eq!(format_time(instant, Los_Angeles), "03/01/24 10:00 AM PST");
    }

    /// Tests that formatted times parse back to the same instant.
    #[test]
    fn round_trips_through_guild_zone() {
        let instant = Utc.with_ymd_and_hms(2024, 7, 4, 1, 30, 0).unwrap();
        for tz in [UTC, Los_Angeles] {
            let text = format_time(instant, tz);
            assert_eq!(parse_time(&text, tz).unwrap(), instant);
        }
    }

    /// Tests lenient input shapes: four-digit years, comma separators, a
    /// missing zone abbreviation, and embedded surrounding text.
    #[test]
    fn accepts_lenient_input() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 18, 0, 0).unwrap();
        let inputs = [
            "03/01/24 06:00 PM",
            "3/1/2024, 6:00 pm",
            "03/01/24 06:00 PM UTC - Game Night hosted by somebody",
        ];
        for input in inputs {
            assert_eq!(parse_time(input, UTC).unwrap(), expected, "input {input:?}");
        }
    }

    /// Tests twelve-o'clock handling in both meridiems.
    #[test]
    fn handles_noon_and_midnight() {
        assert_eq!(
            parse_time("01/02/24 12:00 PM", UTC).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap()
        );
        assert_eq!(
            parse_time("01/02/24 12:00 AM", UTC).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()
        );
    }

    /// Tests rejection of text with no recognizable time.
    #[test]
    fn rejects_unparseable_text() {
        for input in ["", "tomorrow at noon", "13/45/24 99:99 XM", "03/01/24 18:00"] {
            assert!(parse_time(input, UTC).is_err(), "should reject {input:?}");
        }
    }
}
