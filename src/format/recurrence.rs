//! Round-trips a recurrence rule to and from the human phrase persisted in
//! the "Frequency" embed field, e.g. `"every 2 weeks"`.
//!
//! The phrase also carries the held-occurrence count (`", held 3 times"`)
//! because the embed is the only store the count survives in. The exact
//! wording is a wire format; the tests pin it.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::{
    error::ParseError,
    model::recurrence::{EventRecurrence, RecurrenceUnit},
};

static RECURRENCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^every (?:(?P<amount>\d+) )?(?P<unit>hour|hours|day|days|week|weeks|month|months)(?:, held (?P<held>\d+) times?)?$",
    )
    .expect("recurrence pattern must compile")
});

/// Serializes a recurrence to the persisted frequency phrase.
///
/// An amount of one uses the singular form (`"every week"`); anything else is
/// `"every N <unit>s"`. A non-zero held count is appended as
/// `", held N times"` (`", held 1 time"` for one).
pub fn serialize(recurrence: &EventRecurrence) -> String {
    let mut output = if recurrence.amount == 1 {
        format!("every {}", recurrence.unit.singular())
    } else {
        format!("every {} {}", recurrence.amount, recurrence.unit.plural())
    };

    if recurrence.times_held > 0 {
        let times = if recurrence.times_held == 1 { "time" } else { "times" };
        output.push_str(&format!(", held {} {}", recurrence.times_held, times));
    }

    output
}

/// Parses the persisted frequency phrase back into a recurrence.
///
/// `first_start` is the event's first start time, carried by the thread name
/// rather than the phrase itself. Any text outside the recognized shapes
/// fails with a `ParseError` rather than guessing.
pub fn deserialize(
    text: &str,
    first_start: DateTime<Utc>,
) -> Result<EventRecurrence, ParseError> {
    let captures = RECURRENCE_PATTERN
        .captures(text.trim())
        .ok_or_else(|| ParseError::InvalidRecurrence(text.to_string()))?;

    let amount = match captures.name("amount") {
        Some(amount) => amount
            .as_str()
            .parse::<u32>()
            .map_err(|_| ParseError::InvalidRecurrence(text.to_string()))?,
        None => 1,
    };
    // An explicit amount is only written for two or more; one is always the
    // singular phrase. Accept exactly what serialize produces.
    if captures.name("amount").is_some() && amount < 2 {
        return Err(ParseError::InvalidRecurrence(text.to_string()));
    }

    let unit_text = captures
        .name("unit")
        .ok_or_else(|| ParseError::InvalidRecurrence(text.to_string()))?
        .as_str();
    // The singular form is only valid with an implied amount of one.
    let plural = unit_text.ends_with('s');
    if plural == (captures.name("amount").is_none()) {
        return Err(ParseError::InvalidRecurrence(text.to_string()));
    }

    let unit = match unit_text.trim_end_matches('s') {
        "hour" => RecurrenceUnit::Hours,
        "day" => RecurrenceUnit::Days,
        "week" => RecurrenceUnit::Weeks,
        "month" => RecurrenceUnit::Months,
        _ => return Err(ParseError::InvalidRecurrence(text.to_string())),
    };

    let times_held = match captures.name("held") {
        Some(held) => held
            .as_str()
            .parse::<u32>()
            .map_err(|_| ParseError::InvalidRecurrence(text.to_string()))?,
        None => 0,
    };

    Ok(EventRecurrence {
        first_start_time: first_start,
        times_held,
        unit,
        amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn first_start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 18, 0, 0).unwrap()
    }

    fn recurrence(unit: RecurrenceUnit, amount: u32, times_held: u32) -> EventRecurrence {
        EventRecurrence {
            first_start_time: first_start(),
            times_held,
            unit,
            amount,
        }
    }

    /// Pins the exact serialized strings for the recognized units.
    ///
    /// These strings are the only durable store for recurrence state; a
    /// wording change breaks every previously created recurring event.
    #[test]
    fn pins_serialized_phrases() {
        let cases = [
            (recurrence(RecurrenceUnit::Hours, 1, 0), "every hour"),
            (recurrence(RecurrenceUnit::Hours, 6, 0), "every 6 hours"),
            (recurrence(RecurrenceUnit::Days, 1, 0), "every day"),
            (recurrence(RecurrenceUnit::Days, 3, 0), "every 3 days"),
            (recurrence(RecurrenceUnit::Weeks, 1, 0), "every week"),
            (recurrence(RecurrenceUnit::Weeks, 2, 0), "every 2 weeks"),
            (recurrence(RecurrenceUnit::Months, 1, 0), "every month"),
            (recurrence(RecurrenceUnit::Months, 4, 0), "every 4 months"),
            (
                recurrence(RecurrenceUnit::Weeks, 1, 1),
                "every week, held 1 time",
            ),
            (
                recurrence(RecurrenceUnit::Weeks, 2, 5),
                "every 2 weeks, held 5 times",
            ),
        ];

        for (recurrence, expected) in cases {
            assert_eq!(serialize(&recurrence), expected);
        }
    }

    /// Tests that serialize/deserialize round-trips exactly for all units
    /// and amounts.
    #[test]
    fn round_trips_all_units() {
        let units = [
            RecurrenceUnit::Hours,
            RecurrenceUnit::Days,
            RecurrenceUnit::Weeks,
            RecurrenceUnit::Months,
        ];

        for unit in units {
            for amount in [1, 2, 12] {
                for times_held in [0, 1, 7] {
                    let original = recurrence(unit, amount, times_held);
                    let parsed =
                        deserialize(&serialize(&original), first_start()).unwrap();
                    assert_eq!(parsed, original);
                }
            }
        }
    }

    /// Tests that unrecognized text fails with a ParseError instead of
    /// guessing.
    #[test]
    fn rejects_unrecognized_text() {
        let inputs = [
            "",
            "weekly",
            "every fortnight",
            "every 2 week",  // plural mismatch
            "every 1 weeks", // explicit one is never written
            "every 1 week",
            "every weeks",
            "every 0 weeks",
            "every -1 days",
            "once every 2 weeks",
            "every 2 weeks or so",
        ];

        for input in inputs {
            assert!(
                deserialize(input, first_start()).is_err(),
                "should reject {input:?}"
            );
        }
    }

    /// Tests that the held count survives a round trip through the phrase.
    #[test]
    fn round_trips_held_count() {
        let original = recurrence(RecurrenceUnit::Months, 3, 11);
        let parsed = deserialize(&serialize(&original), first_start()).unwrap();
        assert_eq!(parsed.times_held, 11);
    }
}
