use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Step unit of a recurring event.
///
/// Hours, days and weeks are fixed-duration steps. Months shift calendar
/// months so that "every N months" lands on the same day and time of a later
/// month, clamped to the last valid day when the target month is shorter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceUnit {
    Hours,
    Days,
    Weeks,
    Months,
}

impl RecurrenceUnit {
    /// Unit name as it appears in the serialized phrase, e.g. `"weeks"`.
    pub fn plural(self) -> &'static str {
        match self {
            Self::Hours => "hours",
            Self::Days => "days",
            Self::Weeks => "weeks",
            Self::Months => "months",
        }
    }

    /// Singular unit name, e.g. `"week"`.
    pub fn singular(self) -> &'static str {
        match self {
            Self::Hours => "hour",
            Self::Days => "day",
            Self::Weeks => "week",
            Self::Months => "month",
        }
    }
}

/// Recurrence state of an event.
///
/// `times_held` is the durable anchor for all future occurrence computation:
/// the next occurrence always starts `(times_held + 1)` steps after
/// `first_start_time`. It is advanced each time the bot regenerates the next
/// occurrence and written back into the persisted frequency text, so a
/// restarted process recomputes the same schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecurrence {
    /// Start time of the very first occurrence. Never changes.
    pub first_start_time: DateTime<Utc>,
    /// Number of occurrences completed so far.
    pub times_held: u32,
    /// Step unit.
    pub unit: RecurrenceUnit,
    /// Step size in `unit`s. Must be greater than zero.
    pub amount: u32,
}
