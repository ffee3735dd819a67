//! Next-occurrence computation for recurring events.
//!
//! Pure date arithmetic: given a recurrence anchor (`first_start_time` plus
//! the number of occurrences already held) and a step size, compute when the
//! next occurrence starts and ends. The caller is responsible for persisting
//! the advanced `times_held` back into the event's frequency text.

use chrono::{DateTime, Duration, Months, Utc};

use crate::{
    error::ConfigError,
    model::recurrence::{EventRecurrence, RecurrenceUnit},
};

/// Iteration cap for the catch-up loop.
///
/// The loop is bounded by elapsed time divided by step size, but a process
/// that was offline across very many hourly occurrences could still spin for
/// a long while. Past this many steps the recurrence is reported as a
/// configuration error instead.
pub const MAX_CATCH_UP_STEPS: u32 = 10_000;

/// One concrete instance of a recurring event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// The occurrence count to persist: every occurrence before `start`,
    /// including any skipped while the process was offline, is accounted for.
    pub times_held: u32,
}

/// Computes the next occurrence of `recurrence` that starts after `now`.
///
/// The candidate start is `first_start_time + (times_held + 1) * step`. If
/// that is not in the future (the bot may have been offline across several
/// occurrences), the count is advanced one step at a time until the start is
/// in the future. Every skipped occurrence increments the returned
/// `times_held`, so recomputation from persisted state stays anchored.
///
/// # Errors
/// - `ConfigError::InvalidRecurrenceStep` if the step amount is zero
/// - `ConfigError::CatchUpExceeded` if more than [`MAX_CATCH_UP_STEPS`]
///   advances were needed
pub fn next_occurrence(
    recurrence: &EventRecurrence,
    duration_hours: u32,
    now: DateTime<Utc>,
) -> Result<Occurrence, ConfigError> {
    if recurrence.amount == 0 {
        return Err(ConfigError::InvalidRecurrenceStep);
    }

    let mut times_held = recurrence.times_held;
    let mut steps = 0u32;

    loop {
        let start = occurrence_start(recurrence, times_held + 1)?;
        if start > now {
            let end = start + Duration::hours(i64::from(duration_hours));
            return Ok(Occurrence {
                start,
                end,
                times_held: times_held + 1,
            });
        }

        times_held += 1;
        steps += 1;
        if steps > MAX_CATCH_UP_STEPS {
            return Err(ConfigError::CatchUpExceeded {
                max_steps: MAX_CATCH_UP_STEPS,
                first_start: recurrence.first_start_time,
            });
        }
    }
}

/// Start time of the occurrence `index` steps after the first start.
///
/// Month steps shift calendar months, clamping to the last valid day of the
/// target month (Jan 31 plus one month is the last day of February). All
/// other units are fixed-duration additions.
fn occurrence_start(
    recurrence: &EventRecurrence,
    index: u32,
) -> Result<DateTime<Utc>, ConfigError> {
    let total = index
        .checked_mul(recurrence.amount)
        .ok_or(ConfigError::InvalidRecurrenceStep)?;

    match recurrence.unit {
        RecurrenceUnit::Hours => Ok(recurrence.first_start_time + Duration::hours(i64::from(total))),
        RecurrenceUnit::Days => Ok(recurrence.first_start_time + Duration::days(i64::from(total))),
        RecurrenceUnit::Weeks => Ok(recurrence.first_start_time + Duration::weeks(i64::from(total))),
        RecurrenceUnit::Months => recurrence
            .first_start_time
            .checked_add_months(Months::new(total))
            .ok_or(ConfigError::InvalidRecurrenceStep),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn weekly(first: DateTime<Utc>, times_held: u32) -> EventRecurrence {
        EventRecurrence {
            first_start_time: first,
            times_held,
            unit: RecurrenceUnit::Weeks,
            amount: 1,
        }
    }

    /// Tests the end-to-end weekly scenario.
    ///
    /// A recurrence of "every 1 week" starting 2024-03-01T18:00 with a two
    /// hour duration: after the first occurrence completes, the next starts
    /// one week later and the held count advances from 0 to 1.
    ///
    /// Expected: start 2024-03-08T18:00, end 2024-03-08T20:00, times_held 1
    #[test]
    fn advances_one_week_after_first_occurrence() {
        let recurrence = weekly(utc(2024, 3, 1, 18, 0), 0);
        let now = utc(2024, 3, 1, 20, 0);

        let occurrence = next_occurrence(&recurrence, 2, now).unwrap();

        assert_eq!(occurrence.start, utc(2024, 3, 8, 18, 0));
        assert_eq!(occurrence.end, utc(2024, 3, 8, 20, 0));
        assert_eq!(occurrence.times_held, 1);
    }

    /// Tests catch-up across several missed occurrences.
    ///
    /// When "now" is far past the first start, every skipped occurrence must
    /// be counted: the returned start is strictly in the future and the held
    /// count reflects all the weeks in between.
    ///
    /// Expected: start strictly after now, times_held accounts for all skips
    #[test]
    fn catch_up_counts_every_skipped_occurrence() {
        let recurrence = weekly(utc(2024, 3, 1, 18, 0), 0);
        // Five weeks and a day later.
        let now = utc(2024, 4, 6, 12, 0);

        let occurrence = next_occurrence(&recurrence, 1, now).unwrap();

        assert!(occurrence.start > now);
        assert_eq!(occurrence.start, utc(2024, 4, 12, 18, 0));
        assert_eq!(occurrence.times_held, 6);
    }

    /// Tests that a recurrence whose next candidate is already in the future
    /// advances exactly one step.
    ///
    /// Expected: times_held goes from 3 to 4
    #[test]
    fn advances_single_step_when_candidate_is_future() {
        let recurrence = weekly(utc(2024, 3, 1, 18, 0), 3);
        let now = utc(2024, 3, 23, 12, 0);

        let occurrence = next_occurrence(&recurrence, 1, now).unwrap();

        assert_eq!(occurrence.start, utc(2024, 3, 29, 18, 0));
        assert_eq!(occurrence.times_held, 4);
    }

    /// Tests calendar month stepping with end-of-month clamping.
    ///
    /// January 31st plus one month must land on the last valid day of
    /// February, not an invalid date.
    ///
    /// Expected: 2024-02-29T10:00 (2024 is a leap year)
    #[test]
    fn month_step_clamps_to_last_valid_day() {
        let recurrence = EventRecurrence {
            first_start_time: utc(2024, 1, 31, 10, 0),
            times_held: 0,
            unit: RecurrenceUnit::Months,
            amount: 1,
        };
        let now = utc(2024, 1, 31, 12, 0);

        let occurrence = next_occurrence(&recurrence, 1, now).unwrap();

        assert_eq!(occurrence.start, utc(2024, 2, 29, 10, 0));
        assert_eq!(occurrence.times_held, 1);
    }

    /// Tests that month steps stay on the same day when the month allows it.
    ///
    /// Expected: the 15th of every second month at the same time
    #[test]
    fn month_step_keeps_day_and_time() {
        let recurrence = EventRecurrence {
            first_start_time: utc(2024, 1, 15, 19, 30),
            times_held: 0,
            unit: RecurrenceUnit::Months,
            amount: 2,
        };
        let now = utc(2024, 1, 16, 0, 0);

        let occurrence = next_occurrence(&recurrence, 3, now).unwrap();

        assert_eq!(occurrence.start, utc(2024, 3, 15, 19, 30));
        assert_eq!(occurrence.end, utc(2024, 3, 15, 22, 30));
    }

    /// Tests hourly stepping with an explicit amount.
    ///
    /// Expected: next start six hours after the first
    #[test]
    fn hourly_step_uses_amount() {
        let recurrence = EventRecurrence {
            first_start_time: utc(2024, 3, 1, 6, 0),
            times_held: 0,
            unit: RecurrenceUnit::Hours,
            amount: 6,
        };
        let now = utc(2024, 3, 1, 7, 0);

        let occurrence = next_occurrence(&recurrence, 1, now).unwrap();

        assert_eq!(occurrence.start, utc(2024, 3, 1, 12, 0));
    }

    /// Tests that a zero step amount is rejected.
    ///
    /// Expected: Err(InvalidRecurrenceStep), never a silent default
    #[test]
    fn rejects_zero_step_amount() {
        let mut recurrence = weekly(utc(2024, 3, 1, 18, 0), 0);
        recurrence.amount = 0;

        let result = next_occurrence(&recurrence, 1, utc(2024, 3, 2, 0, 0));

        assert!(matches!(result, Err(ConfigError::InvalidRecurrenceStep)));
    }

    /// Tests the catch-up iteration cap.
    ///
    /// An hourly recurrence more than MAX_CATCH_UP_STEPS hours in the past
    /// must fail instead of spinning.
    ///
    /// Expected: Err(CatchUpExceeded)
    #[test]
    fn caps_catch_up_iterations() {
        let recurrence = EventRecurrence {
            first_start_time: utc(2020, 1, 1, 0, 0),
            times_held: 0,
            unit: RecurrenceUnit::Hours,
            amount: 1,
        };
        // Several years of hourly occurrences.
        let now = utc(2024, 1, 1, 0, 0);

        let result = next_occurrence(&recurrence, 1, now);

        assert!(matches!(result, Err(ConfigError::CatchUpExceeded { .. })));
    }
}
