//! Decides which configured announcement rules are due for an event.
//!
//! The evaluator runs on a coarse poll interval, so time-window rules carry a
//! one minute floor: without it, a rule whose lead time is smaller than the
//! poll granularity would fire on every poll after the window closes as the
//! remaining time drifts negative.

use chrono::{DateTime, Duration, Utc};

use crate::model::announcement::{AnnouncementKind, AnnouncementRule};

/// Live status of the Discord scheduled event, as last seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveStatus {
    Scheduled,
    Active,
    Completed,
    Canceled,
}

/// The schedule snapshot an event is evaluated against.
///
/// Either timestamp may be absent while the platform has not resolved it yet;
/// rules needing that timestamp are then indeterminate rather than an error,
/// so one unresolved event cannot abort the rest of the batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct OccurrenceTimes {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// Outcome of evaluating one event's rules.
#[derive(Debug, Default)]
pub struct TriggerEvaluation<'a> {
    /// Rules that should fire now.
    pub due: Vec<&'a AnnouncementRule>,
    /// Rules that could not be evaluated because the timestamp they need is
    /// unavailable. Logged by the caller, never fired.
    pub indeterminate: Vec<&'a AnnouncementRule>,
}

/// Evaluates which time-window rules are due at `now`.
///
/// - `starting`: due iff the time until start is within
///   `(1 minute, time_before]` and the event is not already active.
/// - `ending`: due iff the time until end is within `(1 minute, time_before]`
///   and the event IS active.
/// - `started`/`ended` are gateway-driven, never returned by the poll path.
pub fn due_triggers<'a>(
    rules: &'a [AnnouncementRule],
    times: &OccurrenceTimes,
    now: DateTime<Utc>,
    status: LiveStatus,
) -> TriggerEvaluation<'a> {
    let floor = Duration::minutes(1);
    let mut evaluation = TriggerEvaluation::default();

    for rule in rules {
        let Some(time_before) = rule.time_before() else {
            // Gateway-driven kinds, or a misconfigured window rule that
            // slipped past validation. Neither belongs to the poll path.
            continue;
        };

        let deadline = match rule.kind {
            AnnouncementKind::Starting => {
                if status == LiveStatus::Active {
                    continue;
                }
                times.start
            }
            AnnouncementKind::Ending => {
                if status != LiveStatus::Active {
                    continue;
                }
                times.end
            }
            AnnouncementKind::Started | AnnouncementKind::Ended => continue,
        };

        let Some(deadline) = deadline else {
            evaluation.indeterminate.push(rule);
            continue;
        };

        let remaining = deadline - now;
        if remaining > floor && remaining <= time_before {
            evaluation.due.push(rule);
        }
    }

    evaluation
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crate::model::announcement::MentionOptions;

    fn rule(kind: AnnouncementKind, time_before_minutes: Option<u32>) -> AnnouncementRule {
        AnnouncementRule {
            kind,
            time_before_minutes,
            channels: vec!["announcements".to_string()],
            message: None,
            mention: MentionOptions::default(),
        }
    }

    fn at(minute_offset: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 18, 0, 0).unwrap() + Duration::minutes(minute_offset)
    }

    /// Tests the starting-rule window edges for a 30 minute lead time.
    ///
    /// Fires 29 minutes before start; does not fire 31 minutes before (window
    /// not yet open), nor 30 seconds before (floor), nor once active.
    #[test]
    fn starting_rule_window_edges() {
        let rules = vec![rule(AnnouncementKind::Starting, Some(30))];
        let times = OccurrenceTimes {
            start: Some(at(0)),
            end: None,
        };

        let fires = |now: DateTime<Utc>, status: LiveStatus| {
            !due_triggers(&rules, &times, now, status).due.is_empty()
        };

        assert!(fires(at(-29), LiveStatus::Scheduled));
        assert!(!fires(at(-31), LiveStatus::Scheduled));
        assert!(!fires(at(0) - Duration::seconds(30), LiveStatus::Scheduled));
        assert!(!fires(at(-29), LiveStatus::Active));
    }

    /// Tests that the window boundary itself is inclusive at the lead time
    /// and exclusive at the floor.
    #[test]
    fn starting_rule_boundaries() {
        let rules = vec![rule(AnnouncementKind::Starting, Some(30))];
        let times = OccurrenceTimes {
            start: Some(at(0)),
            end: None,
        };

        // Exactly 30 minutes out: inside the window.
        assert_eq!(
            due_triggers(&rules, &times, at(-30), LiveStatus::Scheduled)
                .due
                .len(),
            1
        );
        // Exactly 1 minute out: at the floor, not inside.
        assert!(due_triggers(&rules, &times, at(-1), LiveStatus::Scheduled)
            .due
            .is_empty());
    }

    /// Tests that an ending rule only fires while the event is active.
    #[test]
    fn ending_rule_requires_active_status() {
        let rules = vec![rule(AnnouncementKind::Ending, Some(15))];
        let times = OccurrenceTimes {
            start: Some(at(-120)),
            end: Some(at(0)),
        };
        let now = at(-10);

        assert_eq!(
            due_triggers(&rules, &times, now, LiveStatus::Active).due.len(),
            1
        );
        assert!(due_triggers(&rules, &times, now, LiveStatus::Scheduled)
            .due
            .is_empty());
        assert!(due_triggers(&rules, &times, now, LiveStatus::Completed)
            .due
            .is_empty());
    }

    /// Tests that a rule whose needed timestamp is unresolved is reported
    /// indeterminate instead of firing or failing.
    #[test]
    fn unresolved_timestamp_is_indeterminate() {
        let rules = vec![
            rule(AnnouncementKind::Starting, Some(30)),
            rule(AnnouncementKind::Ending, Some(15)),
        ];
        let times = OccurrenceTimes::default();

        let scheduled = due_triggers(&rules, &times, at(0), LiveStatus::Scheduled);
        assert!(scheduled.due.is_empty());
        assert_eq!(scheduled.indeterminate.len(), 1);

        let active = due_triggers(&rules, &times, at(0), LiveStatus::Active);
        assert!(active.due.is_empty());
        assert_eq!(active.indeterminate.len(), 1);
    }

    /// Tests that gateway-driven kinds are never returned by the poll path.
    #[test]
    fn gateway_kinds_are_skipped() {
        let rules = vec![
            rule(AnnouncementKind::Started, None),
            rule(AnnouncementKind::Ended, None),
        ];
        let times = OccurrenceTimes {
            start: Some(at(0)),
            end: Some(at(60)),
        };

        let evaluation = due_triggers(&rules, &times, at(-5), LiveStatus::Scheduled);
        assert!(evaluation.due.is_empty());
        assert!(evaluation.indeterminate.is_empty());
    }

    /// Tests several rules evaluated together: one due, one outside its
    /// window, one indeterminate.
    #[test]
    fn evaluates_rules_independently() {
        let rules = vec![
            rule(AnnouncementKind::Starting, Some(30)),
            rule(AnnouncementKind::Starting, Some(10)),
            rule(AnnouncementKind::Ending, Some(15)),
        ];
        let times = OccurrenceTimes {
            start: Some(at(0)),
            end: None,
        };

        let evaluation = due_triggers(&rules, &times, at(-20), LiveStatus::Scheduled);
        assert_eq!(evaluation.due.len(), 1);
        assert_eq!(evaluation.due[0].time_before_minutes, Some(30));
        assert!(evaluation.indeterminate.is_empty());
    }
}
