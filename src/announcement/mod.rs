//! Announcement decision logic.
//!
//! Two pure pieces sit under the announcement sweep: the trigger evaluator
//! (which configured rules are due for an event right now) and the
//! deduplicator (has this exact announcement already been posted to the
//! destination). Sending is the `service::announcement` layer's job.

pub mod dedup;
pub mod trigger;

pub use dedup::already_announced;
pub use trigger::{due_triggers, LiveStatus, OccurrenceTimes};
