//! Domain models.
//!
//! These types are the in-memory shape of an event. Nothing here talks to
//! Discord: the only durable store is the text persisted by the `format`
//! module, and every model is re-derived from that text on demand.

pub mod announcement;
pub mod event;
pub mod recurrence;
