//! The wire format.
//!
//! Everything durable about an event is encoded as text on Discord objects: a
//! pinned "Event Details" embed on the discussion thread, the thread's own
//! name, and a short frequency phrase. This module is the typed boundary
//! between that text and the domain models: building the text from a model
//! and parsing it back with explicit [`ParseError`](crate::error::ParseError)
//! failure modes.
//!
//! Treat every string produced here as a binary-compatible format: a wording
//! or pluralization change silently breaks every previously created event.

pub mod embed;
pub mod recurrence;
pub mod thread_name;
pub mod time;
