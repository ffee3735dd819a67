//! Business logic over the repositories and the Discord API.
//!
//! Each service owns one concern: `event` publishes and updates events,
//! `announcement` decides and sends announcements, `recurrence` restarts
//! completed recurring events, and `thread` retires discussion threads whose
//! event is over. The background sweeps all follow the same shape: iterate
//! guilds, iterate items, catch and log per item so one failure never aborts
//! the rest.

pub mod announcement;
pub mod event;
pub mod recurrence;
pub mod thread;

pub use announcement::AnnouncementService;
pub use event::EventService;
pub use recurrence::RecurrenceService;
pub use thread::ThreadService;
