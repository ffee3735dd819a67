//! Data access over Discord itself.
//!
//! There is no database: the pinned details embed on each discussion thread
//! is the durable record, and the thread name carries the current start time.
//! The repositories here read and write that record through the Discord HTTP
//! API, keeping the `format` wire logic and the `service` orchestration
//! apart.

pub mod discord;
pub mod event;

pub use discord::GuildDirectory;
pub use event::{EventRepository, ThreadRef};
