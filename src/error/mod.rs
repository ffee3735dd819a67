//! Error types for the bot.
//!
//! This module provides the application's error hierarchy. The `AppError` enum
//! serves as the top-level error type that wraps domain-specific errors. Two
//! error kinds carry meaning for the sweeps: `Parse` marks persisted message
//! text that cannot be read back (skip that one event, log, continue) and
//! `Config` marks an invalid configuration (fatal for the operation, surfaced
//! to the initiating user when triggered interactively). Discord API errors
//! are treated as transient and retried on the next poll cycle.

pub mod config;
pub mod parse;

use thiserror::Error;

pub use crate::error::{config::ConfigError, parse::ParseError};

/// Top-level application error type.
///
/// Aggregates all error types that can occur in the application. Most variants
/// use `#[from]` for automatic conversion.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error during startup or from an invalid recurrence or
    /// announcement definition.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Malformed persisted text on a Discord message. Unrecoverable for the
    /// one event it belongs to; sweeps skip the event and continue.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Discord API error from Serenity.
    ///
    /// Boxed due to large size. Treated as transient: background sweeps log
    /// it and retry the affected item on the next cycle.
    #[error(transparent)]
    Discord(#[from] Box<serenity::Error>),

    /// Cron scheduler error while registering or starting background jobs.
    #[error(transparent)]
    Scheduler(#[from] tokio_cron_scheduler::JobSchedulerError),

    /// Filesystem error while reading the guild configuration document.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Malformed guild configuration document.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// A required Discord object (channel, thread, message) could not be
    /// resolved.
    #[error("{0}")]
    NotFound(String),
}

/// Manual conversion from serenity::Error to AppError.
///
/// Boxes the error to reduce the size of the AppError enum, as serenity::Error
/// is very large and would make all AppError variants larger if not boxed.
impl From<serenity::Error> for AppError {
    fn from(err: serenity::Error) -> Self {
        AppError::Discord(Box::new(err))
    }
}
