use thiserror::Error;

/// Invalid configuration, either in the environment, the guild configuration
/// document, or a persisted recurrence whose step cannot produce a future
/// occurrence.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Required environment variable is not set.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// A recurrence step amount of zero can never advance past "now".
    #[error("Recurrence step amount must be greater than zero")]
    InvalidRecurrenceStep,

    /// The catch-up loop for a stale recurrence exceeded its iteration cap.
    ///
    /// Happens when the process was offline for so long that advancing the
    /// occurrence counter one step at a time would take more than
    /// `max_steps` iterations.
    #[error("Recurrence catch-up exceeded {max_steps} steps for event starting {first_start}")]
    CatchUpExceeded {
        /// The iteration cap that was hit
        max_steps: u32,
        /// First start time of the recurrence being advanced
        first_start: chrono::DateTime<chrono::Utc>,
    },

    /// A `starting` or `ending` announcement rule without a lead time.
    #[error("Announcement rule '{kind}' for event type '{event_type}' requires time_before_minutes")]
    MissingTimeBefore {
        /// Name of the event type carrying the rule
        event_type: String,
        /// The rule kind that requires a lead time
        kind: String,
    },

    /// Time zone name not present in the IANA database.
    #[error("Unrecognized time zone: {0}")]
    UnknownTimeZone(String),

    /// Guild configuration with no event types defined.
    #[error("Configuration must define at least one event type")]
    NoEventTypes,
}
