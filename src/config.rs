//! Application configuration.
//!
//! Two layers: environment variables for secrets (`DISCORD_BOT_TOKEN`, loaded
//! through a `.env` file in development) and a JSON guild configuration
//! document describing the event types the bot offers, their announcement
//! rules, role restrictions, and the guild time zone. The document is read
//! once at startup and validated eagerly so a bad rule fails the process
//! instead of a background sweep.

use std::path::Path;

use chrono_tz::Tz;
use serde::Deserialize;

use crate::{
    error::{AppError, ConfigError},
    model::announcement::{AnnouncementKind, AnnouncementRule},
    model::event::EntityKind,
};

const DEFAULT_CONFIG_PATH: &str = "eventmonkey.json";
const DEFAULT_COMMAND_NAME: &str = "event";
const DEFAULT_EDITING_TIMEOUT_MINUTES: u64 = 30;
const DEFAULT_CLOSE_THREADS_AFTER_HOURS: u64 = 24;

pub struct Config {
    pub discord_bot_token: String,
    pub guild: GuildConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let discord_bot_token = std::env::var("DISCORD_BOT_TOKEN")
            .map_err(|_| ConfigError::MissingEnvVar("DISCORD_BOT_TOKEN".to_string()))?;
        let config_path = std::env::var("EVENTMONKEY_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let guild = GuildConfig::from_file(Path::new(&config_path))?;

        Ok(Self {
            discord_bot_token,
            guild,
        })
    }
}

/// One kind of event users can schedule.
///
/// Mirrors the event type definitions of the configuration document: the
/// discussion channel threads are created under, the entity kind of the
/// location, announcement rules, and an optional default image.
#[derive(Debug, Clone, Deserialize)]
pub struct EventType {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Channel name or id that hosts the discussion threads.
    pub discussion_channel: String,
    pub entity_kind: EntityKind,
    /// Voice or stage channel name for non-external event types.
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub announcements: Vec<AnnouncementRule>,
    #[serde(default)]
    pub default_image_url: Option<String>,
}

/// Role ids allowed or denied use of the event commands.
///
/// An empty allow list means everyone; a deny match always wins. Guild
/// administrators bypass both lists.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RoleFilter {
    pub allowed: Vec<u64>,
    pub denied: Vec<u64>,
}

/// The guild configuration document.
#[derive(Debug, Clone, Deserialize)]
pub struct GuildConfig {
    #[serde(default = "default_command_name")]
    pub command_name: String,
    pub event_types: Vec<EventType>,
    #[serde(default = "default_editing_timeout")]
    pub editing_timeout_minutes: u64,
    #[serde(default = "default_close_threads_after")]
    pub close_threads_after_hours: u64,
    #[serde(default)]
    pub roles: RoleFilter,
    /// IANA time zone name used for all user-facing time strings.
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
}

fn default_command_name() -> String {
    DEFAULT_COMMAND_NAME.to_string()
}

fn default_editing_timeout() -> u64 {
    DEFAULT_EDITING_TIMEOUT_MINUTES
}

fn default_close_threads_after() -> u64 {
    DEFAULT_CLOSE_THREADS_AFTER_HOURS
}

fn default_time_zone() -> String {
    "UTC".to_string()
}

impl GuildConfig {
    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path)?;
        let config: GuildConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the document beyond what deserialization checks.
    ///
    /// Every `starting`/`ending` rule needs a lead time, the time zone must
    /// exist, and at least one event type must be defined.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tz()?;

        if self.event_types.is_empty() {
            return Err(ConfigError::NoEventTypes);
        }

        for event_type in &self.event_types {
            for rule in &event_type.announcements {
                let needs_lead_time = matches!(
                    rule.kind,
                    AnnouncementKind::Starting | AnnouncementKind::Ending
                );
                if needs_lead_time && rule.time_before_minutes.is_none() {
                    return Err(ConfigError::MissingTimeBefore {
                        event_type: event_type.name.clone(),
                        kind: rule.kind.as_str().to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    /// The configured time zone.
    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.time_zone
            .parse::<Tz>()
            .map_err(|_| ConfigError::UnknownTimeZone(self.time_zone.clone()))
    }

    /// Looks up an event type by its configured name.
    pub fn event_type(&self, name: &str) -> Option<&EventType> {
        self.event_types.iter().find(|et| et.name == name)
    }

    pub fn editing_timeout(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.editing_timeout_minutes as i64)
    }

    pub fn close_threads_after(&self) -> chrono::Duration {
        chrono::Duration::hours(self.close_threads_after_hours as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_config(announcements: &str, time_zone: &str) -> String {
        format!(
            r#"{{
                "command_name": "meetup",
                "time_zone": "{time_zone}",
                "event_types": [
                    {{
                        "name": "Meetup",
                        "discussion_channel": "meetups",
                        "entity_kind": "external",
                        "announcements": {announcements}
                    }}
                ]
            }}"#
        )
    }

    /// Tests that a well-formed document deserializes and validates.
    #[test]
    fn accepts_valid_document() {
        let text = minimal_config(
            r#"[{"kind": "starting", "time_before_minutes": 30, "channels": ["announcements"]}]"#,
            "America/Los_Angeles",
        );
        let config: GuildConfig = serde_json::from_str(&text).unwrap();
        config.validate().unwrap();

        assert_eq!(config.command_name, "meetup");
        assert_eq!(config.editing_timeout_minutes, 30);
        let rule = &config.event_types[0].announcements[0];
        assert_eq!(rule.time_before(), Some(chrono::Duration::minutes(30)));
    }

    /// Tests that a starting rule without a lead time is rejected at load.
    ///
    /// Expected: Err(MissingTimeBefore)
    #[test]
    fn rejects_starting_rule_without_lead_time() {
        let text = minimal_config(r#"[{"kind": "starting"}]"#, "UTC");
        let config: GuildConfig = serde_json::from_str(&text).unwrap();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingTimeBefore { .. })
        ));
    }

    /// Tests that gateway-driven rules do not need a lead time.
    #[test]
    fn accepts_started_rule_without_lead_time() {
        let text = minimal_config(r#"[{"kind": "started"}, {"kind": "ended"}]"#, "UTC");
        let config: GuildConfig = serde_json::from_str(&text).unwrap();
        config.validate().unwrap();
    }

    /// Tests that an unknown time zone name is rejected.
    ///
    /// Expected: Err(UnknownTimeZone)
    #[test]
    fn rejects_unknown_time_zone() {
        let text = minimal_config("[]", "Mars/Olympus_Mons");
        let config: GuildConfig = serde_json::from_str(&text).unwrap();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownTimeZone(_))
        ));
    }

    /// Tests that a document without event types is rejected.
    ///
    /// Expected: Err(NoEventTypes)
    #[test]
    fn rejects_empty_event_types() {
        let config: GuildConfig =
            serde_json::from_str(r#"{"event_types": []}"#).unwrap();

        assert!(matches!(config.validate(), Err(ConfigError::NoEventTypes)));
    }
}
