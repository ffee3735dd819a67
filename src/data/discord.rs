//! Guild channel lookups.

use std::collections::HashMap;

use serenity::all::{ChannelId, ChannelType, GetMessages, GuildChannel, GuildId, Http, Message};

use crate::error::AppError;

/// How many recent messages one deduplication fetch covers.
pub const MESSAGE_WINDOW: u8 = 100;

/// A guild's channel list, fetched once per sweep and queried by name or id.
pub struct GuildDirectory {
    channels: HashMap<ChannelId, GuildChannel>,
}

impl GuildDirectory {
    pub async fn load(http: &Http, guild_id: GuildId) -> Result<Self, AppError> {
        Ok(Self {
            channels: guild_id.channels(http).await?,
        })
    }

    /// Resolves a configured channel reference. References may be a channel
    /// name or a raw channel id; names win ties with numeric-looking names.
    pub fn resolve(&self, reference: &str) -> Option<ChannelId> {
        if let Some(channel) = self
            .channels
            .values()
            .find(|channel| channel.name == reference)
        {
            return Some(channel.id);
        }

        reference
            .parse::<u64>()
            .ok()
            .filter(|id| *id != 0)
            .map(ChannelId::new)
            .filter(|id| self.channels.contains_key(id))
    }

    /// Resolves a configured voice or stage channel reference, checking the
    /// channel actually has that kind.
    pub fn resolve_of_kind(&self, reference: &str, kind: ChannelType) -> Option<ChannelId> {
        self.resolve(reference)
            .filter(|id| self.channels.get(id).is_some_and(|c| c.kind == kind))
    }

    pub fn name_of(&self, id: ChannelId) -> Option<&str> {
        self.channels.get(&id).map(|channel| channel.name.as_str())
    }
}

/// Fetches the recent message window used for announcement deduplication.
pub async fn recent_messages(http: &Http, channel: ChannelId) -> Result<Vec<Message>, AppError> {
    channel
        .messages(http, GetMessages::new().limit(MESSAGE_WINDOW))
        .await
        .map_err(AppError::from)
}
