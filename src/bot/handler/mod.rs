use std::sync::Arc;

use serenity::all::{Context, EventHandler, Interaction, Ready, ScheduledEvent};
use serenity::async_trait;

use crate::state::AppState;

pub mod interaction;
pub mod ready;
pub mod scheduled_event;

/// Discord bot event handler
pub struct Handler {
    pub state: Arc<AppState>,
}

impl Handler {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl EventHandler for Handler {
    /// Called when the bot is ready and connected to Discord
    async fn ready(&self, ctx: Context, ready: Ready) {
        ready::handle_ready(&self.state, ctx, ready).await;
    }

    /// Called for slash commands, modal submissions, and button presses
    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        interaction::handle_interaction(&self.state, ctx, interaction).await;
    }

    /// Called when a scheduled event changes, including status transitions
    async fn guild_scheduled_event_update(&self, ctx: Context, event: ScheduledEvent) {
        scheduled_event::handle_update(&self.state, ctx, event).await;
    }

    /// Called when a scheduled event is deleted outright
    async fn guild_scheduled_event_delete(&self, ctx: Context, event: ScheduledEvent) {
        scheduled_event::handle_delete(&self.state, ctx, event).await;
    }
}
