use std::sync::Arc;

use serenity::all::{Client, GatewayIntents};
use tracing::info;

use crate::{bot::handler::Handler, error::AppError, state::AppState};

/// Builds the Discord client with the gateway intents the bot needs.
///
/// The caller starts the client; `client.http` can be cloned off first for
/// the background jobs, which talk to Discord without a gateway connection.
pub async fn build_client(state: Arc<AppState>) -> Result<Client, AppError> {
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::GUILD_SCHEDULED_EVENTS;

    let client = Client::builder(&state.config.discord_bot_token, intents)
        .event_handler(Handler::new(state))
        .await?;

    info!("Discord client built");
    Ok(client)
}
