//! Ready event handler for bot initialization.
//!
//! Fired once per gateway connection after authentication. Used to log the
//! connection, set the bot's activity, and register the global slash
//! commands: `/{command}` to create an event and `/{command}-edit` to edit
//! the one owning the current discussion thread.

use serenity::all::{
    ActivityData, Command, CommandOptionType, Context, CreateCommand, CreateCommandOption, Ready,
};
use tracing::{error, info};

use crate::{config::GuildConfig, error::AppError, state::AppState};

pub async fn handle_ready(state: &AppState, ctx: Context, ready: Ready) {
    info!("{} is connected to Discord", ready.user.name);

    ctx.set_activity(Some(ActivityData::watching("for events")));

    if let Err(e) = register_commands(&ctx, &state.config.guild).await {
        error!("failed to register slash commands: {e}");
    }
}

async fn register_commands(ctx: &Context, config: &GuildConfig) -> Result<(), AppError> {
    let command = config.command_name.as_str();

    let mut type_option = CreateCommandOption::new(
        CommandOptionType::String,
        "type",
        "Which kind of event to create",
    )
    .required(true);
    for event_type in &config.event_types {
        type_option = type_option.add_string_choice(&event_type.name, &event_type.name);
    }

    let create = CreateCommand::new(command)
        .description("Create a new event")
        .add_option(type_option)
        .add_option(CreateCommandOption::new(
            CommandOptionType::String,
            "frequency",
            "How often the event repeats, e.g. \"every 2 weeks\"",
        ));

    let edit = CreateCommand::new(format!("{command}-edit"))
        .description("Edit the event belonging to this discussion thread");

    Command::create_global_command(&ctx.http, create).await?;
    Command::create_global_command(&ctx.http, edit).await?;

    info!("registered /{command} and /{command}-edit");
    Ok(())
}
