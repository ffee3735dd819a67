mod announcement;
mod bot;
mod cache;
mod config;
mod data;
mod error;
mod format;
mod model;
mod recurrence;
mod scheduler;
mod service;
mod state;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::{config::Config, error::AppError, state::AppState};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let state = Arc::new(AppState::new(config));

    let mut client = bot::start::build_client(state.clone()).await?;
    let discord_http = client.http.clone();

    // Background sweeps (announcements, recurrence restarts, thread closure,
    // construction cache maintenance) run independently of the gateway task.
    let scheduler_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = scheduler::start_scheduler(scheduler_state, discord_http).await {
            tracing::error!("Background sweep scheduler error: {}", e);
        }
    });

    tracing::info!("Starting EventMonkey");

    // Blocks until the gateway connection shuts down.
    client.start().await.map_err(AppError::from)?;

    Ok(())
}
