//! Bot layer - Discord-specific interface and command handlers
//!
//! The bot is the admin surface of Waterline: it shows live levels and edits
//! the alert settings the background poller reads. It is optional and only
//! started when `DISCORD_BOT_TOKEN` is set.

/// Discord command implementations (general, levels, alert settings)
pub mod commands;
/// Discord interaction handlers (autocomplete, etc.)
pub mod handlers;
/// Discord alert sink
pub mod notify;

use crate::{config::SensorCatalog, core::telemetry::ThingSpeakClient, errors::Error};
use poise::serenity_prelude as serenity;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Shared data available to all bot commands.
pub struct BotData {
    /// Database connection holding the key-value store
    pub database: DatabaseConnection,
    /// Static sensor catalog from `config.toml`
    pub catalog: Arc<SensorCatalog>,
    /// Live reading client for `/levels`
    pub telemetry: ThingSpeakClient,
}

impl BotData {
    /// Creates a new `BotData` instance.
    #[must_use]
    pub const fn new(
        database: DatabaseConnection,
        catalog: Arc<SensorCatalog>,
        telemetry: ThingSpeakClient,
    ) -> Self {
        Self {
            database,
            catalog,
            telemetry,
        }
    }
}

pub use commands::*;
pub use handlers::*;

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start bot: {}", error);
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command `{}`: {}", ctx.command().name, error);
            if let Err(e) = ctx.say(format!("An error occurred: {error}")).await {
                error!("Failed to send error message: {}", e);
            }
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}

/// Connects to Discord and serves commands until the connection ends.
#[instrument(skip(token, data))]
pub async fn run_bot(token: String, data: BotData) -> Result<(), serenity::Error> {
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                commands::ping(),
                commands::help(),
                commands::pages(),
                commands::levels(),
                commands::threshold(),
                commands::repeat(),
                commands::language(),
            ],
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(|ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                Ok(data)
            })
        })
        .build();

    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::DIRECT_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT;

    info!("Starting Discord client");
    let mut client = serenity::ClientBuilder::new(&token, intents)
        .framework(framework)
        .await
        .inspect_err(|e| error!("Error creating client: {}", e))?;
    client
        .start()
        .await
        .inspect_err(|e| error!("Client error: {}", e))
}
