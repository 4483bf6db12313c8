#![allow(clippy::result_large_err)]

use dotenvy::dotenv;
use reqwest::Url;
use std::{env, sync::Arc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use waterline::{
    bot::{
        self, BotData,
        notify::{ConfiguredSink, DiscordSink},
    },
    config::{self, NotificationMode, database},
    core::{
        alerts::LogSink,
        cache::{AssetCache, InstallOutcome},
        fetch::HttpFetcher,
        poll::PollDriver,
        router::RequestRouter,
        state,
        telemetry::ThingSpeakClient,
    },
    errors::{Error, Result},
    gateway::{self, Gateway},
};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Load the application configuration
    let app_config = config::load_default_config()
        .inspect_err(|e| error!("Critical error loading application configuration: {}", e))?;
    info!(
        "Loaded configuration with {} page(s)",
        app_config.catalog.pages.len()
    );

    // 4. Initialize database
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Publish the sensor catalog for the poller
    state::publish_catalog(&db, &app_config.catalog)
        .await
        .inspect_err(|e| error!("Failed to publish sensor configuration: {}", e))?;

    // 6. Install the current cache bucket, then drop the old ones
    let fetcher = HttpFetcher::new(app_config.poller.fetch_timeout())?;
    let cache = AssetCache::new(db.clone(), app_config.cache.version.clone());
    let origin = Url::parse(&app_config.gateway.app_origin).map_err(|e| Error::InvalidUrl {
        url: app_config.gateway.app_origin.clone(),
        reason: e.to_string(),
    })?;
    let outcome = tokio::time::timeout(
        app_config.cache.install_timeout(),
        cache.initialize(&fetcher, &origin, &app_config.cache.manifest),
    )
    .await
    .map_err(|_| Error::Timeout {
        operation: "cache install".to_string(),
    })
    .and_then(|installed| installed)
    .inspect_err(|e| error!("Cache install failed: {}", e))?;
    if outcome == InstallOutcome::AlreadyComplete {
        info!("Serving the existing '{}' cache bucket", cache.version());
    }
    let purged = cache.purge_stale().await?;
    if !purged.is_empty() {
        info!("Purged {} stale cache bucket(s)", purged.len());
    }

    // 7. Background poller
    let telemetry = ThingSpeakClient::new(
        &app_config.poller.telemetry_base_url,
        app_config.poller.fetch_timeout(),
    )?;
    let sink = match app_config.notifications.mode {
        NotificationMode::Log => ConfiguredSink::Log(LogSink),
        NotificationMode::Discord => {
            let token = env::var("DISCORD_BOT_TOKEN")
                .inspect_err(|e| error!("Discord notifications need DISCORD_BOT_TOKEN: {}", e))?;
            let channel_id = app_config.notifications.discord_channel_id.ok_or_else(|| {
                Error::Config {
                    message: "notifications.discord_channel_id is not set".to_string(),
                }
            })?;
            ConfiguredSink::Discord(DiscordSink::from_token(&token, channel_id))
        }
    };
    let poller = PollDriver::new(
        db.clone(),
        telemetry.clone(),
        sink,
        app_config.poller.fetch_timeout(),
    );
    tokio::spawn(poller.run_forever(app_config.poller.interval()));
    info!(
        "Background water level check every {:?}",
        app_config.poller.interval()
    );

    // 8. Discord bot, when a token is available
    match env::var("DISCORD_BOT_TOKEN") {
        Ok(token) => {
            let data = BotData::new(db.clone(), Arc::new(app_config.catalog.clone()), telemetry);
            tokio::spawn(async move {
                if let Err(e) = bot::run_bot(token, data).await {
                    error!("Discord bot stopped: {}", e);
                }
            });
        }
        Err(_) => warn!("DISCORD_BOT_TOKEN not set; running without the Discord bot"),
    }

    // 9. Gateway
    let router = RequestRouter::new(cache, fetcher, app_config.cache.network_first_hosts.clone());
    let app = Gateway::new(router, &app_config.gateway.app_origin)?.into_app();
    let listener = tokio::net::TcpListener::bind(app_config.gateway.bind)
        .await
        .inspect_err(|e| error!("Failed to bind {}: {}", app_config.gateway.bind, e))?;
    gateway::serve(listener, app).await
}
