//! Discord alert delivery and the configured sink choice.

use crate::{
    core::alerts::{AlertSink, LogSink},
    core::thresholds::ThresholdAlert,
    errors::Result,
};
use poise::serenity_prelude as serenity;
use std::fmt;
use std::sync::Arc;
use tracing::{info, instrument};

/// Posts fired alerts to one Discord channel.
///
/// Uses the REST client only, so it works whether or not the bot's gateway
/// connection is running.
#[derive(Clone)]
pub struct DiscordSink {
    http: Arc<serenity::Http>,
    channel: serenity::ChannelId,
}

impl DiscordSink {
    /// Creates a sink posting to `channel_id`
    #[must_use]
    pub fn new(http: Arc<serenity::Http>, channel_id: u64) -> Self {
        Self {
            http,
            channel: serenity::ChannelId::new(channel_id),
        }
    }

    /// Builds a REST client from a bot token
    #[must_use]
    pub fn from_token(token: &str, channel_id: u64) -> Self {
        Self::new(Arc::new(serenity::Http::new(token)), channel_id)
    }
}

impl fmt::Debug for DiscordSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscordSink")
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}

/// Message body posted for an alert
#[must_use]
pub fn format_alert(alert: &ThresholdAlert) -> String {
    format!("**{}**\n{}", alert.title(), alert.message())
}

impl AlertSink for DiscordSink {
    #[instrument(skip(self, alert), fields(sensor = %alert.sensor_id))]
    async fn dispatch(&self, alert: &ThresholdAlert) -> Result<()> {
        self.channel.say(&self.http, format_alert(alert)).await?;
        info!("Posted {} alert to channel {}", alert.kind, self.channel);
        Ok(())
    }
}

/// Sink selected by `notifications.mode`
#[derive(Debug, Clone)]
pub enum ConfiguredSink {
    /// Log only
    Log(LogSink),
    /// Post to a Discord channel
    Discord(DiscordSink),
}

impl AlertSink for ConfiguredSink {
    async fn dispatch(&self, alert: &ThresholdAlert) -> Result<()> {
        match self {
            Self::Log(sink) => sink.dispatch(alert).await,
            Self::Discord(sink) => sink.dispatch(alert).await,
        }
    }
}
