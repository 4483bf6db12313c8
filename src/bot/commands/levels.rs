//! Monitoring commands - `pages` and `levels`.
//!
//! `levels` fetches a live reading per sensor and reports it next to the
//! display limits and the configured alert bounds.

use crate::{
    config::SensorDescriptor,
    core::{
        telemetry::Reading,
        thresholds::{self, ThresholdPair},
    },
};

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use super::format_level_line;
    use crate::{
        bot::{BotData, handlers::autocomplete},
        core::{state, telemetry::TelemetrySource},
        errors::{Error, Result},
    };
    use std::fmt::Write;
    use tracing::warn;

    /// Lists the monitoring pages.
    #[poise::command(slash_command, prefix_command)]
    pub async fn pages(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let data = ctx.data();
        let summaries = data.catalog.page_summaries();
        if summaries.is_empty() {
            ctx.say("📭 No monitoring pages are configured.").await?;
            return Ok(());
        }

        let translator = state::load_translator(&data.database).await?;
        let mut text = format!("**{}**\n", translator.get("select_tank_sump"));
        for page in summaries {
            writeln!(
                text,
                "{} **{}** (`{}`) - {} sensor(s)",
                page.icon, page.display_name, page.id, page.sensor_count
            )?;
        }
        ctx.say(text).await?;
        Ok(())
    }

    /// Shows the current water level of every sensor, or of one page.
    #[poise::command(slash_command, prefix_command)]
    pub async fn levels(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Only show this page"]
        #[autocomplete = "autocomplete::autocomplete_page_id"]
        page: Option<String>,
    ) -> Result<()> {
        ctx.defer().await?;
        let data = ctx.data();

        let sensors: Vec<_> = match page.as_deref() {
            Some(page_id) => {
                let sensors = data.catalog.sensors_for_page(page_id);
                if sensors.is_empty() {
                    ctx.say(format!("❌ No sensors on page '{page_id}'.")).await?;
                    return Ok(());
                }
                sensors.iter().map(|(id, s)| (id.as_str(), s)).collect()
            }
            None => data.catalog.sensors().collect(),
        };

        let settings = state::load_alert_settings(&data.database).await?;
        let translator = state::load_translator(&data.database).await?;
        let mut text = format!("**{}**\n", translator.get("water_level_monitoring"));
        for (sensor_id, sensor) in sensors {
            let reading = match data.telemetry.fetch_reading(sensor_id, sensor).await {
                Ok(reading) => reading,
                Err(e) => {
                    warn!("Failed to read {}: {}", sensor_id, e);
                    None
                }
            };
            let line = format_level_line(
                sensor_id,
                sensor,
                reading.as_ref(),
                settings.thresholds_for(sensor_id),
            );
            writeln!(text, "{line}")?;
        }
        ctx.say(text).await?;
        Ok(())
    }
}

pub use inner::*;

fn format_value(value: f64, is_integer: bool) -> String {
    if is_integer {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

/// One line of the `levels` reply.
#[must_use]
pub fn format_level_line(
    sensor_id: &str,
    sensor: &SensorDescriptor,
    reading: Option<&Reading>,
    thresholds: Option<&ThresholdPair>,
) -> String {
    let Some(reading) = reading else {
        return format!("⚪ **{}**: no reading available", sensor.display_name);
    };

    let value = format_value(reading.value, sensor.is_integer);
    let verdict = match thresholds {
        None => "no alert bounds".to_string(),
        Some(pair) => match thresholds::evaluate(sensor_id, reading.value, pair) {
            None => "✅ within bounds".to_string(),
            Some(alert) => format!("🚨 {}", alert.message()),
        },
    };
    format!(
        "💧 **{}**: {} cm (warning {} / danger {}) - {} - at {}",
        sensor.display_name,
        value,
        sensor.limits.warning,
        sensor.limits.danger,
        verdict,
        reading.taken_at.format("%Y-%m-%d %H:%M UTC")
    )
}
