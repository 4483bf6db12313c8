//! Alert settings commands - `threshold` and `repeat`.
//!
//! These edit the persisted `globalAlertSettings` document that the
//! background poller reads on every cycle.

use crate::{config::SensorCatalog, core::settings::AlertSettings, errors::Result};

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use super::clear_bounds;
    use crate::{
        bot::{BotData, handlers::autocomplete},
        core::{state, thresholds::ThresholdPair},
        errors::{Error, Result},
    };
    use std::fmt::Write;

    fn describe_bound(bound: Option<f64>) -> String {
        bound.map_or_else(|| "-".to_string(), |v| format!("{v} cm"))
    }

    /// Manages per-sensor alert bounds.
    #[poise::command(
        slash_command,
        prefix_command,
        subcommands("threshold_set", "threshold_clear", "threshold_show")
    )]
    pub async fn threshold(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Threshold management command. Available subcommands:\n\
            `/threshold set` - Set min and/or max for a sensor\n\
            `/threshold clear` - Remove a sensor's bounds\n\
            `/threshold show` - List all bounds";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Sets the alert bounds of a sensor.
    ///
    /// A level below `min` raises a LOW alert, a level above `max` a HIGH alert.
    #[poise::command(slash_command, prefix_command, rename = "set")]
    pub async fn threshold_set(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Sensor to configure"]
        #[autocomplete = "autocomplete::autocomplete_sensor_id"]
        sensor: String,
        #[description = "Alert below this level (cm)"] min: Option<f64>,
        #[description = "Alert above this level (cm)"] max: Option<f64>,
    ) -> Result<()> {
        let data = ctx.data();
        if let Err(e) = data.catalog.require_sensor(&sensor) {
            ctx.say(format!("❌ {e}")).await?;
            return Ok(());
        }
        if min.is_none() && max.is_none() {
            ctx.say("❌ Give a min, a max, or both. Use `/threshold clear` to remove bounds.")
                .await?;
            return Ok(());
        }
        if [min, max].iter().flatten().any(|v| !v.is_finite()) {
            ctx.say("❌ Invalid bound: must be a valid number").await?;
            return Ok(());
        }

        let mut settings = state::load_alert_settings(&data.database).await?;
        match settings.set_thresholds(&sensor, ThresholdPair::new(min, max)) {
            Ok(()) => {}
            Err(e @ Error::InvalidThreshold { .. }) => {
                ctx.say(format!("❌ {e}")).await?;
                return Ok(());
            }
            Err(e) => return Err(e),
        }
        state::save_alert_settings(&data.database, &settings).await?;

        ctx.say(format!(
            "✅ Bounds for **{sensor}**: min {}, max {}",
            describe_bound(min),
            describe_bound(max)
        ))
        .await?;
        Ok(())
    }

    /// Removes the alert bounds of a sensor.
    #[poise::command(slash_command, prefix_command, rename = "clear")]
    pub async fn threshold_clear(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Sensor to clear"]
        #[autocomplete = "autocomplete::autocomplete_sensor_id"]
        sensor: String,
    ) -> Result<()> {
        let data = ctx.data();
        let mut settings = state::load_alert_settings(&data.database).await?;
        match clear_bounds(&data.catalog, &mut settings, &sensor) {
            Ok(true) => {
                state::save_alert_settings(&data.database, &settings).await?;
                ctx.say(format!("✅ Cleared bounds for **{sensor}**.")).await?;
            }
            Ok(false) => {
                ctx.say(format!("ℹ️ **{sensor}** has no bounds configured.")).await?;
            }
            Err(e @ Error::SensorNotFound { .. }) => {
                ctx.say(format!("❌ {e}")).await?;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    /// Lists all configured alert bounds.
    #[poise::command(slash_command, prefix_command, rename = "show")]
    pub async fn threshold_show(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let settings = state::load_alert_settings(&ctx.data().database).await?;
        if settings.thresholds.is_empty() {
            ctx.say("📭 No alert bounds are configured.").await?;
            return Ok(());
        }

        let mut text = String::from("**Alert bounds**\n");
        for (sensor_id, pair) in &settings.thresholds {
            let repeat = if settings.is_repeating(sensor_id) {
                " (repeating)"
            } else {
                ""
            };
            writeln!(
                text,
                "• **{sensor_id}**: min {}, max {}{repeat}",
                describe_bound(pair.min),
                describe_bound(pair.max)
            )?;
        }
        ctx.say(text).await?;
        Ok(())
    }

    /// Turns repeating alerts on or off for a sensor.
    ///
    /// With repeating on, a breach that persists alerts again every 5 minutes;
    /// otherwise a sensor alerts once.
    #[poise::command(slash_command, prefix_command)]
    pub async fn repeat(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Sensor to configure"]
        #[autocomplete = "autocomplete::autocomplete_sensor_id"]
        sensor: String,
        #[description = "Repeat alerts while the breach lasts"] enabled: bool,
    ) -> Result<()> {
        let data = ctx.data();
        if let Err(e) = data.catalog.require_sensor(&sensor) {
            ctx.say(format!("❌ {e}")).await?;
            return Ok(());
        }

        let mut settings = state::load_alert_settings(&data.database).await?;
        settings.set_repeating(&sensor, enabled);
        state::save_alert_settings(&data.database, &settings).await?;

        let status = if enabled { "on" } else { "off" };
        ctx.say(format!("✅ Repeating alerts for **{sensor}** are now {status}."))
            .await?;
        Ok(())
    }
}

pub use inner::*;

/// Removes the bounds of a configured sensor.
///
/// Returns whether anything was removed; unknown sensors are an error.
pub fn clear_bounds(
    catalog: &SensorCatalog,
    settings: &mut AlertSettings,
    sensor_id: &str,
) -> Result<bool> {
    catalog.require_sensor(sensor_id)?;
    Ok(settings.clear_thresholds(sensor_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::thresholds::ThresholdPair;
    use crate::errors::Error;
    use crate::test_utils::sample_catalog;

    #[test]
    fn test_clear_bounds_of_configured_sensor() -> Result<()> {
        let catalog = sample_catalog();
        let mut settings = AlertSettings::default();
        settings.set_thresholds("Reservoir", ThresholdPair::new(None, Some(60.0)))?;

        assert!(clear_bounds(&catalog, &mut settings, "Reservoir")?);
        assert!(settings.thresholds_for("Reservoir").is_none());
        assert!(!clear_bounds(&catalog, &mut settings, "Reservoir")?);
        Ok(())
    }

    #[test]
    fn test_clear_bounds_rejects_unknown_sensor() -> Result<()> {
        let catalog = sample_catalog();
        let mut settings = AlertSettings::default();
        settings.set_thresholds("Ghost", ThresholdPair::new(Some(1.0), None))?;

        let result = clear_bounds(&catalog, &mut settings, "Ghost");

        assert!(matches!(
            result,
            Err(Error::SensorNotFound { ref sensor_id }) if sensor_id == "Ghost"
        ));
        assert!(settings.thresholds_for("Ghost").is_some());
        Ok(())
    }
}
