//! Alert settings - per-sensor thresholds and repeat flags.
//!
//! Persisted as the `globalAlertSettings` JSON document:
//! `{ "thresholds": { id: {min, max} }, "enabledRepeating": { id: bool } }`.

use crate::core::cooldown::CooldownWindow;
use crate::core::thresholds::ThresholdPair;
use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// User-editable alert configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertSettings {
    /// Bounds per sensor; sensors without an entry are never checked
    #[serde(default)]
    pub thresholds: BTreeMap<String, ThresholdPair>,
    /// Sensors that may re-alert after the repeat cooldown
    #[serde(default)]
    pub enabled_repeating: BTreeMap<String, bool>,
}

impl AlertSettings {
    /// Thresholds for a sensor, if any were configured
    #[must_use]
    pub fn thresholds_for(&self, sensor_id: &str) -> Option<&ThresholdPair> {
        self.thresholds.get(sensor_id)
    }

    /// Whether repeating alerts are on for a sensor
    #[must_use]
    pub fn is_repeating(&self, sensor_id: &str) -> bool {
        self.enabled_repeating
            .get(sensor_id)
            .copied()
            .unwrap_or(false)
    }

    /// Cooldown window that applies to a sensor
    #[must_use]
    pub fn cooldown_for(&self, sensor_id: &str) -> CooldownWindow {
        CooldownWindow::for_repeating(self.is_repeating(sensor_id))
    }

    /// Sets both bounds for a sensor, rejecting `min > max`.
    pub fn set_thresholds(&mut self, sensor_id: &str, pair: ThresholdPair) -> Result<()> {
        if let (Some(min), Some(max)) = (pair.min, pair.max) {
            if min > max {
                return Err(Error::InvalidThreshold {
                    sensor_id: sensor_id.to_string(),
                    min,
                    max,
                });
            }
        }
        self.thresholds.insert(sensor_id.to_string(), pair);
        Ok(())
    }

    /// Removes a sensor's bounds; returns whether any were set
    pub fn clear_thresholds(&mut self, sensor_id: &str) -> bool {
        self.thresholds.remove(sensor_id).is_some()
    }

    /// Turns repeating alerts on or off for a sensor
    pub fn set_repeating(&mut self, sensor_id: &str, enabled: bool) {
        self.enabled_repeating.insert(sensor_id.to_string(), enabled);
    }

    /// Serializes into the persisted document
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Into::into)
    }

    /// Parses the persisted document
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config {
            message: format!("Malformed globalAlertSettings document: {e}"),
        })
    }
}
