//! Sensor catalog - pages of water-level sensors and their telemetry channels.
//!
//! The catalog is loaded from `config.toml` at startup and published to the
//! key-value store as the `appConfig` JSON document. Both shapes use the same
//! types: TOML keys are `snake_case`, the persisted JSON uses the dashboard's
//! camelCase names (`channelID`, `apiKey`, ...), and either spelling is
//! accepted when reading.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

static NO_SENSORS: BTreeMap<String, SensorDescriptor> = BTreeMap::new();

/// Display limits for a sensor, in centimetres.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Limits {
    /// Level at which the dashboard shows a warning
    #[serde(default)]
    pub warning: f64,
    /// Level at which the dashboard shows danger
    #[serde(default)]
    pub danger: f64,
}

/// One telemetry-backed sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorDescriptor {
    /// Human readable name
    #[serde(default, alias = "display_name")]
    pub display_name: String,
    /// ThingSpeak channel id
    #[serde(rename = "channelID", alias = "channel_id")]
    pub channel_id: String,
    /// ThingSpeak read API key
    #[serde(alias = "api_key")]
    pub api_key: String,
    /// Feed field holding the level (e.g., `"field3"`)
    pub field: String,
    /// Whether readings are whole centimetres
    #[serde(default, alias = "is_integer")]
    pub is_integer: bool,
    /// Warning/danger display limits
    #[serde(default)]
    pub limits: Limits,
}

/// A dashboard page grouping sensors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// Short name used in navigation
    #[serde(default, alias = "display_name")]
    pub display_name: String,
    /// Page heading
    #[serde(default)]
    pub title: String,
    /// Emoji shown next to the page name
    #[serde(default)]
    pub icon: String,
    /// Sensors keyed by sensor id
    #[serde(default)]
    pub sensors: BTreeMap<String, SensorDescriptor>,
}

/// Page listing used by the hub view and the `/pages` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSummary {
    /// Page id
    pub id: String,
    /// Short name
    pub display_name: String,
    /// Emoji
    pub icon: String,
    /// Number of sensors on the page
    pub sensor_count: usize,
}

/// All pages, keyed by page id. Serializes as `{ "pages": { ... } }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorCatalog {
    /// Pages keyed by page id
    #[serde(default)]
    pub pages: BTreeMap<String, Page>,
}

impl SensorCatalog {
    /// Summaries of every page, in page id order.
    #[must_use]
    pub fn page_summaries(&self) -> Vec<PageSummary> {
        self.pages
            .iter()
            .map(|(id, page)| PageSummary {
                id: id.clone(),
                display_name: page.display_name.clone(),
                icon: page.icon.clone(),
                sensor_count: page.sensors.len(),
            })
            .collect()
    }

    /// Looks up a page by id.
    #[must_use]
    pub fn page(&self, page_id: &str) -> Option<&Page> {
        self.pages.get(page_id)
    }

    /// Sensors of a page; empty when the page does not exist.
    #[must_use]
    pub fn sensors_for_page(&self, page_id: &str) -> &BTreeMap<String, SensorDescriptor> {
        self.page(page_id).map_or(&NO_SENSORS, |page| &page.sensors)
    }

    /// Every sensor across all pages as `(sensor_id, descriptor)`.
    pub fn sensors(&self) -> impl Iterator<Item = (&str, &SensorDescriptor)> {
        self.pages
            .values()
            .flat_map(|page| page.sensors.iter().map(|(id, s)| (id.as_str(), s)))
    }

    /// Finds a sensor by id on any page.
    #[must_use]
    pub fn sensor(&self, sensor_id: &str) -> Option<&SensorDescriptor> {
        self.pages
            .values()
            .find_map(|page| page.sensors.get(sensor_id))
    }

    /// Like [`Self::sensor`] but unknown ids are an error.
    pub fn require_sensor(&self, sensor_id: &str) -> Result<&SensorDescriptor> {
        self.sensor(sensor_id).ok_or_else(|| Error::SensorNotFound {
            sensor_id: sensor_id.to_string(),
        })
    }

    /// Serializes into the persisted `appConfig` document.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Into::into)
    }

    /// Parses a persisted `appConfig` document.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config {
            message: format!("Malformed appConfig document: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    fn catalog() -> SensorCatalog {
        let toml_str = r#"
            [pages.reservoir]
            display_name = "Reservoir"
            title = "Reservoir Water Level Monitoring"
            icon = "💧"

            [pages.reservoir.sensors.Reservoir]
            display_name = "Reservoir"
            channel_id = "3132083"
            api_key = "READKEY"
            field = "field3"
            is_integer = true
            limits = { warning = 150, danger = 60 }

            [pages.overheadTank]
            display_name = "Overhead Tank"
            icon = "🏢"

            [pages.overheadTank.sensors.OverheadTank]
            display_name = "Overhead Tank"
            channel_id = "3132083"
            api_key = "READKEY"
            field = "field6"
            limits = { warning = 150.5, danger = 60 }
        "#;
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn test_parse_catalog_from_toml() {
        let catalog = catalog();
        assert_eq!(catalog.pages.len(), 2);
        let reservoir = catalog.sensor("Reservoir").unwrap();
        assert_eq!(reservoir.channel_id, "3132083");
        assert_eq!(reservoir.field, "field3");
        assert!(reservoir.is_integer);
        assert_eq!(reservoir.limits.warning, 150.0);
        assert_eq!(reservoir.limits.danger, 60.0);

        let tank = catalog.sensor("OverheadTank").unwrap();
        assert!(!tank.is_integer);
        assert_eq!(tank.limits.warning, 150.5);
    }

    #[test]
    fn test_json_uses_dashboard_field_names() {
        let json = catalog().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let sensor = &value["pages"]["reservoir"]["sensors"]["Reservoir"];
        assert_eq!(sensor["channelID"], "3132083");
        assert_eq!(sensor["apiKey"], "READKEY");
        assert_eq!(sensor["field"], "field3");
        assert_eq!(sensor["limits"]["danger"], 60.0);
    }

    #[test]
    fn test_json_round_trip_preserves_catalog() {
        let original = catalog();
        let parsed = SensorCatalog::from_json(&original.to_json().unwrap()).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_minimal_persisted_document_is_accepted() {
        let json = r#"{"pages":{"p":{"sensors":{
            "S1":{"channelID":"1","apiKey":"k","field":"field1"}
        }}}}"#;
        let catalog = SensorCatalog::from_json(json).unwrap();
        let sensor = catalog.sensor("S1").unwrap();
        assert_eq!(sensor.limits, Limits::default());
        assert!(sensor.display_name.is_empty());
    }

    #[test]
    fn test_malformed_document_is_config_error() {
        let result = SensorCatalog::from_json("{not json");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_page_helpers() {
        let catalog = catalog();
        let summaries = catalog.page_summaries();
        assert_eq!(summaries.len(), 2);
        let reservoir = summaries.iter().find(|s| s.id == "reservoir").unwrap();
        assert_eq!(reservoir.sensor_count, 1);
        assert_eq!(reservoir.icon, "💧");

        assert!(catalog.page("overheadTank").is_some());
        assert!(catalog.page("nowhere").is_none());
        assert_eq!(catalog.sensors_for_page("reservoir").len(), 1);
        assert!(catalog.sensors_for_page("nowhere").is_empty());
        assert_eq!(catalog.sensors().count(), 2);
    }

    #[test]
    fn test_require_sensor_rejects_unknown_id() {
        let catalog = catalog();
        assert!(catalog.require_sensor("Reservoir").is_ok());
        assert!(matches!(
            catalog.require_sensor("Main_Sump"),
            Err(Error::SensorNotFound { .. })
        ));
    }
}
