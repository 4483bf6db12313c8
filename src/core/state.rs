//! Key-value state - the persisted store shared by the poller and the bot.
//!
//! Three kinds of keys live here:
//! - [`APP_CONFIG_KEY`]: the published sensor catalog
//! - [`ALERT_SETTINGS_KEY`]: thresholds and repeat flags
//! - `lastAlert_{sensorId}`: epoch millis of the last fired alert
//! - [`PREFERRED_LANGUAGE_KEY`]: language used for bot replies
//!
//! Reads of absent keys return `None`; only real database failures are errors.

use crate::{
    config::SensorCatalog,
    core::{
        i18n::{self, Translator},
        settings::AlertSettings,
    },
    entities::{SystemState, system_state},
    errors::Result,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use std::collections::BTreeMap;
use tracing::{debug, instrument, warn};

/// Key holding the published sensor catalog
pub const APP_CONFIG_KEY: &str = "appConfig";

/// Key holding the alert settings document
pub const ALERT_SETTINGS_KEY: &str = "globalAlertSettings";

/// Key holding the preferred reply language
pub const PREFERRED_LANGUAGE_KEY: &str = "preferredLanguage";

/// Key holding a sensor's last alert timestamp
#[must_use]
pub fn last_alert_key(sensor_id: &str) -> String {
    format!("lastAlert_{sensor_id}")
}

/// Retrieves a value from the key-value `system_state` table.
///
/// Returns `Ok(None)` if the key does not exist.
#[instrument(skip(db))]
pub async fn get_value(db: &DatabaseConnection, key: &str) -> Result<Option<String>> {
    let row = SystemState::find()
        .filter(system_state::Column::Key.eq(key))
        .one(db)
        .await?;
    debug!("System state for key '{}': {:?}", key, row.as_ref().map(|r| &r.value));
    Ok(row.map(|r| r.value))
}

/// Sets or updates a value in the key-value `system_state` table (upsert).
#[instrument(skip(db, value))]
pub async fn set_value(db: &DatabaseConnection, key: &str, value: &str) -> Result<()> {
    let now = Utc::now().naive_utc();
    let existing = SystemState::find()
        .filter(system_state::Column::Key.eq(key))
        .one(db)
        .await?;

    if let Some(row) = existing {
        let mut active: system_state::ActiveModel = row.into();
        active.value = Set(value.to_string());
        active.updated_at = Set(now);
        active.update(db).await?;
    } else {
        system_state::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value.to_string()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    debug!("Set system state: {}", key);
    Ok(())
}

/// Writes the sensor catalog to [`APP_CONFIG_KEY`].
pub async fn publish_catalog(db: &DatabaseConnection, catalog: &SensorCatalog) -> Result<()> {
    set_value(db, APP_CONFIG_KEY, &catalog.to_json()?).await
}

/// Reads the published sensor catalog; `None` before anything was published.
pub async fn load_catalog(db: &DatabaseConnection) -> Result<Option<SensorCatalog>> {
    get_value(db, APP_CONFIG_KEY)
        .await?
        .map(|json| SensorCatalog::from_json(&json))
        .transpose()
}

/// Reads the alert settings; an absent document means empty settings.
pub async fn load_alert_settings(db: &DatabaseConnection) -> Result<AlertSettings> {
    match get_value(db, ALERT_SETTINGS_KEY).await? {
        Some(json) => AlertSettings::from_json(&json),
        None => Ok(AlertSettings::default()),
    }
}

/// Writes the alert settings document.
pub async fn save_alert_settings(
    db: &DatabaseConnection,
    settings: &AlertSettings,
) -> Result<()> {
    set_value(db, ALERT_SETTINGS_KEY, &settings.to_json()?).await
}

/// Translator for the stored language; English when none is stored.
pub async fn load_translator(db: &DatabaseConnection) -> Result<Translator> {
    let stored = get_value(db, PREFERRED_LANGUAGE_KEY).await?;
    Ok(Translator::for_language(
        stored.as_deref().unwrap_or(i18n::DEFAULT_LANGUAGE),
    ))
}

/// Stores the preferred language; unsupported codes are rejected.
pub async fn save_preferred_language(db: &DatabaseConnection, lang: &str) -> Result<()> {
    i18n::validate_language(lang)?;
    set_value(db, PREFERRED_LANGUAGE_KEY, lang).await
}

/// Reads the last alert timestamps of the given sensors.
///
/// Sensors that never alerted are left out. A stored value that is not an
/// integer is treated the same way and logged.
pub async fn load_last_alerts(
    db: &DatabaseConnection,
    sensor_ids: &[&str],
) -> Result<BTreeMap<String, i64>> {
    let mut last_alerts = BTreeMap::new();
    for &sensor_id in sensor_ids {
        let Some(raw) = get_value(db, &last_alert_key(sensor_id)).await? else {
            continue;
        };
        match raw.trim().parse::<i64>() {
            Ok(ms) => {
                last_alerts.insert(sensor_id.to_string(), ms);
            }
            Err(e) => warn!(
                "Ignoring unreadable last alert timestamp {:?} for {}: {}",
                raw, sensor_id, e
            ),
        }
    }
    Ok(last_alerts)
}

/// Writes last alert timestamps as decimal epoch millis.
pub async fn save_last_alerts(
    db: &DatabaseConnection,
    timestamps: &BTreeMap<String, i64>,
) -> Result<()> {
    for (sensor_id, ms) in timestamps {
        set_value(db, &last_alert_key(sensor_id), &ms.to_string()).await?;
    }
    Ok(())
}
