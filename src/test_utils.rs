//! Shared test utilities for Waterline.
//!
//! In-memory database setup, a sample sensor catalog and in-process fakes for
//! the network-facing traits.

use crate::{
    config::{Limits, Page, SensorCatalog, SensorDescriptor},
    core::{
        alerts::AlertSink,
        fetch::{AssetRequest, AssetResponse, Fetcher},
        telemetry::{Reading, TelemetrySource},
        thresholds::ThresholdAlert,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all database tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Initializes tracing output for tests; safe to call more than once.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

fn sensor(display_name: &str, field: &str, is_integer: bool) -> SensorDescriptor {
    SensorDescriptor {
        display_name: display_name.to_string(),
        channel_id: "3132083".to_string(),
        api_key: "READKEY".to_string(),
        field: field.to_string(),
        is_integer,
        limits: Limits {
            warning: 150.0,
            danger: 60.0,
        },
    }
}

/// Two pages with one sensor each: `Reservoir` and `OverheadTank`.
#[must_use]
pub fn sample_catalog() -> SensorCatalog {
    let mut pages = BTreeMap::new();
    pages.insert(
        "reservoir".to_string(),
        Page {
            display_name: "Reservoir".to_string(),
            title: "Reservoir Water Level Monitoring".to_string(),
            icon: "💧".to_string(),
            sensors: BTreeMap::from([(
                "Reservoir".to_string(),
                sensor("Reservoir", "field3", true),
            )]),
        },
    );
    pages.insert(
        "overheadTank".to_string(),
        Page {
            display_name: "Overhead Tank".to_string(),
            title: "Overhead Tank Water Level Monitoring".to_string(),
            icon: "🏢".to_string(),
            sensors: BTreeMap::from([(
                "OverheadTank".to_string(),
                sensor("Overhead Tank", "field6", false),
            )]),
        },
    );
    SensorCatalog { pages }
}

/// [`Fetcher`] answering from a fixed URL → response table.
///
/// Unregistered URLs fail as if the network were down.
#[derive(Debug, Default)]
pub struct FakeFetcher {
    responses: HashMap<String, AssetResponse>,
    calls: AtomicUsize,
}

impl FakeFetcher {
    /// Empty table: every fetch fails
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a response for `url`
    #[must_use]
    pub fn respond(mut self, url: &str, response: AssetResponse) -> Self {
        self.responses.insert(url.to_string(), response);
        self
    }

    /// Number of fetches performed so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Fetcher for FakeFetcher {
    async fn fetch(&self, request: &AssetRequest) -> Result<AssetResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .get(request.url.as_str())
            .cloned()
            .ok_or_else(|| Error::NetworkUnavailable {
                url: request.url.to_string(),
            })
    }
}

/// [`TelemetrySource`] with settable values per sensor.
///
/// Sensors without a value fail their fetch.
#[derive(Debug, Clone, Default)]
pub struct FakeTelemetry {
    values: Arc<Mutex<HashMap<String, f64>>>,
    delay: Option<Duration>,
}

impl FakeTelemetry {
    /// Sets an initial value
    #[must_use]
    pub fn with_value(self, sensor_id: &str, value: f64) -> Self {
        self.set_value(sensor_id, value);
        self
    }

    /// Delays every fetch by `delay`
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Changes the value returned for a sensor
    pub fn set_value(&self, sensor_id: &str, value: f64) {
        if let Ok(mut values) = self.values.lock() {
            values.insert(sensor_id.to_string(), value);
        }
    }
}

impl TelemetrySource for FakeTelemetry {
    async fn fetch_reading(
        &self,
        sensor_id: &str,
        _sensor: &SensorDescriptor,
    ) -> Result<Option<Reading>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let value = self
            .values
            .lock()
            .ok()
            .and_then(|values| values.get(sensor_id).copied());
        value
            .map(|value| {
                Some(Reading {
                    sensor_id: sensor_id.to_string(),
                    value,
                    taken_at: Utc::now(),
                })
            })
            .ok_or_else(|| Error::NetworkUnavailable {
                url: format!("fake://{sensor_id}"),
            })
    }
}

/// [`AlertSink`] that remembers what it was given
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    alerts: Arc<Mutex<Vec<ThresholdAlert>>>,
    fail: bool,
}

impl RecordingSink {
    /// A sink that records and then reports a delivery failure
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Alerts received so far
    pub fn alerts(&self) -> Vec<ThresholdAlert> {
        self.alerts.lock().map(|a| a.clone()).unwrap_or_default()
    }
}

impl AlertSink for RecordingSink {
    async fn dispatch(&self, alert: &ThresholdAlert) -> Result<()> {
        if let Ok(mut alerts) = self.alerts.lock() {
            alerts.push(alert.clone());
        }
        if self.fail {
            return Err(Error::Timeout {
                operation: "alert delivery".to_string(),
            });
        }
        Ok(())
    }
}
