//! Telemetry client - reads the latest water level from a ThingSpeak feed.

use crate::{
    config::SensorDescriptor,
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, instrument};

/// One water-level sample
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    /// Sensor the sample belongs to
    pub sensor_id: String,
    /// Level in centimetres
    pub value: f64,
    /// When the sample was taken
    pub taken_at: DateTime<Utc>,
}

/// Source of live readings.
pub trait TelemetrySource: Send + Sync {
    /// Latest reading for one sensor.
    ///
    /// `Ok(None)` means the feed answered but had no usable value; `Err` is a
    /// transport failure.
    fn fetch_reading(
        &self,
        sensor_id: &str,
        sensor: &SensorDescriptor,
    ) -> impl Future<Output = Result<Option<Reading>>> + Send;
}

/// ThingSpeak REST client
#[derive(Debug, Clone)]
pub struct ThingSpeakClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ThingSpeakClient {
    /// Creates a client for the API at `base_url` with a per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| Error::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("waterline/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { http, base_url })
    }

    /// Feed URL returning only the newest entry of a channel
    pub fn feed_url(&self, sensor: &SensorDescriptor) -> Result<Url> {
        let path = format!("channels/{}/feeds.json", sensor.channel_id);
        let mut url = self.base_url.join(&path).map_err(|e| Error::InvalidUrl {
            url: format!("{}{path}", self.base_url),
            reason: e.to_string(),
        })?;
        url.query_pairs_mut()
            .append_pair("api_key", &sensor.api_key)
            .append_pair("results", "1");
        Ok(url)
    }
}

impl TelemetrySource for ThingSpeakClient {
    #[instrument(skip(self, sensor))]
    async fn fetch_reading(
        &self,
        sensor_id: &str,
        sensor: &SensorDescriptor,
    ) -> Result<Option<Reading>> {
        let url = self.feed_url(sensor)?;
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            debug!("Feed for {} answered {}", sensor_id, response.status());
            return Ok(None);
        }
        let payload: Value = response.json().await?;
        let reading = parse_feed(sensor_id, &sensor.field, &payload, Utc::now());
        if reading.is_none() {
            debug!("No usable {} value for {}", sensor.field, sensor_id);
        }
        Ok(reading)
    }
}

/// Extracts a reading from a `feeds.json` payload.
///
/// `fallback_time` is used when the entry has no parseable `created_at`.
#[must_use]
pub fn parse_feed(
    sensor_id: &str,
    field: &str,
    payload: &Value,
    fallback_time: DateTime<Utc>,
) -> Option<Reading> {
    let entry = payload.get("feeds")?.as_array()?.first()?;
    let value = extract_value(entry, field)?;
    let taken_at = entry
        .get("created_at")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map_or(fallback_time, |t| t.with_timezone(&Utc));

    Some(Reading {
        sensor_id: sensor_id.to_string(),
        value,
        taken_at,
    })
}

/// Numeric value of `field` in a feed entry.
///
/// ThingSpeak sends field values as strings; plain numbers are accepted too.
/// Missing, null, blank and non-numeric values yield `None`.
#[must_use]
pub fn extract_value(entry: &Value, field: &str) -> Option<f64> {
    let value = match entry.get(field)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    value.is_finite().then_some(value)
}
