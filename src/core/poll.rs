//! Background poll driver - the periodic threshold check.
//!
//! A cycle reads the published catalog and the alert settings, fetches one
//! reading per watched sensor, runs [`evaluate_cycle`] and then performs the
//! side effects it asks for: dispatching alerts and persisting the new
//! last-alert timestamps. [`evaluate_cycle`] itself does no I/O.

use crate::{
    config::{SensorCatalog, SensorDescriptor},
    core::{
        alerts::AlertSink,
        cooldown::{self, GateDecision},
        settings::AlertSettings,
        state,
        telemetry::{Reading, TelemetrySource},
        thresholds::{self, ThresholdAlert},
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// What a cycle decided
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleOutcome {
    /// Alerts that passed the cooldown gate, in sensor order
    pub alerts: Vec<ThresholdAlert>,
    /// New last-alert timestamps to persist (only sensors that fired)
    pub updated_timestamps: BTreeMap<String, i64>,
}

/// Summary of one [`PollDriver::run_cycle`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Sensors with thresholds configured
    pub sensors_watched: usize,
    /// Readings obtained
    pub readings: usize,
    /// Alerts that fired
    pub alerts_fired: usize,
    /// Alerts the sink failed to deliver
    pub dispatch_failures: usize,
}

/// Evaluates one cycle's readings against the settings and cooldown state.
///
/// Readings for sensors outside `catalog` or without thresholds are ignored.
/// `last_alerts` holds the stored timestamps; sensors missing from it have
/// never alerted.
#[must_use]
pub fn evaluate_cycle(
    catalog: &SensorCatalog,
    settings: &AlertSettings,
    last_alerts: &BTreeMap<String, i64>,
    now_ms: i64,
    readings: &[Reading],
) -> CycleOutcome {
    let mut outcome = CycleOutcome::default();

    for reading in readings {
        let sensor_id = reading.sensor_id.as_str();
        if catalog.sensor(sensor_id).is_none() {
            continue;
        }
        let Some(pair) = settings.thresholds_for(sensor_id) else {
            continue;
        };
        let Some(alert) = thresholds::evaluate(sensor_id, reading.value, pair) else {
            continue;
        };

        let last = outcome
            .updated_timestamps
            .get(sensor_id)
            .or_else(|| last_alerts.get(sensor_id))
            .copied();
        match cooldown::decide(true, last, now_ms, settings.cooldown_for(sensor_id)) {
            GateDecision::Fire { timestamp } => {
                outcome
                    .updated_timestamps
                    .insert(sensor_id.to_string(), timestamp);
                outcome.alerts.push(alert);
            }
            GateDecision::Suppress => {
                debug!("Suppressing {} alert for {} (cooldown)", alert.kind, sensor_id);
            }
        }
    }
    outcome
}

/// Runs threshold cycles against the key-value store.
#[derive(Debug)]
pub struct PollDriver<T, S> {
    db: DatabaseConnection,
    telemetry: T,
    sink: S,
    fetch_timeout: Duration,
}

impl<T: TelemetrySource, S: AlertSink> PollDriver<T, S> {
    /// Creates a driver; each sensor fetch is bounded by `fetch_timeout`
    #[must_use]
    pub const fn new(
        db: DatabaseConnection,
        telemetry: T,
        sink: S,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            db,
            telemetry,
            sink,
            fetch_timeout,
        }
    }

    /// Runs one cycle at `now`.
    ///
    /// Returns `Ok(None)` when no catalog has been published yet.
    #[instrument(skip(self))]
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> Result<Option<CycleReport>> {
        let Some(catalog) = state::load_catalog(&self.db).await? else {
            info!("No sensor configuration published, skipping check");
            return Ok(None);
        };
        let settings = state::load_alert_settings(&self.db).await?;

        let targets: Vec<(&str, &SensorDescriptor)> = catalog
            .sensors()
            .filter(|(id, _)| settings.thresholds_for(id).is_some())
            .collect();
        let watched: Vec<&str> = targets.iter().map(|&(id, _)| id).collect();

        let mut readings = Vec::with_capacity(targets.len());
        for &(sensor_id, sensor) in &targets {
            let fetch = self.telemetry.fetch_reading(sensor_id, sensor);
            match tokio::time::timeout(self.fetch_timeout, fetch).await {
                Ok(Ok(Some(reading))) => readings.push(reading),
                Ok(Ok(None)) => debug!("No reading for {}", sensor_id),
                Ok(Err(e)) => warn!("Error checking sensor {}: {}", sensor_id, e),
                Err(_) => warn!(
                    "Error checking sensor {}: {}",
                    sensor_id,
                    Error::Timeout {
                        operation: format!("telemetry fetch after {:?}", self.fetch_timeout),
                    }
                ),
            }
        }

        let last_alerts = state::load_last_alerts(&self.db, &watched).await?;
        let outcome = evaluate_cycle(
            &catalog,
            &settings,
            &last_alerts,
            now.timestamp_millis(),
            &readings,
        );

        let mut dispatch_failures = 0;
        for alert in &outcome.alerts {
            if let Err(e) = self.sink.dispatch(alert).await {
                dispatch_failures += 1;
                warn!("Failed to deliver alert for {}: {}", alert.sensor_id, e);
            }
        }
        state::save_last_alerts(&self.db, &outcome.updated_timestamps).await?;

        let report = CycleReport {
            sensors_watched: watched.len(),
            readings: readings.len(),
            alerts_fired: outcome.alerts.len(),
            dispatch_failures,
        };
        info!(
            "Water level check done: {} watched, {} readings, {} alerts",
            report.sensors_watched, report.readings, report.alerts_fired
        );
        Ok(Some(report))
    }

    /// Runs a cycle every `interval`, forever. Failed cycles are logged.
    pub async fn run_forever(self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = self.run_cycle(Utc::now()).await {
                error!("Background water level check failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::cooldown::REPEAT_COOLDOWN_MS;
    use crate::core::thresholds::{AlertKind, ThresholdPair};
    use crate::test_utils::{
        FakeTelemetry, RecordingSink, init_test_tracing, sample_catalog, setup_test_db,
    };
    use chrono::TimeZone;

    const T0: i64 = 1_700_000_000_000;

    fn reading(sensor_id: &str, value: f64) -> Reading {
        Reading {
            sensor_id: sensor_id.to_string(),
            value,
            taken_at: Utc::now(),
        }
    }

    fn reservoir_max_60(repeating: bool) -> AlertSettings {
        let mut settings = AlertSettings::default();
        settings
            .set_thresholds("Reservoir", ThresholdPair::new(None, Some(60.0)))
            .unwrap();
        settings.set_repeating("Reservoir", repeating);
        settings
    }

    #[test]
    fn test_reading_inside_band_fires_nothing() {
        let outcome = evaluate_cycle(
            &sample_catalog(),
            &reservoir_max_60(false),
            &BTreeMap::new(),
            T0,
            &[reading("Reservoir", 55.0)],
        );
        assert_eq!(outcome, CycleOutcome::default());
    }

    #[test]
    fn test_first_breach_fires_and_records_now() {
        let outcome = evaluate_cycle(
            &sample_catalog(),
            &reservoir_max_60(false),
            &BTreeMap::new(),
            T0,
            &[reading("Reservoir", 65.0)],
        );
        assert_eq!(outcome.alerts.len(), 1);
        assert_eq!(outcome.alerts[0].kind, AlertKind::High);
        assert_eq!(outcome.alerts[0].title(), "⚠️ Reservoir CRITICAL HIGH");
        assert_eq!(outcome.updated_timestamps.get("Reservoir"), Some(&T0));
    }

    #[test]
    fn test_non_repeating_sensor_alerts_once() {
        let mut last = BTreeMap::new();
        last.insert("Reservoir".to_string(), T0);
        let outcome = evaluate_cycle(
            &sample_catalog(),
            &reservoir_max_60(false),
            &last,
            T0 + 24 * 3_600_000,
            &[reading("Reservoir", 65.0)],
        );
        assert!(outcome.alerts.is_empty());
        assert!(outcome.updated_timestamps.is_empty());
    }

    #[test]
    fn test_repeating_sensor_waits_for_cooldown() {
        let mut last = BTreeMap::new();
        last.insert("Reservoir".to_string(), T0);
        let catalog = sample_catalog();
        let settings = reservoir_max_60(true);
        let breach = [reading("Reservoir", 65.0)];

        let early_ms = T0 + REPEAT_COOLDOWN_MS - 1;
        let early = evaluate_cycle(&catalog, &settings, &last, early_ms, &breach);
        assert!(early.alerts.is_empty());

        let due = evaluate_cycle(&catalog, &settings, &last, T0 + REPEAT_COOLDOWN_MS, &breach);
        assert_eq!(due.alerts.len(), 1);
        assert_eq!(
            due.updated_timestamps.get("Reservoir"),
            Some(&(T0 + REPEAT_COOLDOWN_MS))
        );
    }

    #[test]
    fn test_sensors_without_thresholds_or_config_are_skipped() {
        let outcome = evaluate_cycle(
            &sample_catalog(),
            &reservoir_max_60(false),
            &BTreeMap::new(),
            T0,
            &[reading("OverheadTank", 1.0e6), reading("Unknown", 1.0e6)],
        );
        assert!(outcome.alerts.is_empty());
    }

    #[test]
    fn test_timestamps_never_decrease_when_clock_goes_back() {
        let mut last = BTreeMap::new();
        last.insert("Reservoir".to_string(), T0);
        let outcome = evaluate_cycle(
            &sample_catalog(),
            &reservoir_max_60(true),
            &last,
            T0 - 10 * REPEAT_COOLDOWN_MS,
            &[reading("Reservoir", 65.0)],
        );
        assert!(outcome.updated_timestamps.is_empty());
    }

    #[tokio::test]
    async fn test_run_cycle_without_config_is_a_silent_skip() -> Result<()> {
        init_test_tracing();
        let db = setup_test_db().await?;
        let sink = RecordingSink::default();
        let telemetry = FakeTelemetry::default();
        let driver = PollDriver::new(db, telemetry, sink.clone(), Duration::from_secs(1));

        assert_eq!(driver.run_cycle(Utc::now()).await?, None);
        assert!(sink.alerts().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_run_cycle_reservoir_scenario() -> Result<()> {
        init_test_tracing();
        let db = setup_test_db().await?;
        state::publish_catalog(&db, &sample_catalog()).await?;
        state::save_alert_settings(&db, &reservoir_max_60(false)).await?;

        let telemetry = FakeTelemetry::default().with_value("Reservoir", 55.0);
        let sink = RecordingSink::default();
        let driver = PollDriver::new(
            db.clone(),
            telemetry.clone(),
            sink.clone(),
            Duration::from_secs(1),
        );

        let t0 = Utc.timestamp_millis_opt(T0).unwrap();
        let report = driver.run_cycle(t0).await?.unwrap();
        assert_eq!(report.alerts_fired, 0);
        assert!(state::get_value(&db, "lastAlert_Reservoir").await?.is_none());

        telemetry.set_value("Reservoir", 65.0);
        let t1 = Utc.timestamp_millis_opt(T0 + 60_000).unwrap();
        let report = driver.run_cycle(t1).await?.unwrap();
        assert_eq!(report.alerts_fired, 1);
        assert_eq!(sink.alerts()[0].message(), "Water level 65 cm exceeds maximum 60 cm");
        assert_eq!(
            state::get_value(&db, "lastAlert_Reservoir").await?,
            Some((T0 + 60_000).to_string())
        );

        // non-repeating: stays silent afterwards
        let t2 = Utc.timestamp_millis_opt(T0 + 3_600_000).unwrap();
        assert_eq!(driver.run_cycle(t2).await?.unwrap().alerts_fired, 0);
        assert_eq!(sink.alerts().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_failures_skip_only_that_sensor() -> Result<()> {
        let db = setup_test_db().await?;
        state::publish_catalog(&db, &sample_catalog()).await?;
        let mut settings = reservoir_max_60(false);
        settings.set_thresholds("OverheadTank", ThresholdPair::new(Some(20.0), None))?;
        state::save_alert_settings(&db, &settings).await?;

        // Reservoir is not registered with the fake, so its fetch fails
        let telemetry = FakeTelemetry::default().with_value("OverheadTank", 5.0);
        let sink = RecordingSink::default();
        let driver = PollDriver::new(db, telemetry, sink.clone(), Duration::from_secs(1));

        let report = driver.run_cycle(Utc::now()).await?.unwrap();
        assert_eq!(report.sensors_watched, 2);
        assert_eq!(report.readings, 1);
        assert_eq!(sink.alerts()[0].sensor_id, "OverheadTank");
        Ok(())
    }

    #[tokio::test]
    async fn test_slow_fetch_times_out() -> Result<()> {
        let db = setup_test_db().await?;
        state::publish_catalog(&db, &sample_catalog()).await?;
        state::save_alert_settings(&db, &reservoir_max_60(false)).await?;

        let telemetry = FakeTelemetry::default()
            .with_value("Reservoir", 65.0)
            .with_delay(Duration::from_secs(5));
        let sink = RecordingSink::default();
        let driver = PollDriver::new(db, telemetry, sink.clone(), Duration::from_millis(20));

        let report = driver.run_cycle(Utc::now()).await?.unwrap();
        assert_eq!(report.readings, 0);
        assert!(sink.alerts().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_sink_failure_still_records_timestamp() -> Result<()> {
        let db = setup_test_db().await?;
        state::publish_catalog(&db, &sample_catalog()).await?;
        state::save_alert_settings(&db, &reservoir_max_60(false)).await?;

        let telemetry = FakeTelemetry::default().with_value("Reservoir", 65.0);
        let sink = RecordingSink::failing();
        let driver = PollDriver::new(db.clone(), telemetry, sink, Duration::from_secs(1));

        let report = driver.run_cycle(Utc.timestamp_millis_opt(T0).unwrap()).await?.unwrap();
        assert_eq!(report.alerts_fired, 1);
        assert_eq!(report.dispatch_failures, 1);
        assert_eq!(
            state::get_value(&db, "lastAlert_Reservoir").await?,
            Some(T0.to_string())
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_repeating_alerts_every_five_minutes_over_an_hour() -> Result<()> {
        let db = setup_test_db().await?;
        state::publish_catalog(&db, &sample_catalog()).await?;
        state::save_alert_settings(&db, &reservoir_max_60(true)).await?;

        let telemetry = FakeTelemetry::default().with_value("Reservoir", 65.0);
        let sink = RecordingSink::default();
        let driver = PollDriver::new(db, telemetry, sink.clone(), Duration::from_secs(1));

        for minute in 0..60 {
            let now = Utc.timestamp_millis_opt(T0 + minute * 60_000).unwrap();
            driver.run_cycle(now).await?;
        }
        assert_eq!(sink.alerts().len(), 12);
        Ok(())
    }

    #[tokio::test]
    async fn test_cycle_runs_on_a_spawned_task() -> Result<()> {
        let db = setup_test_db().await?;
        state::publish_catalog(&db, &sample_catalog()).await?;
        state::save_alert_settings(&db, &reservoir_max_60(false)).await?;

        let telemetry = FakeTelemetry::default().with_value("Reservoir", 65.0);
        let sink = RecordingSink::default();
        let driver = PollDriver::new(db.clone(), telemetry, sink.clone(), Duration::from_secs(1));

        let t0 = Utc.timestamp_millis_opt(T0).unwrap();
        let report = tokio::spawn(async move { driver.run_cycle(t0).await })
            .await
            .unwrap()?
            .unwrap();
        assert_eq!(report.alerts_fired, 1);
        assert_eq!(sink.alerts().len(), 1);
        Ok(())
    }
}
