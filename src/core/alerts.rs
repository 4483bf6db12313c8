//! Alert sinks - where fired threshold alerts end up.

use crate::{core::thresholds::ThresholdAlert, errors::Result};
use std::future::Future;
use tracing::warn;

/// Receives alerts that passed the cooldown gate.
pub trait AlertSink: Send + Sync {
    /// Delivers one alert. A failure is logged by the caller and does not
    /// stop the alert from being recorded.
    fn dispatch(&self, alert: &ThresholdAlert) -> impl Future<Output = Result<()>> + Send;
}

/// Writes alerts to the log only
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl AlertSink for LogSink {
    async fn dispatch(&self, alert: &ThresholdAlert) -> Result<()> {
        warn!(
            sensor = %alert.sensor_id,
            kind = %alert.kind,
            "{}: {}",
            alert.title(),
            alert.message()
        );
        Ok(())
    }
}
