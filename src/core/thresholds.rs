//! Threshold evaluation - decides whether a reading breaches its bounds.
//!
//! The check is a pure function of one reading and one `{min, max}` pair.
//! Either bound may be absent, meaning no constraint on that side. The low
//! side is checked first, so a pair with `min > max` reports LOW for readings
//! below `min` even when they are also above `max`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-sensor alert bounds as stored in `globalAlertSettings`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdPair {
    /// Alert when the level drops below this value
    #[serde(default)]
    pub min: Option<f64>,
    /// Alert when the level rises above this value
    #[serde(default)]
    pub max: Option<f64>,
}

/// Which side of the band was breached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertKind {
    /// Reading below `min`
    Low,
    /// Reading above `max`
    High,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

/// A breached threshold, ready to be gated and dispatched
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdAlert {
    /// Sensor that breached
    pub sensor_id: String,
    /// Side of the breach
    pub kind: AlertKind,
    /// The reading that breached
    pub value: f64,
    /// The bound it crossed
    pub bound: f64,
}

impl ThresholdAlert {
    /// Short headline, e.g. `⚠️ Reservoir CRITICAL HIGH`
    #[must_use]
    pub fn title(&self) -> String {
        format!("⚠️ {} CRITICAL {}", self.sensor_id, self.kind)
    }

    /// Sentence reporting the reading against the bound
    #[must_use]
    pub fn message(&self) -> String {
        match self.kind {
            AlertKind::Low => format!(
                "Water level {} cm is below minimum {} cm",
                self.value, self.bound
            ),
            AlertKind::High => format!(
                "Water level {} cm exceeds maximum {} cm",
                self.value, self.bound
            ),
        }
    }
}

impl ThresholdPair {
    /// Creates a pair from optional bounds
    #[must_use]
    pub const fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    /// True when neither bound is set
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// Checks `value` against `thresholds` for `sensor_id`.
///
/// Returns `None` when the reading sits inside the band (bounds inclusive)
/// or when both bounds are unset.
#[must_use]
pub fn evaluate(sensor_id: &str, value: f64, thresholds: &ThresholdPair) -> Option<ThresholdAlert> {
    let breach = match (thresholds.min, thresholds.max) {
        (Some(min), _) if value < min => Some((AlertKind::Low, min)),
        (_, Some(max)) if value > max => Some((AlertKind::High, max)),
        _ => None,
    };

    breach.map(|(kind, bound)| ThresholdAlert {
        sensor_id: sensor_id.to_string(),
        kind,
        value,
        bound,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_below_min_is_low() {
        let alert = evaluate("Reservoir", 40.0, &ThresholdPair::new(Some(50.0), None)).unwrap();
        assert_eq!(alert.kind, AlertKind::Low);
        assert_eq!(alert.bound, 50.0);
        assert_eq!(alert.title(), "⚠️ Reservoir CRITICAL LOW");
        assert_eq!(alert.message(), "Water level 40 cm is below minimum 50 cm");
    }

    #[test]
    fn test_above_max_is_high() {
        let alert = evaluate("Reservoir", 65.0, &ThresholdPair::new(None, Some(60.0))).unwrap();
        assert_eq!(alert.kind, AlertKind::High);
        assert_eq!(alert.title(), "⚠️ Reservoir CRITICAL HIGH");
        assert_eq!(alert.message(), "Water level 65 cm exceeds maximum 60 cm");
    }

    #[test]
    fn test_reading_below_max_does_not_alert() {
        assert!(evaluate("Reservoir", 55.0, &ThresholdPair::new(None, Some(60.0))).is_none());
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let pair = ThresholdPair::new(Some(20.0), Some(80.0));
        assert!(evaluate("S", 20.0, &pair).is_none());
        assert!(evaluate("S", 80.0, &pair).is_none());
        assert!(evaluate("S", 50.0, &pair).is_none());
    }

    #[test]
    fn test_unbounded_pair_never_alerts() {
        let pair = ThresholdPair::default();
        assert!(pair.is_unbounded());
        for value in [-1000.0, 0.0, 55.5, 1.0e9] {
            assert!(evaluate("S", value, &pair).is_none());
        }
    }

    #[test]
    fn test_low_wins_when_bounds_are_inverted() {
        // min above max: a reading under min is reported LOW even though it is also above max
        let pair = ThresholdPair::new(Some(100.0), Some(10.0));
        assert_eq!(evaluate("S", 50.0, &pair).unwrap().kind, AlertKind::Low);
        assert_eq!(evaluate("S", 150.0, &pair).unwrap().kind, AlertKind::High);
    }

    #[test]
    fn test_classification_matches_definition_across_grid() {
        let bounds = [None, Some(10.0), Some(50.0), Some(90.0)];
        for min in bounds {
            for max in bounds {
                let pair = ThresholdPair::new(min, max);
                for value in [0.0, 10.0, 30.0, 50.0, 70.0, 90.0, 120.0] {
                    let low = min.is_some_and(|m| value < m);
                    let high = !low && max.is_some_and(|m| value > m);
                    let expected = if low {
                        Some(AlertKind::Low)
                    } else if high {
                        Some(AlertKind::High)
                    } else {
                        None
                    };
                    assert_eq!(
                        evaluate("S", value, &pair).map(|a| a.kind),
                        expected,
                        "value {value} with {pair:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_fractional_values_are_reported_verbatim() {
        let alert = evaluate("OverheadTank", 12.5, &ThresholdPair::new(Some(20.25), None)).unwrap();
        assert_eq!(
            alert.message(),
            "Water level 12.5 cm is below minimum 20.25 cm"
        );
    }

    #[test]
    fn test_null_bounds_deserialize_as_unset() {
        let pair: ThresholdPair = serde_json::from_str(r#"{"min":null,"max":60}"#).unwrap();
        assert_eq!(pair, ThresholdPair::new(None, Some(60.0)));
    }
}
