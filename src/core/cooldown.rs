//! Cooldown gate - suppresses repeat alerts for the same sensor.
//!
//! # State Machine
//!
//! ```text
//!            alert && elapsed >= window
//!  Quiet ────────────────────────────────► RecentlyAlerted
//!                                             │
//!            (no transition back; state is recomputed from the
//!             stored timestamp every cycle)
//! ```
//!
//! The window is infinite unless repeating is enabled for the sensor, in
//! which case it is [`REPEAT_COOLDOWN_MS`]. A sensor with no stored timestamp
//! has never alerted and is always `Quiet`.

/// Cooldown between repeated alerts when repeating is enabled (5 minutes)
pub const REPEAT_COOLDOWN_MS: i64 = 300_000;

/// Minimum time between two alerts for one sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownWindow {
    /// Never re-alert once a timestamp is stored
    Infinite,
    /// Re-alert once this many milliseconds have passed
    Millis(i64),
}

impl CooldownWindow {
    /// Window for a sensor given its "repeating enabled" flag
    #[must_use]
    pub const fn for_repeating(enabled: bool) -> Self {
        if enabled {
            Self::Millis(REPEAT_COOLDOWN_MS)
        } else {
            Self::Infinite
        }
    }

    const fn has_elapsed(self, elapsed_ms: i64) -> bool {
        match self {
            Self::Infinite => false,
            Self::Millis(window) => elapsed_ms >= window,
        }
    }
}

/// Gate state derived from the last alert timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownState {
    /// A new alert may fire
    Quiet,
    /// Inside the window; alerts are suppressed
    RecentlyAlerted,
}

/// Outcome of [`decide`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Dispatch the alert and store `timestamp` as the new last-alert time
    Fire {
        /// Epoch millis to persist
        timestamp: i64,
    },
    /// Drop the alert; nothing is written
    Suppress,
}

/// Derives the gate state at `now_ms`.
#[must_use]
pub const fn state_at(
    last_alert_ms: Option<i64>,
    now_ms: i64,
    window: CooldownWindow,
) -> CooldownState {
    match last_alert_ms {
        None => CooldownState::Quiet,
        Some(last) => {
            if window.has_elapsed(now_ms.saturating_sub(last)) {
                CooldownState::Quiet
            } else {
                CooldownState::RecentlyAlerted
            }
        }
    }
}

/// Decides whether an alert condition may fire now.
///
/// Fires only when `alerting` is true and the gate is `Quiet`. A clock that
/// moved backwards yields a negative elapsed time and suppresses, so the
/// stored timestamp never decreases.
#[must_use]
pub const fn decide(
    alerting: bool,
    last_alert_ms: Option<i64>,
    now_ms: i64,
    window: CooldownWindow,
) -> GateDecision {
    if !alerting {
        return GateDecision::Suppress;
    }
    match state_at(last_alert_ms, now_ms, window) {
        CooldownState::Quiet => GateDecision::Fire { timestamp: now_ms },
        CooldownState::RecentlyAlerted => GateDecision::Suppress,
    }
}
