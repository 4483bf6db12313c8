//! Unified error type for Waterline.
//!
//! Benign conditions (no configuration yet, no reading available, cache miss)
//! are modelled as `Option`s by the callers and never reach this enum.

use thiserror::Error;

/// Every failure the gateway, poller and bot can report.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration file or persisted configuration document is unusable
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Database failure from `SeaORM`
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Outbound HTTP failure (connection refused, DNS, TLS, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A request target could not be turned into a URL
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The offending input
        url: String,
        /// Parser message
        reason: String,
    },

    /// The incoming request body could not be read
    #[error("Failed to read request body: {reason}")]
    RequestBody {
        /// Why reading stopped
        reason: String,
    },

    /// An absolute-form request target pointing outside the allowed hosts
    #[error("Refusing to proxy '{url}': host is not allowed")]
    ForbiddenTarget {
        /// The rejected target
        url: String,
    },

    /// A manifest asset could not be fetched while installing the cache bucket
    #[error("Failed to cache '{path}': {reason}")]
    CacheInstall {
        /// Manifest path that failed
        path: String,
        /// Why it failed
        reason: String,
    },

    /// Network and cache both had nothing to offer for a telemetry request
    #[error("Network request to '{url}' failed and no cached copy exists")]
    NetworkUnavailable {
        /// Requested URL
        url: String,
    },

    /// A sensor id that is not part of the static configuration
    #[error("Unknown sensor '{sensor_id}'")]
    SensorNotFound {
        /// The id that was asked for
        sensor_id: String,
    },

    /// A language code without a bundled translation table
    #[error("Unsupported language '{language}'")]
    UnsupportedLanguage {
        /// The code that was asked for
        language: String,
    },

    /// Threshold bounds that contradict each other
    #[error("Invalid threshold for '{sensor_id}': min {min} is above max {max}")]
    InvalidThreshold {
        /// Sensor being configured
        sensor_id: String,
        /// Requested minimum
        min: f64,
        /// Requested maximum
        max: f64,
    },

    /// JSON (de)serialization error for persisted documents
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse error for `config.toml`
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Formatting error while building a reply
    #[error("Formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable error
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// An operation ran past its deadline
    #[error("Timed out: {operation}")]
    Timeout {
        /// What was being waited on
        operation: String,
    },

    /// Serenity/Poise framework error
    #[error("Serenity/Poise framework error: {0}")]
    #[allow(clippy::enum_variant_names)]
    FrameworkError(Box<poise::serenity_prelude::Error>),
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::FrameworkError(Box::new(value))
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
