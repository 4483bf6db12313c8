/// Application configuration loading from config.toml
pub mod app;

/// Database configuration and connection management
pub mod database;

/// Sensor pages and telemetry channel descriptors
pub mod sensors;

pub use app::{AppConfig, NotificationMode, load_config, load_default_config};
pub use sensors::{Limits, Page, PageSummary, SensorCatalog, SensorDescriptor};
