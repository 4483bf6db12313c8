//! Application configuration loading from config.toml
//!
//! One TOML file describes the sensor pages plus the knobs for the cache
//! bucket, the gateway, the background poller and alert notifications. Every
//! section except the pages has working defaults.

use crate::config::sensors::SensorCatalog;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Cache version used when `config.toml` does not name one
pub const DEFAULT_CACHE_VERSION: &str = "iitmz-water-mgmt-v1";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Pages and sensors (`[pages.<id>]` tables)
    #[serde(flatten)]
    pub catalog: SensorCatalog,
    /// Offline cache settings
    #[serde(default)]
    pub cache: CacheConfig,
    /// HTTP front end settings
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Background threshold check settings
    #[serde(default)]
    pub poller: PollerConfig,
    /// Where fired alerts go
    #[serde(default)]
    pub notifications: NotificationConfig,
}

/// `[cache]` section
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Bucket name; changing it retires every older bucket on next start
    #[serde(default = "default_cache_version")]
    pub version: String,
    /// Root-relative asset paths cached at install
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,
    /// Hosts served network-first (subdomains match too)
    #[serde(default = "default_network_first_hosts")]
    pub network_first_hosts: Vec<String>,
    /// Upper bound on the install step
    #[serde(default = "default_install_timeout_secs")]
    pub install_timeout_secs: u64,
}

/// `[gateway]` section
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Listen address
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
    /// Origin the dashboard assets are served from upstream
    #[serde(default = "default_app_origin")]
    pub app_origin: String,
}

/// `[poller]` section
#[derive(Debug, Clone, Deserialize)]
pub struct PollerConfig {
    /// Seconds between background checks
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Per-sensor fetch deadline in seconds
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// ThingSpeak API base URL
    #[serde(default = "default_telemetry_base_url")]
    pub telemetry_base_url: String,
}

/// How fired alerts are delivered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationMode {
    /// Log only; notification dispatch stays off
    #[default]
    Log,
    /// Post to a Discord channel through the bot token
    Discord,
}

/// `[notifications]` section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationConfig {
    /// Delivery mode
    #[serde(default)]
    pub mode: NotificationMode,
    /// Target channel when `mode = "discord"`
    #[serde(default)]
    pub discord_channel_id: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            version: default_cache_version(),
            manifest: default_manifest(),
            network_first_hosts: default_network_first_hosts(),
            install_timeout_secs: default_install_timeout_secs(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            app_origin: default_app_origin(),
        }
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            telemetry_base_url: default_telemetry_base_url(),
        }
    }
}

impl CacheConfig {
    /// Install deadline as a `Duration`
    #[must_use]
    pub const fn install_timeout(&self) -> Duration {
        Duration::from_secs(self.install_timeout_secs)
    }
}

impl PollerConfig {
    /// Poll period as a `Duration`
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Per-sensor fetch deadline as a `Duration`
    #[must_use]
    pub const fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

fn default_cache_version() -> String {
    DEFAULT_CACHE_VERSION.to_string()
}

fn default_manifest() -> Vec<String> {
    [
        "/IITMZ_WDN/",
        "/IITMZ_WDN/index.html",
        "/IITMZ_WDN/app.html",
        "/IITMZ_WDN/admin.html",
        "/IITMZ_WDN/config.js",
        "/IITMZ_WDN/app.js",
        "/IITMZ_WDN/translation-manager.js",
        "/IITMZ_WDN/IITMZ.jpg",
        "/IITMZ_WDN/IITMZ_Logo.ico",
        "/IITMZ_WDN/IITMZ_Logo_192.png",
        "/IITMZ_WDN/IITMZ_Logo_512.png",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_network_first_hosts() -> Vec<String> {
    ["thingspeak.com", "googleapis.com", "gstatic.com"]
        .into_iter()
        .map(String::from)
        .collect()
}

const fn default_install_timeout_secs() -> u64 {
    60
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_app_origin() -> String {
    "http://localhost:8000".to_string()
}

const fn default_interval_secs() -> u64 {
    15 * 60
}

const fn default_fetch_timeout_secs() -> u64 {
    15
}

fn default_telemetry_base_url() -> String {
    "https://api.thingspeak.com".to_string()
}

/// Loads application configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
/// - `mode = "discord"` is set without a `discord_channel_id`
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;
    parse_config(&contents)
}

/// Parses configuration from TOML text
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents)?;

    if config.notifications.mode == NotificationMode::Discord
        && config.notifications.discord_channel_id.is_none()
    {
        return Err(Error::Config {
            message: "notifications.mode = \"discord\" requires notifications.discord_channel_id"
                .to_string(),
        });
    }
    Ok(config)
}

/// Loads configuration from `WATERLINE_CONFIG`, or `./config.toml` when unset
pub fn load_default_config() -> Result<AppConfig> {
    let path = std::env::var("WATERLINE_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    load_config(path)
}
