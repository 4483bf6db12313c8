//! Core logic - framework-agnostic caching, routing and alerting.
//!
//! Nothing in here knows about axum or Discord; the gateway and the bot are
//! thin adapters over these modules.

/// Alert sinks for fired threshold alerts
pub mod alerts;
/// Versioned asset cache buckets
pub mod cache;
/// Repeat-alert cooldown gate
pub mod cooldown;
/// Request/response types and the live fetcher
pub mod fetch;
/// Translation tables and lookup
pub mod i18n;
/// Background threshold poller
pub mod poll;
/// Network-first / cache-first request routing
pub mod router;
/// Persisted alert settings document
pub mod settings;
/// Key-value store access
pub mod state;
/// ThingSpeak telemetry client
pub mod telemetry;
/// Pure threshold evaluation
pub mod thresholds;
