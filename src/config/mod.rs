//! Configuration Module - TOML-based Daemon Configuration
//!
//! Loads and validates configuration from `config.toml`. The store
//! credential can be supplied through the environment instead of the
//! file.

pub mod loader;

use serde::Deserialize;

/// Top-level configuration.
///
/// Loaded from `config.toml` at startup and validated before any
/// connection is made.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Daemon identity and mode.
  pub app: AppSection,
  /// Realtime database connection.
  pub store: StoreConfig,
  /// Object storage for player photos.
  pub assets: AssetsConfig,
  /// Metrics and monitoring.
  #[serde(default)]
  pub metrics: MetricsConfig,
}

/// Daemon identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
  /// Human-readable name, used in logs.
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
  /// Use the in-memory store and asset storage instead of the network.
  #[serde(default)]
  pub offline: bool,
}

/// Realtime database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
  /// Database base URL, e.g. `https://team-default-rtdb.firebaseio.com`.
  #[serde(default)]
  pub database_url: String,
  /// Database secret or ID token, sent as the `auth` query parameter.
  pub auth_token: Option<String>,
  /// Request timeout in seconds.
  #[serde(default = "default_timeout")]
  pub timeout_seconds: u64,
}

/// Object storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetsConfig {
  /// Storage bucket, e.g. `team.firebasestorage.app`.
  #[serde(default)]
  pub bucket: String,
  /// Storage REST API base URL.
  #[serde(default = "default_assets_url")]
  pub base_url: String,
  /// Upload timeout in seconds.
  #[serde(default = "default_upload_timeout")]
  pub timeout_seconds: u64,
}

/// Metrics and monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
  /// Enable Prometheus metrics export.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Metrics server bind address.
  #[serde(default = "default_metrics_addr")]
  pub bind_address: String,
  /// Health check endpoint port.
  #[serde(default = "default_health_port")]
  pub health_port: u16,
}

impl Default for MetricsConfig {
  fn default() -> Self {
    Self {
      enabled: default_true(),
      bind_address: default_metrics_addr(),
      health_port: default_health_port(),
    }
  }
}

// Default value functions for serde

fn default_log_level() -> String {
  "info".to_string()
}

const fn default_true() -> bool {
  true
}

const fn default_timeout() -> u64 {
  30
}

fn default_assets_url() -> String {
  "https://firebasestorage.googleapis.com/v0".to_string()
}

const fn default_upload_timeout() -> u64 {
  60
}

fn default_metrics_addr() -> String {
  "0.0.0.0:9090".to_string()
}

const fn default_health_port() -> u16 {
  8080
}
