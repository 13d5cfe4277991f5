//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, applying environment overrides,
//! validating all parameters, and providing clear error messages for
//! misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;

/// Environment variable that overrides `store.auth_token`.
pub const AUTH_TOKEN_ENV: &str = "HOOPSLAB_AUTH_TOKEN";

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let mut config = parse_config(&content)?;
  apply_env_overrides(&mut config, std::env::var(AUTH_TOKEN_ENV).ok());
  validate_config(&config)?;

  info!(
    name = %config.app.name,
    offline = config.app.offline,
    database = %config.store.database_url,
    authenticated = config.store.auth_token.is_some(),
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse configuration text without touching the environment.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  toml::from_str(content).with_context(|| "Failed to parse config.toml")
}

fn apply_env_overrides(config: &mut AppConfig, auth_token: Option<String>) {
  if let Some(token) = auth_token.filter(|t| !t.trim().is_empty()) {
    config.store.auth_token = Some(token);
  }
}

/// Validate all configuration parameters.
///
/// Network settings are only required when running online.
pub fn validate_config(config: &AppConfig) -> Result<()> {
  anyhow::ensure!(
    !config.app.name.trim().is_empty(),
    "app.name must not be empty"
  );

  if !config.app.offline {
    anyhow::ensure!(
      config.store.database_url.starts_with("https://")
        || config.store.database_url.starts_with("http://"),
      "store.database_url must be an http(s) URL, got {:?}",
      config.store.database_url
    );
    anyhow::ensure!(
      !config.assets.bucket.is_empty(),
      "assets.bucket must not be empty"
    );
  }

  anyhow::ensure!(
    config.store.timeout_seconds > 0,
    "store.timeout_seconds must be positive"
  );
  anyhow::ensure!(
    config.assets.timeout_seconds > 0,
    "assets.timeout_seconds must be positive"
  );

  if config.metrics.enabled {
    config
      .metrics
      .bind_address
      .parse::<std::net::SocketAddr>()
      .with_context(|| {
        format!(
          "metrics.bind_address is not a socket address: {}",
          config.metrics.bind_address
        )
      })?;
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  const ONLINE: &str = r#"
[app]
name = "Hoops Lab"

[store]
database_url = "https://team-default-rtdb.firebaseio.com"

[assets]
bucket = "team.firebasestorage.app"
"#;

  #[test]
  fn test_load_nonexistent_file() {
    let result = load_config("nonexistent.toml");
    assert!(result.is_err());
  }

  #[test]
  fn test_defaults() {
    let config = parse_config(ONLINE).unwrap();
    validate_config(&config).unwrap();
    assert_eq!(config.app.log_level, "info");
    assert!(!config.app.offline);
    assert_eq!(config.store.timeout_seconds, 30);
    assert_eq!(
      config.assets.base_url,
      "https://firebasestorage.googleapis.com/v0"
    );
    assert!(config.metrics.enabled);
    assert_eq!(config.metrics.health_port, 8080);
  }

  #[test]
  fn test_env_token_overrides_file() {
    let mut config = parse_config(ONLINE).unwrap();
    apply_env_overrides(&mut config, Some("secret".to_string()));
    assert_eq!(config.store.auth_token.as_deref(), Some("secret"));

    apply_env_overrides(&mut config, Some("  ".to_string()));
    assert_eq!(config.store.auth_token.as_deref(), Some("secret"));
  }

  #[test]
  fn test_online_requires_database_url() {
    let config = parse_config(
      r#"
[app]
name = "Hoops Lab"
[store]
[assets]
"#,
    )
    .unwrap();
    assert!(validate_config(&config).is_err());
  }

  #[test]
  fn test_offline_needs_no_network_settings() {
    let config = parse_config(
      r#"
[app]
name = "Hoops Lab"
offline = true
[store]
[assets]
"#,
    )
    .unwrap();
    validate_config(&config).unwrap();
  }
}
