//! Application configuration
//!
//! Layered resolution: built-in defaults, then CLI flags / environment
//! variables (handled by clap's `env` attributes).

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::cli::CliConfig;
use super::constants::{DEFAULT_HOST, DEFAULT_PORT};

/// Whether the host string binds every interface
pub fn is_all_interfaces(host: &str) -> bool {
    matches!(host, "0.0.0.0" | "::" | "[::]")
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub enabled: bool,
    /// HS256 signing secret; a random key is generated when unset
    #[serde(skip_serializing)]
    pub jwt_secret: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            jwt_secret: None,
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    /// Data directory override (defaults to the platform data dir)
    pub data_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Build the effective configuration from defaults plus CLI/env overrides
    pub fn load(cli: &CliConfig) -> Result<Self> {
        let mut config = Self::default();

        if let Some(host) = &cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if let Some(enabled) = cli.auth_enabled {
            config.auth.enabled = enabled;
        }
        if let Some(dir) = &cli.data_dir {
            config.data_dir = Some(dir.clone());
        }
        if let Some(secret) = &cli.jwt_secret {
            config.auth.jwt_secret = Some(secret.clone());
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_cli() -> CliConfig {
        CliConfig {
            host: None,
            port: None,
            auth_enabled: None,
            data_dir: None,
            jwt_secret: None,
        }
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::load(&empty_cli()).unwrap();
        assert_eq!(config.server.host, DEFAULT_HOST);
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert!(config.auth.enabled);
        assert!(config.auth.jwt_secret.is_none());
    }

    #[test]
    fn test_cli_overrides() {
        let cli = CliConfig {
            host: Some("0.0.0.0".to_string()),
            port: Some(9000),
            auth_enabled: Some(false),
            data_dir: None,
            jwt_secret: Some("secret".to_string()),
        };
        let config = AppConfig::load(&cli).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert!(!config.auth.enabled);
        assert_eq!(config.auth.jwt_secret.as_deref(), Some("secret"));
    }
}
