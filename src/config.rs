//! Runtime configuration.
//!
//! Values come from three layers, later ones winning: built-in defaults,
//! environment variables, then command-line flags (applied by `main`).

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Configuration for the gateway process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Service identity used as the VAPID `sub` claim.
    pub subscriber: String,
    /// SQLite database holding registered subscriptions.
    pub db_path: PathBuf,
    /// JSON file holding the VAPID key pair.
    pub creds_path: PathBuf,
    /// Address to bind.
    pub host: String,
    /// Port to bind. Required before serving.
    pub port: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            subscriber: String::new(),
            db_path: PathBuf::from("subscribers.db"),
            creds_path: PathBuf::from("credentials.json"),
            host: "0.0.0.0".to_string(),
            port: None,
        }
    }
}

impl Config {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(subscriber) = std::env::var("PUSHGATE_SUBSCRIBER") {
            self.subscriber = subscriber;
        }

        if let Ok(db) = std::env::var("PUSHGATE_DB") {
            self.db_path = PathBuf::from(db);
        }

        if let Ok(creds) = std::env::var("PUSHGATE_CREDS") {
            self.creds_path = PathBuf::from(creds);
        }

        if let Ok(host) = std::env::var("PUSHGATE_HOST") {
            self.host = host;
        }

        if let Ok(port) = std::env::var("PORT") {
            self.port = Some(
                port.parse()
                    .with_context(|| format!("PORT must be a number, got '{port}'"))?,
            );
        }

        Ok(())
    }

    /// Check everything `serve` needs is present.
    pub fn validate_for_serve(&self) -> Result<()> {
        anyhow::ensure!(
            !self.subscriber.trim().is_empty(),
            "a subscriber identity is required (argument or PUSHGATE_SUBSCRIBER)"
        );
        anyhow::ensure!(self.port.is_some(), "$PORT must be set");
        Ok(())
    }

    /// Socket address to bind.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .with_context(|| format!("Invalid host address '{}'", self.host))?;
        let port = self.port.context("$PORT must be set")?;
        Ok(SocketAddr::new(ip, port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_historic_file_names() {
        let config = Config::default();
        assert_eq!(config.db_path, PathBuf::from("subscribers.db"));
        assert_eq!(config.creds_path, PathBuf::from("credentials.json"));
        assert_eq!(config.host, "0.0.0.0");
        assert!(config.port.is_none());
    }

    #[test]
    fn test_validate_requires_subscriber_and_port() {
        let mut config = Config::default();
        assert!(config.validate_for_serve().is_err());

        config.subscriber = "ops@example.com".to_string();
        assert!(config.validate_for_serve().is_err());

        config.port = Some(8080);
        assert!(config.validate_for_serve().is_ok());
    }

    #[test]
    fn test_bind_addr() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: Some(3000),
            ..Config::default()
        };
        assert_eq!(config.bind_addr().unwrap(), "127.0.0.1:3000".parse().unwrap());
    }

    #[test]
    fn test_bind_addr_rejects_bad_host() {
        let config = Config {
            host: "not an ip".to_string(),
            port: Some(3000),
            ..Config::default()
        };
        assert!(config.bind_addr().is_err());
    }
}
