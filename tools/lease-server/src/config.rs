//! Server configuration.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use lease_core::{LeaseConfig, WriteMode};
use lease_observability::{LogFormat, LogLevel};
use serde::{Deserialize, Serialize};

/// Server configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listener configuration.
    #[serde(default)]
    pub server: ListenConfig,

    /// Backing store configuration.
    #[serde(default)]
    pub store: StoreConfig,

    /// Lease protocol configuration.
    #[serde(default)]
    pub lease: LeaseSettings,

    /// Logging configuration.
    #[serde(default)]
    pub log: LogConfig,
}

impl ServerConfig {
    /// Load config from a file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        if path.ends_with(".json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path))
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path))
        }
    }

    /// Apply environment overrides.
    ///
    /// `REDIS_HOST` and `REDIS_PORT` keep the names existing deployments use.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("REDIS_HOST") {
            self.store.host = host;
        }
        if let Some(port) = lookup("REDIS_PORT") {
            self.store.port = port
                .parse()
                .with_context(|| format!("Invalid REDIS_PORT: {}", port))?;
        }
        if let Some(port) = lookup("LEASE_PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("Invalid LEASE_PORT: {}", port))?;
        }
        if let Some(ttl) = lookup("LEASE_TTL_SECS") {
            self.lease.ttl_secs = ttl
                .parse()
                .with_context(|| format!("Invalid LEASE_TTL_SECS: {}", ttl))?;
        }
        Ok(())
    }

    /// Check the configuration before starting.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            bail!("server.port must be non-zero");
        }
        if self.store.backend == StoreBackend::Redis && self.store.host.is_empty() {
            bail!("store.host is required for the redis backend");
        }
        self.lease_config().validate()?;
        Ok(())
    }

    /// Protocol settings for the lease manager.
    pub fn lease_config(&self) -> LeaseConfig {
        LeaseConfig::new()
            .with_ttl(Duration::from_secs(self.lease.ttl_secs))
            .with_write_mode(self.lease.write_mode)
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenConfig {
    /// Bind address.
    #[serde(default = "default_listen_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_listen_port")]
    pub port: u16,
}

fn default_listen_host() -> String {
    "0.0.0.0".to_string()
}

fn default_listen_port() -> u16 {
    9090
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: default_listen_host(),
            port: default_listen_port(),
        }
    }
}

/// Which store implementation backs the leases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Shared Redis instance.
    #[default]
    Redis,
    /// Process-local map, for development only.
    Memory,
}

/// Store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Redis host.
    #[serde(default = "default_store_host")]
    pub host: String,

    /// Redis port.
    #[serde(default = "default_store_port")]
    pub port: u16,
}

fn default_store_host() -> String {
    "127.0.0.1".to_string()
}

fn default_store_port() -> u16 {
    6379
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            host: default_store_host(),
            port: default_store_port(),
        }
    }
}

/// Lease protocol settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseSettings {
    /// Lease window in seconds.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// How new leases are written.
    #[serde(default)]
    pub write_mode: WriteMode,
}

fn default_ttl_secs() -> u64 {
    lease_core::DEFAULT_LEASE_TTL.as_secs()
}

impl Default for LeaseSettings {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            write_mode: WriteMode::default(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Generate a default lease.toml config file.
pub fn generate_default_config() -> String {
    r#"# Page lease server configuration

[server]
host = "0.0.0.0"
port = 9090

[store]
# "redis" or "memory" (memory is process-local, for development only)
backend = "redis"
host = "127.0.0.1"
port = 6379

[lease]
ttl_secs = 300
# "if-absent" closes the create race with SET NX; "overwrite" keeps the
# read-then-set behaviour where concurrent creators can overwrite each other.
write_mode = "if-absent"

[log]
level = "info"
format = "json"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.store.backend, StoreBackend::Redis);
        assert_eq!(config.store.host, "127.0.0.1");
        assert_eq!(config.store.port, 6379);
        assert_eq!(config.lease.ttl_secs, 300);
        assert_eq!(config.lease.write_mode, WriteMode::IfAbsent);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_generated_config_parses() {
        let config: ServerConfig = toml::from_str(&generate_default_config()).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.lease.ttl_secs, 300);
        assert_eq!(config.log.format, LogFormat::Json);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
            [store]
            backend = "memory"

            [lease]
            write_mode = "overwrite"
            "#,
        )
        .unwrap();
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.port, 6379);
        assert_eq!(config.lease.write_mode, WriteMode::Overwrite);
        assert_eq!(config.lease.ttl_secs, 300);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("REDIS_HOST", "redis.internal"),
            ("REDIS_PORT", "6380"),
            ("LEASE_TTL_SECS", "60"),
        ]
        .into_iter()
        .collect();

        let mut config = ServerConfig::default();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.store.host, "redis.internal");
        assert_eq!(config.store.port, 6380);
        assert_eq!(config.lease_config().ttl_secs(), 60);
        assert_eq!(config.server.port, 9090);
    }

    #[test]
    fn test_env_rejects_bad_port() {
        let mut config = ServerConfig::default();
        let result = config.apply_env(|key| (key == "REDIS_PORT").then(|| "redis".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_zero_ttl() {
        let mut config = ServerConfig::default();
        config.lease.ttl_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_oversized_env_ttl() {
        let mut config = ServerConfig::default();
        config
            .apply_env(|key| (key == "LEASE_TTL_SECS").then(|| u64::MAX.to_string()))
            .unwrap();
        assert!(config.validate().is_err());
    }
}
