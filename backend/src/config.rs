//! Configuration management for the stock lookup server
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with STOCK_ prefix (e.g. `STOCK__ERP__HOST`)

use std::time::Duration;

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// ERP read-replica configuration
    pub erp: ErpConfig,

    /// Result cache configuration
    pub cache: CacheConfig,

    /// JWT session configuration
    pub jwt: JwtConfig,

    /// Users and login throttling
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

/// Where stock data is read from
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ErpSourceKind {
    /// PostgreSQL read replica of the Sage tables
    #[default]
    Postgres,
    /// JSON snapshot of the same tables, for offline runs
    Snapshot,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ErpConfig {
    /// Master switch; a disabled ERP serves empty results
    pub enabled: bool,

    pub source: ErpSourceKind,

    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,

    /// Connection ceiling shared by all requests
    pub max_connections: u32,

    /// Connection acquisition timeout in milliseconds
    pub connect_timeout_ms: u64,

    /// Statement timeout in milliseconds
    pub request_timeout_ms: u64,

    /// Idle connections are closed after this many seconds
    pub idle_timeout_secs: u64,

    /// Snapshot file, required when `source = "snapshot"`
    pub snapshot_path: Option<String>,
}

impl ErpConfig {
    /// Whether enough is configured to reach the ERP
    pub fn is_valid(&self) -> bool {
        if !self.enabled {
            return false;
        }
        match self.source {
            ErpSourceKind::Postgres => {
                !self.host.is_empty()
                    && !self.database.is_empty()
                    && !self.user.is_empty()
                    && !self.password.is_empty()
            }
            ErpSourceKind::Snapshot => self
                .snapshot_path
                .as_deref()
                .map(|p| !p.is_empty())
                .unwrap_or(false),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// Disabling the cache changes latency only, never results
    pub enabled: bool,

    /// Time-to-live applied at write time, in minutes
    pub ttl_minutes: u64,

    /// Upper bound on stored entries
    pub max_entries: usize,

    /// Period of the expired-entry sweep, in seconds
    pub sweep_interval_secs: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_minutes * 60)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for signing JWT tokens
    pub secret: String,

    /// Session token expiration in seconds
    pub session_expiry: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UserEntry {
    pub email: String,

    /// bcrypt hash
    pub password_hash: String,

    pub name: String,

    /// `admin` or `user`
    pub role: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Accounts allowed to sign in
    pub users: Vec<UserEntry>,

    /// Failed attempts before the identifier is blocked
    pub login_max_attempts: u32,

    /// Block duration in minutes
    pub login_block_minutes: u64,

    /// Delay added per failed attempt, in milliseconds
    pub login_delay_ms: u64,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("STOCK_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("erp.enabled", false)?
            .set_default("erp.source", "postgres")?
            .set_default("erp.host", "localhost")?
            .set_default("erp.port", 5432)?
            .set_default("erp.database", "")?
            .set_default("erp.user", "")?
            .set_default("erp.password", "")?
            .set_default("erp.max_connections", 5)?
            .set_default("erp.connect_timeout_ms", 5000)?
            .set_default("erp.request_timeout_ms", 10000)?
            .set_default("erp.idle_timeout_secs", 30)?
            .set_default("cache.enabled", true)?
            .set_default("cache.ttl_minutes", 30)?
            .set_default("cache.max_entries", 5000)?
            .set_default("cache.sweep_interval_secs", 300)?
            .set_default("jwt.session_expiry", 28800)?
            .set_default("auth.users", Vec::<String>::new())?
            .set_default("auth.login_max_attempts", 5)?
            .set_default("auth.login_block_minutes", 15)?
            .set_default("auth.login_delay_ms", 2000)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (STOCK_ prefix)
            .add_source(
                Environment::with_prefix("STOCK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

impl Default for ErpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            source: ErpSourceKind::Postgres,
            host: "localhost".to_string(),
            port: 5432,
            database: String::new(),
            user: String::new(),
            password: String::new(),
            max_connections: 5,
            connect_timeout_ms: 5000,
            request_timeout_ms: 10000,
            idle_timeout_secs: 30,
            snapshot_path: None,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_minutes: 30,
            max_entries: 5000,
            sweep_interval_secs: 300,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            users: Vec::new(),
            login_max_attempts: 5,
            login_block_minutes: 15,
            login_delay_ms: 2000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_erp_is_invalid() {
        let erp = ErpConfig {
            host: "replica".into(),
            database: "KLY".into(),
            user: "reader".into(),
            password: "secret".into(),
            ..ErpConfig::default()
        };
        assert!(!erp.is_valid());
        assert!(ErpConfig { enabled: true, ..erp.clone() }.is_valid());
        assert!(!ErpConfig { enabled: true, password: String::new(), ..erp }.is_valid());
    }

    #[test]
    fn snapshot_requires_path() {
        let erp = ErpConfig {
            enabled: true,
            source: ErpSourceKind::Snapshot,
            ..ErpConfig::default()
        };
        assert!(!erp.is_valid());
        assert!(ErpConfig { snapshot_path: Some("fixtures/erp.json".into()), ..erp }.is_valid());
    }
}
