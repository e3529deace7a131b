//! Configuration loading

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;
use warden_auth::{HashingParams, PasswordChangePolicy};
use warden_db::UsernamePolicy;

/// Secret used when none is configured. Tokens signed with it are forgeable
/// by anyone who has read this file.
pub const DEFAULT_JWT_SECRET: &str = "change-me-in-production";

/// Longest accepted token lifetime (one year)
const MAX_TOKEN_TTL_HOURS: i64 = 24 * 366;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub revocation: RevocationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Applied when the users table is first created
    #[serde(default)]
    pub username_policy: UsernamePolicy,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
            username_policy: UsernamePolicy::default(),
        }
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
    #[serde(default)]
    pub password_change_policy: PasswordChangePolicy,
    #[serde(default)]
    pub hashing: HashingParams,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            token_ttl_hours: default_token_ttl_hours(),
            password_change_policy: PasswordChangePolicy::default(),
            hashing: HashingParams::default(),
        }
    }
}

/// Where revocation records are kept
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RevocationBackend {
    #[default]
    Redis,
    /// Process-local; records are lost on restart and not shared between
    /// instances
    Memory,
}

/// Revocation store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevocationConfig {
    #[serde(default)]
    pub backend: RevocationBackend,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
}

impl Default for RevocationConfig {
    fn default() -> Self {
        Self {
            backend: RevocationBackend::default(),
            redis_url: default_redis_url(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
        }
    }
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_db_path() -> String {
    "./data/warden.db".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_jwt_secret() -> String {
    DEFAULT_JWT_SECRET.to_string()
}

fn default_token_ttl_hours() -> i64 {
    24
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

impl Config {
    /// Load configuration from file
    ///
    /// A missing file yields the defaults. The result is not validated
    /// until command-line overrides have been applied.
    pub fn load(path: &str) -> Result<Self> {
        let config_path = Path::new(path);

        if !config_path.exists() {
            info!("Config file not found at {}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        info!("Loaded configuration from {}", path);
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Replace file values with ones given on the command line or in the
    /// environment
    pub fn apply_overrides(&mut self, jwt_secret: Option<String>, redis_url: Option<String>) {
        if let Some(secret) = jwt_secret {
            self.auth.jwt_secret = secret;
        }
        if let Some(url) = redis_url {
            self.revocation.redis_url = url;
        }
    }

    /// Reject values the service cannot run with
    pub(crate) fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.is_empty() {
            bail!("auth.jwt_secret must not be empty");
        }
        if self.auth.token_ttl_hours <= 0 || self.auth.token_ttl_hours > MAX_TOKEN_TTL_HOURS {
            bail!(
                "auth.token_ttl_hours must be between 1 and {}",
                MAX_TOKEN_TTL_HOURS
            );
        }
        if self.database.max_connections == 0 {
            bail!("database.max_connections must be at least 1");
        }
        Ok(())
    }

    /// Whether tokens are signed with the built-in secret
    pub fn uses_default_secret(&self) -> bool {
        self.auth.jwt_secret == DEFAULT_JWT_SECRET
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse_valid(content: &str) -> Result<Config> {
        let config = Config::parse(content)?;
        config.validate()?;
        Ok(config)
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_valid("").unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.auth.token_ttl_hours, 24);
        assert_eq!(config.auth.password_change_policy, PasswordChangePolicy::KeepSessions);
        assert_eq!(config.database.username_policy, UsernamePolicy::CaseSensitive);
        assert_eq!(config.revocation.backend, RevocationBackend::Redis);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.metrics.enabled);
        assert!(config.uses_default_secret());
    }

    #[test]
    fn test_parse_full_config() {
        let config = parse_valid(
            r#"
            [server]
            bind_address = "127.0.0.1"
            port = 8080

            [database]
            path = "/var/lib/warden/users.db"
            max_connections = 4
            username_policy = "case-insensitive"

            [auth]
            jwt_secret = "s3cret"
            token_ttl_hours = 2
            password_change_policy = "revoke-others"

            [auth.hashing]
            memory_kib = 8192
            iterations = 3
            parallelism = 1

            [revocation]
            backend = "memory"

            [logging]
            level = "debug"
            format = "json"

            [metrics]
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.server.bind_address, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.max_connections, 4);
        assert_eq!(config.database.username_policy, UsernamePolicy::CaseInsensitive);
        assert_eq!(config.auth.token_ttl_hours, 2);
        assert_eq!(config.auth.password_change_policy, PasswordChangePolicy::RevokeOthers);
        assert_eq!(config.auth.hashing.memory_kib, 8192);
        assert_eq!(config.revocation.backend, RevocationBackend::Memory);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(!config.metrics.enabled);
        assert!(!config.uses_default_secret());
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(parse_valid("[auth]\njwt_secret = \"\"").is_err());
        assert!(parse_valid("[auth]\ntoken_ttl_hours = 0").is_err());
        assert!(parse_valid("[auth]\ntoken_ttl_hours = 10000000000").is_err());
        assert!(parse_valid("[database]\nmax_connections = 0").is_err());
        assert!(parse_valid("[revocation]\nbackend = \"etcd\"").is_err());
        assert!(parse_valid("[database]\nusername_policy = \"loose\"").is_err());
        assert!(parse_valid("[auth]\ntoken_ttl_hours = 8784").is_ok());
    }

    #[test]
    fn test_overrides_are_validated() {
        let mut config = parse_valid("[auth]\njwt_secret = \"from-file\"").unwrap();

        config.apply_overrides(Some(String::new()), None);
        assert!(config.auth.jwt_secret.is_empty());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let mut config = parse_valid("[auth]\njwt_secret = \"from-file\"").unwrap();

        config.apply_overrides(
            Some("from-env".to_string()),
            Some("redis://cache:6379".to_string()),
        );
        config.validate().unwrap();
        assert_eq!(config.auth.jwt_secret, "from-env");
        assert_eq!(config.revocation.redis_url, "redis://cache:6379");

        config.apply_overrides(None, None);
        assert_eq!(config.auth.jwt_secret, "from-env");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 4000").unwrap();

        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 4000);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 3000);
    }
}
