//! Core configuration types and loading.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

use super::defaults::{
    default_admin_console_url, default_listen, default_login_path, default_public_url,
};
use super::notify::{AdminAccount, NotifyConfig};
use super::routes::RoutesConfig;
use super::security::SecurityConfig;
use super::session::SessionConfig;

/// Environment variable overriding `[security].signing_secret`.
pub const SIGNING_SECRET_ENV: &str = "STEELGATE_SIGNING_SECRET";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Gateway configuration. Read once at startup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    /// Account database. Absent means an in-memory store.
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub routes: RoutesConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    /// Admin accounts created at startup if missing.
    #[serde(default)]
    pub admins: Vec<AdminAccount>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides using `lookup` as the environment.
    pub fn apply_env_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(secret) = lookup(SIGNING_SECRET_ENV) {
            tracing::info!("signing secret taken from {}", SIGNING_SECRET_ENV);
            self.security.signing_secret = secret.into();
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    /// Base URL approval links point at.
    #[serde(default = "default_public_url")]
    pub public_url: String,
    /// Link shown on approval result pages.
    #[serde(default = "default_admin_console_url")]
    pub admin_console_url: String,
    /// Where unauthenticated requests to protected paths are sent.
    #[serde(default = "default_login_path")]
    pub login_path: String,
    /// Prometheus metrics HTTP port. Disabled when unset.
    pub metrics_port: Option<u16>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            public_url: default_public_url(),
            admin_console_url: default_admin_console_url(),
            login_path: default_login_path(),
            metrics_port: None,
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file, or `:memory:`.
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.listen, default_listen());
        assert_eq!(config.server.login_path, "/login");
        assert!(config.database.is_none());
        assert_eq!(config.security.rate_limit.max_requests, 10);
        assert_eq!(config.routes.public, vec!["/admin/approve"]);
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
listen = "127.0.0.1:9000"
public_url = "https://steel.example.com"
metrics_port = 9100

[database]
path = "data/steelgate.db"

[security]
signing_secret = "0123456789abcdef0123456789abcdef"
token_validity_secs = 3600

[security.rate_limit]
max_requests = 50
window_ms = 60000
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.listen.port(), 9000);
        assert_eq!(config.server.metrics_port, Some(9100));
        assert_eq!(config.database.unwrap().path, "data/steelgate.db");
        assert_eq!(config.security.token_validity_secs, 3600);
        assert_eq!(config.security.rate_limit.max_requests, 50);
        assert_eq!(config.security.rate_limit.window_ms, 60_000);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Config::load("/nonexistent/steelgate.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn bad_toml_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\nlisten = ").unwrap();
        assert!(matches!(
            Config::load(file.path()).unwrap_err(),
            ConfigError::Parse(_)
        ));
    }

    #[test]
    fn env_overrides_signing_secret() {
        let mut config: Config =
            toml::from_str("[security]\nsigning_secret = \"from-file\"").unwrap();
        config.apply_env_overrides_from(|key| {
            (key == SIGNING_SECRET_ENV).then(|| "from-env-0123456789abcdef0123456789".to_string())
        });
        assert_eq!(
            config.security.signing_secret.expose(),
            "from-env-0123456789abcdef0123456789"
        );

        config.apply_env_overrides_from(|_| None);
        assert_eq!(
            config.security.signing_secret.expose(),
            "from-env-0123456789abcdef0123456789"
        );
    }
}
