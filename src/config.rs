use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "Hillcrest";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Access tokens are short-lived; clients renew them with the refresh token.
pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: u64 = 5 * 60;
pub const DEFAULT_REFRESH_TOKEN_TTL_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";

/// Get the application data directory (~/Hillcrest/)
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_NAME)
}

/// Default location of the SQLite database
pub fn default_db_path() -> PathBuf {
    app_data_dir().join("hillcrest.db")
}

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "hillcrest=info,hillcrest_lib=info,tower_http=warn"
}

/// Credentials for the superuser created on first start.
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
}

/// Runtime settings, read from `HILLCREST_*` environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub db_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            bind_addr: DEFAULT_BIND_ADDR
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 8000))),
            access_token_ttl: Duration::from_secs(DEFAULT_ACCESS_TOKEN_TTL_SECS),
            refresh_token_ttl: Duration::from_secs(DEFAULT_REFRESH_TOKEN_TTL_SECS),
            bootstrap_admin: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the process environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = lookup("HILLCREST_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        if let Some(addr) = lookup("HILLCREST_BIND_ADDR") {
            config.bind_addr = addr.parse().map_err(|_| ConfigError::InvalidValue {
                key: "HILLCREST_BIND_ADDR",
                value: addr.clone(),
            })?;
        }
        if let Some(ttl) = lookup("HILLCREST_ACCESS_TOKEN_TTL_SECS") {
            config.access_token_ttl = parse_secs("HILLCREST_ACCESS_TOKEN_TTL_SECS", &ttl)?;
        }
        if let Some(ttl) = lookup("HILLCREST_REFRESH_TOKEN_TTL_SECS") {
            config.refresh_token_ttl = parse_secs("HILLCREST_REFRESH_TOKEN_TTL_SECS", &ttl)?;
        }
        if let (Some(username), Some(password)) = (
            lookup("HILLCREST_ADMIN_USERNAME"),
            lookup("HILLCREST_ADMIN_PASSWORD"),
        ) {
            config.bootstrap_admin = Some(BootstrapAdmin { username, password });
        }

        Ok(config)
    }
}

fn parse_secs(key: &'static str, value: &str) -> Result<Duration, ConfigError> {
    match value.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}
