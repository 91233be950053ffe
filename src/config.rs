//! Environment-driven service configuration.

use secrecy::SecretString;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing environment variable '{0}'")]
    Missing(&'static str),
    #[error("invalid value for '{var}': {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub jwt_secret: SecretString,
    pub jwt_expiration: Duration,
    pub refresh_token_secret: SecretString,
    pub refresh_token_expiration: Duration,
    pub media_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub nats_url: Option<String>,
    pub cors_origin: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let config = Self {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse(&get, "PORT", 4000)?,
            database_url: get("DATABASE_URL"),
            database_max_connections: parse(&get, "DATABASE_MAX_CONNECTIONS", 10)?,
            jwt_secret: SecretString::new(required("JWT_SECRET")?),
            jwt_expiration: Duration::from_secs(parse(&get, "JWT_EXPIRATION", 3600)?),
            refresh_token_secret: SecretString::new(required("REFRESH_TOKEN_SECRET")?),
            refresh_token_expiration: Duration::from_secs(parse(&get, "REFRESH_TOKEN_EXPIRATION", 7 * 24 * 3600)?),
            media_dir: get("MEDIA_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("./media")),
            max_upload_bytes: parse(&get, "MAX_UPLOAD_BYTES", 5 * 1024 * 1024)?,
            nats_url: get("NATS_URL"),
            cors_origin: get("CORS_ORIGIN"),
        };
        if config.jwt_expiration.is_zero() {
            return Err(ConfigError::Invalid { var: "JWT_EXPIRATION", reason: "must be greater than zero".into() });
        }
        Ok(config)
    }

    pub fn bind_address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

fn parse<T>(get: &impl Fn(&str) -> Option<String>, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(var) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid { var, reason: e.to_string() }),
        None => Ok(default),
    }
}
