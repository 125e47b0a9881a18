use anyhow::{Context, Result};
use std::env;

/// JWT signing configuration.
///
/// Access and refresh tokens are signed with separate secrets so a leaked
/// access secret cannot forge refresh tokens.
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret for short-lived access tokens.
    pub access_secret: String,
    /// Secret for long-lived refresh tokens.
    pub refresh_secret: String,
    /// Access token lifetime in seconds (default: 1 day).
    pub access_ttl_secs: i64,
    /// Refresh token (and session) lifetime in days (default: 7).
    pub refresh_ttl_days: i64,
}

/// Database connection pool sizing and timeouts.
#[derive(Clone)]
pub struct PoolSettings {
    /// Hard cap on live connections.
    pub max_size: usize,
    /// Seconds to wait for a free connection before failing with a timeout.
    pub wait_timeout_secs: u64,
    /// Seconds allowed for establishing a new connection.
    pub create_timeout_secs: u64,
}

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// The URL of the PostgreSQL database.
    pub database_url: String,
    /// Port the HTTP server binds to.
    pub port: u16,
    /// JWT signing configuration.
    pub jwt: JwtConfig,
    /// Connection pool settings.
    pub pool: PoolSettings,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw.parse().with_context(|| format!("Invalid {key}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Creates a new `Config` from environment variables.
    pub fn from_env() -> Result<Self> {
        let access_secret =
            env::var("JWT_SECRET_KEY").context("JWT_SECRET_KEY must be set")?;
        let refresh_secret =
            env::var("JWT_REFRESH_KEY").context("JWT_REFRESH_KEY must be set")?;
        anyhow::ensure!(!access_secret.is_empty(), "JWT_SECRET_KEY must not be empty");
        anyhow::ensure!(!refresh_secret.is_empty(), "JWT_REFRESH_KEY must not be empty");

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: env_parse("PORT", 3000)?,
            jwt: JwtConfig {
                access_secret,
                refresh_secret,
                access_ttl_secs: env_parse("JWT_ACCESS_TTL_SECS", 86_400)?,
                refresh_ttl_days: env_parse("JWT_REFRESH_TTL_DAYS", 7)?,
            },
            pool: PoolSettings {
                max_size: env_parse("DB_POOL_MAX", 10)?,
                wait_timeout_secs: env_parse("DB_POOL_WAIT_TIMEOUT_SECS", 5)?,
                create_timeout_secs: env_parse("DB_CONNECT_TIMEOUT_SECS", 2)?,
            },
        })
    }
}
