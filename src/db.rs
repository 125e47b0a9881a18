use crate::config::PoolSettings;
use crate::error::{AppError, Result};
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use std::time::Duration;
use tokio_postgres::NoTls;

/// Creates the bounded database connection pool.
///
/// The pool enforces a hard cap on live connections; callers beyond the cap
/// queue until `wait` elapses, at which point they get a timeout error rather
/// than a silent hang.
pub fn create_pool(database_url: &str, settings: &PoolSettings) -> Result<Pool> {
    let mut cfg = Config::new();
    let pg_config: tokio_postgres::Config = database_url
        .parse()
        .map_err(|e| AppError::Internal(format!("Invalid DATABASE_URL: {e}")))?;

    if let Some(tokio_postgres::config::Host::Tcp(hostname)) = pg_config.get_hosts().first() {
        cfg.host = Some(hostname.clone());
    }
    if let Some(port) = pg_config.get_ports().first() {
        cfg.port = Some(*port);
    }

    if let Some(dbname) = pg_config.get_dbname() {
        cfg.dbname = Some(dbname.to_string());
    }

    if let Some(user) = pg_config.get_user() {
        cfg.user = Some(user.to_string());
    }

    if let Some(password) = pg_config.get_password() {
        cfg.password = Some(String::from_utf8_lossy(password).to_string());
    }

    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });

    let mut pool_config = PoolConfig::new(settings.max_size);
    pool_config.timeouts = deadpool_postgres::Timeouts {
        wait: Some(Duration::from_secs(settings.wait_timeout_secs)),
        create: Some(Duration::from_secs(settings.create_timeout_secs)),
        recycle: Some(Duration::from_secs(1)),
    };
    cfg.pool = Some(pool_config);

    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
        .map_err(AppError::from)
}
