use crate::config::Config;
use crate::error::Result;
use deadpool_postgres::Pool;

/// The application's state, cloned into every request handler.
///
/// All mutable state lives in the database; this struct only carries the
/// pool handle and configuration, constructed once at startup and passed
/// down explicitly.
#[derive(Clone)]
pub struct AppState {
    /// The database connection pool.
    pub db: Pool,
    /// The application's configuration.
    pub config: Config,
}

impl AppState {
    /// Creates a new `AppState` from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let db = crate::db::create_pool(&config.database_url, &config.pool)?;
        tracing::info!(
            max_size = config.pool.max_size,
            "PostgreSQL pool initialized"
        );

        Ok(AppState {
            db,
            config: config.clone(),
        })
    }
}
