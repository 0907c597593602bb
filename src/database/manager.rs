use sqlx::{postgres::PgPoolOptions, PgPool};
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config;

/// Errors from DatabaseManager
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Connection pool manager for the application database.
///
/// The pool is created lazily so the server can start (and serve requests
/// that never touch storage) before the database is reachable.
pub struct DatabaseManager;

impl DatabaseManager {
    fn cell() -> &'static OnceLock<PgPool> {
        static POOL: OnceLock<PgPool> = OnceLock::new();
        &POOL
    }

    /// Get the application database pool, creating it on first use.
    pub fn pool() -> Result<PgPool, DatabaseError> {
        if let Some(pool) = Self::cell().get() {
            return Ok(pool.clone());
        }

        let url = std::env::var("DATABASE_URL")
            .map_err(|_| DatabaseError::ConfigMissing("DATABASE_URL"))?;

        let cfg = config::config();
        let pool = PgPoolOptions::new()
            .max_connections(cfg.database.max_connections)
            .acquire_timeout(Duration::from_secs(cfg.database.connection_timeout))
            .connect_lazy(&url)
            .map_err(|_| DatabaseError::InvalidDatabaseUrl)?;

        // First caller wins; later racers reuse the stored pool
        let pool = Self::cell().get_or_init(|| pool).clone();
        info!("Initialized database pool");
        Ok(pool)
    }

    /// Pings the database to ensure connectivity
    pub async fn health_check() -> Result<(), DatabaseError> {
        let pool = Self::pool()?;
        sqlx::query("SELECT 1").execute(&pool).await?;
        Ok(())
    }
}
