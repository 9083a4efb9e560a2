pub mod transaction;

use crate::config::AppConfig;
use crate::errors::{DbStage, ServiceError};
use metrics::{counter, gauge, histogram};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

pub use transaction::{run_in_transaction, BoxFuture, TxnState};

/// Shared handle to the order and invoice store
pub type DbPool = DatabaseConnection;

/// Pool sizing and timeouts for the store
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub acquire_timeout: Duration,
}

impl From<&AppConfig> for PoolSettings {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            url: cfg.database.url.clone(),
            max_connections: cfg.database.max_connections,
            min_connections: cfg.database.min_connections,
            connect_timeout: Duration::from_secs(cfg.database.connect_timeout_secs),
            idle_timeout: Duration::from_secs(cfg.database.idle_timeout_secs),
            acquire_timeout: Duration::from_secs(cfg.database.acquire_timeout_secs),
        }
    }
}

/// Opens the store described by the application configuration.
///
/// # Errors
/// `DatabaseError` at the connect stage when the pool cannot be opened.
pub async fn connect(cfg: &AppConfig) -> Result<DbPool, ServiceError> {
    open_pool(&PoolSettings::from(cfg)).await
}

pub async fn open_pool(settings: &PoolSettings) -> Result<DbPool, ServiceError> {
    let mut options = ConnectOptions::new(settings.url.clone());
    options
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .connect_timeout(settings.connect_timeout)
        .acquire_timeout(settings.acquire_timeout)
        .idle_timeout(settings.idle_timeout)
        .sqlx_logging(false);

    gauge!("ubl_db.max_connections", settings.max_connections as f64);
    debug!(
        max_connections = settings.max_connections,
        min_connections = settings.min_connections,
        "Opening store pool"
    );

    let pool = Database::connect(options).await.map_err(|e| {
        error!(error = %e, "Could not open store");
        counter!("ubl_db.connection_failures", 1);
        ServiceError::database(DbStage::Connect, e)
    })?;

    info!(backend = ?pool.get_database_backend(), "Store opened");
    Ok(pool)
}

/// Creates the orders, order_items, invoices and invoice_items tables when missing.
pub async fn run_migrations(pool: &DbPool) -> Result<(), ServiceError> {
    let started = Instant::now();
    crate::migrator::Migrator::up(pool, None).await.map_err(|e| {
        error!(error = %e, "Schema migration failed");
        ServiceError::database(DbStage::Migrate, e)
    })?;

    info!(elapsed_ms = started.elapsed().as_millis() as u64, "Schema up to date");
    Ok(())
}

/// Round-trips a ping to the store; used by the health endpoint.
pub async fn check_connection(pool: &DbPool) -> Result<(), ServiceError> {
    let started = Instant::now();
    match pool.ping().await {
        Ok(()) => {
            histogram!("ubl_db.ping_ms", started.elapsed().as_millis() as f64);
            Ok(())
        }
        Err(e) => {
            counter!("ubl_db.connection_failures", 1);
            Err(ServiceError::database(DbStage::Connect, e))
        }
    }
}

/// Single-connection in-memory SQLite pool with migrations applied.
#[cfg(test)]
pub(crate) async fn memory_pool() -> DbPool {
    let settings = PoolSettings {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
        connect_timeout: Duration::from_secs(5),
        idle_timeout: Duration::from_secs(60),
        acquire_timeout: Duration::from_secs(5),
    };
    let pool = open_pool(&settings).await.expect("in-memory sqlite opens");
    run_migrations(&pool).await.expect("migrations apply");
    pool
}
