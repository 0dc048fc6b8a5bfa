use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::errors::AppError;

pub type DbPool = DatabaseConnection;

#[derive(Clone, Debug)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(10),
            acquire_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(300),
        }
    }
}

impl From<&AppConfig> for DbConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            url: config.database_url.clone(),
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            connect_timeout: Duration::from_secs(config.db_connect_timeout_secs),
            acquire_timeout: Duration::from_secs(config.db_acquire_timeout_secs),
            idle_timeout: Duration::from_secs(config.db_idle_timeout_secs),
        }
    }
}

pub async fn establish_connection_with_config(config: DbConfig) -> Result<DbPool, AppError> {
    let mut options = ConnectOptions::new(config.url);
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(true);

    let pool = Database::connect(options).await.map_err(|e| {
        error!("Failed to connect to database: {}", e);
        AppError::DatabaseError(e)
    })?;

    Ok(pool)
}

pub async fn establish_connection_from_app_config(config: &AppConfig) -> Result<DbPool, AppError> {
    establish_connection_with_config(DbConfig::from(config)).await
}

pub async fn run_migrations(pool: &DbPool) -> Result<(), AppError> {
    info!("Running database migrations");
    let started = std::time::Instant::now();

    crate::migrator::Migrator::up(pool, None)
        .await
        .map_err(|e| {
            error!("Migration failed: {}", e);
            AppError::DatabaseError(e)
        })?;

    info!(elapsed_ms = started.elapsed().as_millis() as u64, "Migrations complete");
    Ok(())
}

pub async fn check_connection(pool: &DbPool) -> Result<(), AppError> {
    pool.ping().await.map_err(AppError::DatabaseError)
}
