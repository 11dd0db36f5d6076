mod error;
#[cfg(feature = "database-postgres")]
pub mod postgres;
pub mod repos;
#[cfg(feature = "database-sqlite")]
pub mod sqlite;

#[cfg(all(test, any(feature = "database-sqlite", feature = "database-postgres")))]
pub mod tests;

use std::sync::Arc;

pub use error::{DbError, DbResult};
pub use repos::*;

use crate::config::DatabaseConfig;

/// PostgreSQL pool configuration with optional read replica.
#[cfg(feature = "database-postgres")]
pub struct PgPoolPair {
    /// Primary pool for writes.
    pub write: sqlx::PgPool,
    /// Optional read replica pool. If None, reads use the write pool.
    pub read: Option<sqlx::PgPool>,
}

/// Cached repository trait objects, created once at startup.
struct CachedRepos {
    organizations: Arc<dyn OrganizationRepo>,
    users: Arc<dyn UserRepo>,
    catalog_services: Arc<dyn CatalogServiceRepo>,
    usage_logs: Arc<dyn UsageLogRepo>,
}

impl CachedRepos {
    #[cfg(feature = "database-sqlite")]
    fn sqlite(pool: &sqlx::SqlitePool) -> Self {
        Self {
            organizations: Arc::new(sqlite::SqliteOrganizationRepo::new(pool.clone())),
            users: Arc::new(sqlite::SqliteUserRepo::new(pool.clone())),
            catalog_services: Arc::new(sqlite::SqliteCatalogServiceRepo::new(pool.clone())),
            usage_logs: Arc::new(sqlite::SqliteUsageLogRepo::new(pool.clone())),
        }
    }

    #[cfg(feature = "database-postgres")]
    fn postgres(write_pool: &sqlx::PgPool, read_pool: &Option<sqlx::PgPool>) -> Self {
        Self {
            organizations: Arc::new(postgres::PostgresOrganizationRepo::new(
                write_pool.clone(),
                read_pool.clone(),
            )),
            users: Arc::new(postgres::PostgresUserRepo::new(
                write_pool.clone(),
                read_pool.clone(),
            )),
            catalog_services: Arc::new(postgres::PostgresCatalogServiceRepo::new(
                write_pool.clone(),
                read_pool.clone(),
            )),
            usage_logs: Arc::new(postgres::PostgresUsageLogRepo::new(
                write_pool.clone(),
                read_pool.clone(),
            )),
        }
    }
}

enum PoolStorage {
    #[cfg(feature = "database-sqlite")]
    Sqlite(sqlx::SqlitePool),
    #[cfg(feature = "database-postgres")]
    Postgres(PgPoolPair),
    #[cfg(not(any(feature = "database-sqlite", feature = "database-postgres")))]
    _None(std::convert::Infallible),
}

/// Database pool supporting both SQLite and PostgreSQL.
///
/// Repositories are cached at construction time to avoid allocation on each access.
pub struct DbPool {
    inner: PoolStorage,
    repos: CachedRepos,
}

impl DbPool {
    /// Create a DbPool from an existing SQLite pool.
    /// Primarily useful for testing.
    #[cfg(feature = "database-sqlite")]
    pub fn from_sqlite(pool: sqlx::SqlitePool) -> Self {
        DbPool {
            repos: CachedRepos::sqlite(&pool),
            inner: PoolStorage::Sqlite(pool),
        }
    }

    /// Create a DbPool from existing PostgreSQL pools.
    /// Primarily useful for testing.
    #[cfg(feature = "database-postgres")]
    pub fn from_postgres(write_pool: sqlx::PgPool, read_pool: Option<sqlx::PgPool>) -> Self {
        DbPool {
            repos: CachedRepos::postgres(&write_pool, &read_pool),
            inner: PoolStorage::Postgres(PgPoolPair {
                write: write_pool,
                read: read_pool,
            }),
        }
    }

    /// Create a database pool from configuration
    pub async fn from_config(config: &DatabaseConfig) -> DbResult<Self> {
        match config {
            DatabaseConfig::None => Err(DbError::NotConfigured),
            #[cfg(feature = "database-sqlite")]
            DatabaseConfig::Sqlite(cfg) => {
                let pool = sqlx::sqlite::SqlitePoolOptions::new()
                    .max_connections(cfg.max_connections)
                    .connect_with(
                        sqlx::sqlite::SqliteConnectOptions::new()
                            .filename(&cfg.path)
                            .create_if_missing(cfg.create_if_missing)
                            .foreign_keys(true)
                            .journal_mode(if cfg.wal_mode {
                                sqlx::sqlite::SqliteJournalMode::Wal
                            } else {
                                sqlx::sqlite::SqliteJournalMode::Delete
                            })
                            .busy_timeout(std::time::Duration::from_millis(cfg.busy_timeout_ms)),
                    )
                    .await?;
                Ok(Self::from_sqlite(pool))
            }
            #[cfg(feature = "database-postgres")]
            DatabaseConfig::Postgres(cfg) => {
                let write_pool = connect_postgres(cfg, &cfg.url).await?;
                let read_pool = match &cfg.read_url {
                    Some(read_url) => {
                        tracing::info!("Configuring read replica pool");
                        Some(connect_postgres(cfg, read_url).await?)
                    }
                    None => None,
                };
                Ok(Self::from_postgres(write_pool, read_pool))
            }
        }
    }

    /// Run database migrations using sqlx's migration runner.
    /// Migrations always run on the primary (write) pool.
    pub async fn run_migrations(&self) -> DbResult<()> {
        match &self.inner {
            #[cfg(feature = "database-sqlite")]
            PoolStorage::Sqlite(pool) => {
                tracing::info!("Running SQLite migrations");
                sqlx::migrate!("./migrations_sqlx/sqlite").run(pool).await?;
                tracing::info!("SQLite migrations completed successfully");
                Ok(())
            }
            #[cfg(feature = "database-postgres")]
            PoolStorage::Postgres(pools) => {
                tracing::info!("Running PostgreSQL migrations");
                sqlx::migrate!("./migrations_sqlx/postgres")
                    .run(&pools.write)
                    .await?;
                tracing::info!("PostgreSQL migrations completed successfully");
                Ok(())
            }
            #[cfg(not(any(feature = "database-sqlite", feature = "database-postgres")))]
            PoolStorage::_None(infallible) => match *infallible {},
        }
    }

    pub fn organizations(&self) -> Arc<dyn OrganizationRepo> {
        Arc::clone(&self.repos.organizations)
    }

    pub fn users(&self) -> Arc<dyn UserRepo> {
        Arc::clone(&self.repos.users)
    }

    pub fn catalog_services(&self) -> Arc<dyn CatalogServiceRepo> {
        Arc::clone(&self.repos.catalog_services)
    }

    pub fn usage_logs(&self) -> Arc<dyn UsageLogRepo> {
        Arc::clone(&self.repos.usage_logs)
    }

    /// Health check for database connectivity
    pub async fn health_check(&self) -> DbResult<()> {
        match &self.inner {
            #[cfg(feature = "database-sqlite")]
            PoolStorage::Sqlite(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
                Ok(())
            }
            #[cfg(feature = "database-postgres")]
            PoolStorage::Postgres(pools) => {
                // Check both write and read pools
                sqlx::query("SELECT 1").execute(&pools.write).await?;
                if let Some(read) = &pools.read {
                    sqlx::query("SELECT 1").execute(read).await?;
                }
                Ok(())
            }
            #[cfg(not(any(feature = "database-sqlite", feature = "database-postgres")))]
            PoolStorage::_None(infallible) => match *infallible {},
        }
    }
}

#[cfg(feature = "database-postgres")]
async fn connect_postgres(cfg: &crate::config::PostgresConfig, url: &str) -> DbResult<sqlx::PgPool> {
    let mut options: sqlx::postgres::PgConnectOptions = url.parse()?;
    if let Some(mode) = cfg.ssl_mode {
        options = options.ssl_mode(mode.into());
    }
    let pool = sqlx::postgres::PgPoolOptions::new()
        .min_connections(cfg.min_connections)
        .max_connections(cfg.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(cfg.connect_timeout_secs))
        .idle_timeout(std::time::Duration::from_secs(cfg.idle_timeout_secs))
        .connect_with(options)
        .await?;
    Ok(pool)
}
