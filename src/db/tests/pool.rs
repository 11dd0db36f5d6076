//! Tests for opening and probing a [`DbPool`].

use crate::{
    config::DatabaseConfig,
    db::{DbError, DbPool},
};

#[tokio::test]
async fn test_from_config_without_database_is_not_configured() {
    let result = DbPool::from_config(&DatabaseConfig::None).await;
    assert!(matches!(result, Err(DbError::NotConfigured)));
}

#[cfg(feature = "database-sqlite")]
mod sqlite {
    use super::*;
    use crate::db::tests::harness::{migrated_file_db, migrated_sqlite_pool};

    #[tokio::test]
    async fn test_health_check_in_memory() {
        let db = DbPool::from_sqlite(migrated_sqlite_pool().await);
        db.health_check().await.expect("healthy pool");
    }

    #[tokio::test]
    async fn test_file_database_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let db = migrated_file_db(dir.path()).await;

        db.health_check().await.expect("healthy pool");
        assert!(dir.path().join("usage.db").exists());

        // Migrations are idempotent
        db.run_migrations().await.expect("second migration run");
    }

    #[tokio::test]
    async fn test_health_check_fails_after_close() {
        let pool = migrated_sqlite_pool().await;
        let db = DbPool::from_sqlite(pool.clone());
        pool.close().await;

        let result = db.health_check().await;
        assert!(matches!(result, Err(DbError::Sqlx(_))));
    }
}

#[cfg(feature = "database-postgres")]
mod postgres {
    use super::*;
    use crate::db::tests::harness::postgres::migrated_postgres_pool;

    #[tokio::test]
    #[ignore = "Requires Docker - run with `cargo test -- --ignored`"]
    async fn test_health_check_with_read_pool() {
        let pool = migrated_postgres_pool().await;
        let db = DbPool::from_postgres(pool.clone(), Some(pool));
        db.health_check().await.expect("healthy pools");
    }
}
