use thiserror::Error;

/// Errors raised by the repositories.
#[derive(Debug, Error)]
pub enum DbError {
    /// `[database]` is absent or `type = "none"`.
    #[error("Database not configured")]
    NotConfigured,

    /// The addressed row does not exist (or is archived, for usage logs).
    #[error("Not found")]
    NotFound,

    /// A unique key is already taken.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The write was refused: a dangling reference or a duration overflow.
    #[error("Validation error: {0}")]
    Validation(String),

    #[cfg(any(feature = "database-sqlite", feature = "database-postgres"))]
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[cfg(any(feature = "database-sqlite", feature = "database-postgres"))]
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Stored data could not be decoded.
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type DbResult<T> = Result<T, DbError>;
