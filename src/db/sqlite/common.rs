use uuid::Uuid;

use crate::db::error::{DbError, DbResult};

/// Parse a UUID string from the database, returning a DbError on failure
pub fn parse_uuid(s: &str) -> DbResult<Uuid> {
    Uuid::parse_str(s).map_err(|e| DbError::Internal(format!("Invalid UUID in database: {}", e)))
}

/// Translate constraint failures on insert.
///
/// A unique violation becomes [`DbError::Conflict`] naming `duplicate`. A
/// foreign key violation becomes [`DbError::Validation`] naming `references`;
/// SQLite does not report which key failed, so `references` covers all of them.
pub fn map_insert_error(e: sqlx::Error, duplicate: &str, references: Option<&str>) -> DbError {
    match e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            DbError::Conflict(format!("{} already exists", duplicate))
        }
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            DbError::Validation(format!(
                "Referenced {} does not exist",
                references.unwrap_or("row")
            ))
        }
        _ => DbError::from(e),
    }
}
