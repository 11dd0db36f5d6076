use crate::db::error::DbError;

/// Translate constraint failures on insert.
///
/// A unique violation becomes [`DbError::Conflict`] naming `duplicate`. A
/// foreign key violation becomes [`DbError::Validation`]; the failing
/// constraint (`<table>_<column>_fkey`) decides which of `references` is
/// reported.
pub fn map_insert_error(e: sqlx::Error, duplicate: &str, references: &[&str]) -> DbError {
    match e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            DbError::Conflict(format!("{} already exists", duplicate))
        }
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            let missing = db_err
                .constraint()
                .and_then(|c| references.iter().find(|r| c.contains(*r)))
                .map(|r| r.to_string())
                .unwrap_or_else(|| references.join(" or "));
            DbError::Validation(format!("Referenced {} does not exist", missing))
        }
        _ => DbError::from(e),
    }
}
