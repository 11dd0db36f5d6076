use thiserror::Error;

use crate::{db::DbError, models::ScopeError};

/// Errors surfaced by the usage engine to its callers.
///
/// Store failures other than not-found and validation carry no detail; the
/// underlying error is logged where it is converted.
#[derive(Debug, Error)]
pub enum UsageError {
    #[error("Not found")]
    NotFound,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Data access error")]
    DataAccess,
}

impl UsageError {
    /// HTTP status a transport layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            UsageError::NotFound => 404,
            UsageError::BadRequest(_) => 400,
            UsageError::DataAccess => 500,
        }
    }
}

impl From<DbError> for UsageError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound => UsageError::NotFound,
            DbError::Validation(msg) => UsageError::BadRequest(msg),
            _ => {
                tracing::error!(error = %err, "Usage data access failed");
                UsageError::DataAccess
            }
        }
    }
}

impl From<ScopeError> for UsageError {
    fn from(err: ScopeError) -> Self {
        UsageError::BadRequest(err.to_string())
    }
}

pub type UsageResult<T> = Result<T, UsageError>;
