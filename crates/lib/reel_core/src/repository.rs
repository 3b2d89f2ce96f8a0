//! Relational store error classification.
//!
//! Driver errors are classified once, where they surface, so services and the
//! HTTP layer never inspect error text.

use thiserror::Error;

/// Repository errors, classified by kind.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid reference: {0}")]
    InvalidReference(String),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("row not found".into()),
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                RepositoryError::Conflict(db.constraint().unwrap_or("unique").to_string())
            }
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                RepositoryError::InvalidReference(
                    db.constraint().unwrap_or("foreign key").to_string(),
                )
            }
            other => RepositoryError::Database(other),
        }
    }
}
