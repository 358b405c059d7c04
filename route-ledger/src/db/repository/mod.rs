//! Repository Module
//!
//! Free async CRUD functions over the SQLite pool, one module per table.

pub mod customer;
pub mod transaction;

use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    /// 外键约束失败 (transactions.customer_id)
    #[error("Foreign key violation: {0}")]
    ForeignKey(String),

    /// A stored value could not be decoded (bad date or amount text)
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepoError::NotFound("row".into()),
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                RepoError::ForeignKey(db.message().to_string())
            }
            other => RepoError::Database(other.to_string()),
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// `?, ?, ?` for an `IN (...)` clause with `n` bound values
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}
