//! Remote data interface
//!
//! The durable owner of record for customers and transactions. The engine
//! only talks to it through [`RemoteStore`]: equality / membership filters,
//! sorted reads, insert, update-by-id and a filtered change feed.
//!
//! - [`SqliteRemote`] - SQLite backed store (sqlx)
//! - [`MemoryRemote`] - in-process store with fault switches

pub mod feed;
pub mod memory;
pub mod sqlite;

pub use feed::{ChangeFeed, ChangeSubscription, FeedSignal};
pub use memory::MemoryRemote;
pub use sqlite::SqliteRemote;

use crate::db::repository::RepoError;
use async_trait::async_trait;
use chrono::NaiveDate;
use shared::ChangeFilter;
use shared::models::{Customer, CustomerDraft, RouteDay, Transaction, TransactionRecord};
use thiserror::Error;

/// Remote store errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// The store could not be reached or a read failed
    #[error("remote store unavailable: {0}")]
    Unavailable(String),

    /// A create / update was refused
    #[error("remote write rejected: {0}")]
    Rejected(String),

    /// A transaction write named a customer the store does not hold
    #[error("customer {0} does not exist")]
    OwnerMissing(i64),

    #[error("not found: {0}")]
    NotFound(String),
}

impl RemoteError {
    /// Classify a repository error raised by a read
    pub fn from_read(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => RemoteError::NotFound(msg),
            RepoError::Database(msg) | RepoError::ForeignKey(msg) | RepoError::Corrupt(msg) => {
                RemoteError::Unavailable(msg)
            }
        }
    }

    /// Classify a repository error raised by a write
    pub fn from_write(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => RemoteError::NotFound(msg),
            RepoError::Database(msg) | RepoError::ForeignKey(msg) | RepoError::Corrupt(msg) => {
                RemoteError::Rejected(msg)
            }
        }
    }
}

/// Transaction writes: a foreign key failure means the owner is missing
fn from_transaction_write(err: RepoError, customer_id: i64) -> RemoteError {
    match err {
        RepoError::ForeignKey(_) => RemoteError::OwnerMissing(customer_id),
        other => RemoteError::from_write(other),
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Query / command / subscribe interface over `customers` and `transactions`
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Customers of one route day, serial ascending, ties by id
    async fn customers_by_day(&self, day: RouteDay) -> RemoteResult<Vec<Customer>>;

    async fn customer_by_id(&self, id: i64) -> RemoteResult<Option<Customer>>;

    async fn customers_by_ids(&self, ids: &[i64]) -> RemoteResult<Vec<Customer>>;

    async fn all_customers(&self) -> RemoteResult<Vec<Customer>>;

    /// Transactions whose owner is in `customer_ids`
    async fn transactions_for(&self, customer_ids: &[i64]) -> RemoteResult<Vec<Transaction>>;

    async fn transactions_on(&self, date: NaiveDate) -> RemoteResult<Vec<Transaction>>;

    async fn all_transactions(&self) -> RemoteResult<Vec<Transaction>>;

    async fn insert_customer(&self, data: &CustomerDraft) -> RemoteResult<Customer>;

    async fn update_customer(&self, id: i64, data: &CustomerDraft) -> RemoteResult<Customer>;

    async fn insert_transaction(&self, data: &TransactionRecord) -> RemoteResult<Transaction>;

    async fn update_transaction(
        &self,
        id: i64,
        data: &TransactionRecord,
    ) -> RemoteResult<Transaction>;

    /// Subscribe to confirmed changes matching `filter`; dropping the
    /// subscription unsubscribes
    fn subscribe(&self, filter: ChangeFilter) -> ChangeSubscription;
}
