//! SQLite remote store
//!
//! Reads go straight to the repositories; every confirmed write is
//! published on the change feed.

use super::{
    ChangeFeed, ChangeSubscription, RemoteError, RemoteResult, RemoteStore, from_transaction_write,
};
use crate::db::DbService;
use crate::db::repository::{customer, transaction};
use async_trait::async_trait;
use chrono::NaiveDate;
use shared::models::{Customer, CustomerDraft, RouteDay, Transaction, TransactionRecord};
use shared::{ChangeEvent, ChangeFilter, ChangeKind, ChangeTable};

#[derive(Clone)]
pub struct SqliteRemote {
    db: DbService,
    feed: ChangeFeed,
}

impl SqliteRemote {
    pub fn new(db: DbService, feed_capacity: usize) -> Self {
        Self {
            db,
            feed: ChangeFeed::new(feed_capacity),
        }
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    fn publish(&self, table: ChangeTable, kind: ChangeKind, id: i64) {
        self.feed.publish(ChangeEvent::new(table, kind, id));
    }
}

#[async_trait]
impl RemoteStore for SqliteRemote {
    async fn customers_by_day(&self, day: RouteDay) -> RemoteResult<Vec<Customer>> {
        customer::find_by_day(&self.db.pool, day)
            .await
            .map_err(RemoteError::from_read)
    }

    async fn customer_by_id(&self, id: i64) -> RemoteResult<Option<Customer>> {
        customer::find_by_id(&self.db.pool, id)
            .await
            .map_err(RemoteError::from_read)
    }

    async fn customers_by_ids(&self, ids: &[i64]) -> RemoteResult<Vec<Customer>> {
        customer::find_by_ids(&self.db.pool, ids)
            .await
            .map_err(RemoteError::from_read)
    }

    async fn all_customers(&self) -> RemoteResult<Vec<Customer>> {
        customer::find_all(&self.db.pool)
            .await
            .map_err(RemoteError::from_read)
    }

    async fn transactions_for(&self, customer_ids: &[i64]) -> RemoteResult<Vec<Transaction>> {
        transaction::find_by_customers(&self.db.pool, customer_ids)
            .await
            .map_err(RemoteError::from_read)
    }

    async fn transactions_on(&self, date: NaiveDate) -> RemoteResult<Vec<Transaction>> {
        transaction::find_on_date(&self.db.pool, date)
            .await
            .map_err(RemoteError::from_read)
    }

    async fn all_transactions(&self) -> RemoteResult<Vec<Transaction>> {
        transaction::find_all(&self.db.pool)
            .await
            .map_err(RemoteError::from_read)
    }

    async fn insert_customer(&self, data: &CustomerDraft) -> RemoteResult<Customer> {
        let created = customer::create(&self.db.pool, data)
            .await
            .map_err(RemoteError::from_write)?;
        self.publish(ChangeTable::Customers, ChangeKind::Insert, created.id);
        Ok(created)
    }

    async fn update_customer(&self, id: i64, data: &CustomerDraft) -> RemoteResult<Customer> {
        let updated = customer::update(&self.db.pool, id, data)
            .await
            .map_err(RemoteError::from_write)?;
        self.publish(ChangeTable::Customers, ChangeKind::Update, id);
        Ok(updated)
    }

    async fn insert_transaction(&self, data: &TransactionRecord) -> RemoteResult<Transaction> {
        let created = transaction::create(&self.db.pool, data)
            .await
            .map_err(|e| from_transaction_write(e, data.customer_id))?;
        self.publish(ChangeTable::Transactions, ChangeKind::Insert, created.id);
        Ok(created)
    }

    async fn update_transaction(
        &self,
        id: i64,
        data: &TransactionRecord,
    ) -> RemoteResult<Transaction> {
        let updated = transaction::update(&self.db.pool, id, data)
            .await
            .map_err(|e| from_transaction_write(e, data.customer_id))?;
        self.publish(ChangeTable::Transactions, ChangeKind::Update, id);
        Ok(updated)
    }

    fn subscribe(&self, filter: ChangeFilter) -> ChangeSubscription {
        self.feed.subscribe(filter)
    }
}
