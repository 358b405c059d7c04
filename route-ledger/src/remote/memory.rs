//! In-process remote store
//!
//! Same contract as [`SqliteRemote`](super::SqliteRemote), kept in memory.
//! Switches simulate an unreachable store, rejected writes and slow
//! per-route-day reads.

use super::{ChangeFeed, ChangeSubscription, RemoteError, RemoteResult, RemoteStore};
use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use shared::models::{Customer, CustomerDraft, RouteDay, Transaction, TransactionRecord};
use shared::{ChangeEvent, ChangeFilter, ChangeKind, ChangeTable};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Default)]
struct Tables {
    customers: BTreeMap<i64, Customer>,
    transactions: BTreeMap<i64, Transaction>,
}

pub struct MemoryRemote {
    tables: Mutex<Tables>,
    feed: ChangeFeed,
    next_id: AtomicI64,
    offline: AtomicBool,
    reject_writes: AtomicBool,
    day_latency: Mutex<HashMap<RouteDay, Duration>>,
    customer_fetches: AtomicUsize,
    transaction_fetches: AtomicUsize,
}

impl MemoryRemote {
    pub fn new(feed_capacity: usize) -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            feed: ChangeFeed::new(feed_capacity),
            next_id: AtomicI64::new(1),
            offline: AtomicBool::new(false),
            reject_writes: AtomicBool::new(false),
            day_latency: Mutex::new(HashMap::new()),
            customer_fetches: AtomicUsize::new(0),
            transaction_fetches: AtomicUsize::new(0),
        }
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    /// Every read fails with `Unavailable`, every write with `Rejected`
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Writes fail with `Rejected`; reads still succeed
    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Delay `customers_by_day(day)` by `latency`
    pub fn set_day_latency(&self, day: RouteDay, latency: Duration) {
        self.day_latency.lock().insert(day, latency);
    }

    /// Number of `customers_by_day` calls served so far
    pub fn customer_fetches(&self) -> usize {
        self.customer_fetches.load(Ordering::SeqCst)
    }

    /// Number of `transactions_for` calls served so far
    pub fn transaction_fetches(&self) -> usize {
        self.transaction_fetches.load(Ordering::SeqCst)
    }

    pub fn customer_count(&self) -> usize {
        self.tables.lock().customers.len()
    }

    pub fn transaction_count(&self) -> usize {
        self.tables.lock().transactions.len()
    }

    fn check_read(&self) -> RemoteResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("store offline".into()));
        }
        Ok(())
    }

    fn check_write(&self) -> RemoteResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RemoteError::Rejected("store offline".into()));
        }
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(RemoteError::Rejected("write refused".into()));
        }
        Ok(())
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn publish(&self, table: ChangeTable, kind: ChangeKind, id: i64) {
        self.feed.publish(ChangeEvent::new(table, kind, id));
    }
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new(256)
    }
}

fn build_customer(id: i64, data: &CustomerDraft) -> Customer {
    Customer {
        id,
        serial_no: data.serial_no,
        name: data.name.clone(),
        mobile: data.mobile.clone(),
        route_day: data.route_day,
    }
}

fn build_transaction(id: i64, data: &TransactionRecord) -> Transaction {
    Transaction {
        id,
        customer_id: data.customer_id,
        bill_no: data.bill_no.clone(),
        date: data.date,
        total_amount: data.total_amount,
        paid_amount: data.paid_amount,
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn customers_by_day(&self, day: RouteDay) -> RemoteResult<Vec<Customer>> {
        self.customer_fetches.fetch_add(1, Ordering::SeqCst);
        let latency = self.day_latency.lock().get(&day).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        self.check_read()?;

        let mut rows: Vec<Customer> = self
            .tables
            .lock()
            .customers
            .values()
            .filter(|c| c.route_day == day)
            .cloned()
            .collect();
        rows.sort_by_key(|c| (c.serial_no, c.id));
        Ok(rows)
    }

    async fn customer_by_id(&self, id: i64) -> RemoteResult<Option<Customer>> {
        self.check_read()?;
        Ok(self.tables.lock().customers.get(&id).cloned())
    }

    async fn customers_by_ids(&self, ids: &[i64]) -> RemoteResult<Vec<Customer>> {
        self.check_read()?;
        let tables = self.tables.lock();
        let wanted: HashSet<i64> = ids.iter().copied().collect();
        Ok(tables
            .customers
            .values()
            .filter(|c| wanted.contains(&c.id))
            .cloned()
            .collect())
    }

    async fn all_customers(&self) -> RemoteResult<Vec<Customer>> {
        self.check_read()?;
        Ok(self.tables.lock().customers.values().cloned().collect())
    }

    async fn transactions_for(&self, customer_ids: &[i64]) -> RemoteResult<Vec<Transaction>> {
        self.transaction_fetches.fetch_add(1, Ordering::SeqCst);
        self.check_read()?;
        let owners: HashSet<i64> = customer_ids.iter().copied().collect();
        let mut rows: Vec<Transaction> = self
            .tables
            .lock()
            .transactions
            .values()
            .filter(|t| owners.contains(&t.customer_id))
            .cloned()
            .collect();
        rows.sort_by_key(|t| (t.date, t.id));
        Ok(rows)
    }

    async fn transactions_on(&self, date: NaiveDate) -> RemoteResult<Vec<Transaction>> {
        self.check_read()?;
        Ok(self
            .tables
            .lock()
            .transactions
            .values()
            .filter(|t| t.date == date)
            .cloned()
            .collect())
    }

    async fn all_transactions(&self) -> RemoteResult<Vec<Transaction>> {
        self.check_read()?;
        Ok(self.tables.lock().transactions.values().cloned().collect())
    }

    async fn insert_customer(&self, data: &CustomerDraft) -> RemoteResult<Customer> {
        self.check_write()?;
        let customer = build_customer(self.next_id(), data);
        self.tables
            .lock()
            .customers
            .insert(customer.id, customer.clone());
        self.publish(ChangeTable::Customers, ChangeKind::Insert, customer.id);
        Ok(customer)
    }

    async fn update_customer(&self, id: i64, data: &CustomerDraft) -> RemoteResult<Customer> {
        self.check_write()?;
        let customer = {
            let mut tables = self.tables.lock();
            let slot = tables
                .customers
                .get_mut(&id)
                .ok_or_else(|| RemoteError::NotFound(format!("Customer {id} not found")))?;
            *slot = build_customer(id, data);
            slot.clone()
        };
        self.publish(ChangeTable::Customers, ChangeKind::Update, id);
        Ok(customer)
    }

    async fn insert_transaction(&self, data: &TransactionRecord) -> RemoteResult<Transaction> {
        self.check_write()?;
        let transaction = {
            let mut tables = self.tables.lock();
            if !tables.customers.contains_key(&data.customer_id) {
                return Err(RemoteError::OwnerMissing(data.customer_id));
            }
            let transaction = build_transaction(self.next_id(), data);
            tables
                .transactions
                .insert(transaction.id, transaction.clone());
            transaction
        };
        self.publish(ChangeTable::Transactions, ChangeKind::Insert, transaction.id);
        Ok(transaction)
    }

    async fn update_transaction(
        &self,
        id: i64,
        data: &TransactionRecord,
    ) -> RemoteResult<Transaction> {
        self.check_write()?;
        let transaction = {
            let mut tables = self.tables.lock();
            if !tables.customers.contains_key(&data.customer_id) {
                return Err(RemoteError::OwnerMissing(data.customer_id));
            }
            let slot = tables
                .transactions
                .get_mut(&id)
                .ok_or_else(|| RemoteError::NotFound(format!("Transaction {id} not found")))?;
            *slot = build_transaction(id, data);
            slot.clone()
        };
        self.publish(ChangeTable::Transactions, ChangeKind::Update, id);
        Ok(transaction)
    }

    fn subscribe(&self, filter: ChangeFilter) -> ChangeSubscription {
        self.feed.subscribe(filter)
    }
}
