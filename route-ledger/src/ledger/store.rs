//! Entity Store
//!
//! Holds the customers and transactions of the active route day. The store
//! is only ever replaced wholesale by a completed fetch; writes go straight
//! to the remote store and the caller re-fetches the scope afterwards.

use super::error::{LedgerError, LedgerResult};
use super::view::{CustomerStatement, DailyCollection, RouteView, SearchFilter};
use crate::remote::{RemoteError, RemoteStore};
use chrono::NaiveDate;
use shared::ErrorCode;
use shared::models::{
    AmountInput, Customer, CustomerDraft, RouteDay, Transaction, TransactionDraft,
};
use std::sync::Arc;

/// Result of one scope fetch: a day's customers and their transactions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeData {
    pub day: RouteDay,
    pub customers: Vec<Customer>,
    pub transactions: Vec<Transaction>,
}

/// Fetch customers of `day` then the transactions they own
///
/// The two reads are not atomic; a customer may appear whose transactions
/// were written after the second read started.
pub async fn fetch_scope(remote: &dyn RemoteStore, day: RouteDay) -> LedgerResult<ScopeData> {
    let customers = remote.customers_by_day(day).await?;
    let transactions = fetch_transactions(remote, &customers).await?;
    Ok(ScopeData {
        day,
        customers,
        transactions,
    })
}

async fn fetch_transactions(
    remote: &dyn RemoteStore,
    customers: &[Customer],
) -> LedgerResult<Vec<Transaction>> {
    if customers.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i64> = customers.iter().map(|c| c.id).collect();
    Ok(remote.transactions_for(&ids).await?)
}

/// Create / update operations against the remote store
#[derive(Clone)]
pub struct LedgerWriter {
    remote: Arc<dyn RemoteStore>,
}

impl LedgerWriter {
    pub fn new(remote: Arc<dyn RemoteStore>) -> Self {
        Self { remote }
    }

    /// Create when `id` is `None`, otherwise replace the customer's fields
    pub async fn upsert_customer(
        &self,
        draft: CustomerDraft,
        id: Option<i64>,
    ) -> LedgerResult<Customer> {
        let draft = draft.normalized();
        if draft.name.is_empty() {
            return Err(LedgerError::validation(
                ErrorCode::CustomerNameRequired,
                "Customer name is required",
            ));
        }

        let customer = match id {
            None => self.remote.insert_customer(&draft).await?,
            Some(id) => self
                .remote
                .update_customer(id, &draft)
                .await
                .map_err(|e| match e {
                    RemoteError::NotFound(_) => LedgerError::customer_not_found(id),
                    other => other.into(),
                })?,
        };
        tracing::info!(id = customer.id, day = %customer.route_day, created = id.is_none(), "Customer saved");
        Ok(customer)
    }

    /// Create when `id` is `None`, otherwise replace the transaction's fields
    ///
    /// Amounts are coerced: non-numeric input becomes zero, negatives become zero.
    pub async fn upsert_transaction(
        &self,
        draft: &TransactionDraft,
        id: Option<i64>,
    ) -> LedgerResult<Transaction> {
        let record = draft.normalize();
        let transaction = match id {
            None => self.remote.insert_transaction(&record).await?,
            Some(id) => self
                .remote
                .update_transaction(id, &record)
                .await
                .map_err(|e| match e {
                    RemoteError::NotFound(_) => LedgerError::transaction_not_found(id),
                    other => other.into(),
                })?,
        };
        tracing::info!(
            id = transaction.id,
            customer_id = transaction.customer_id,
            total = %transaction.total_amount,
            paid = %transaction.paid_amount,
            created = id.is_none(),
            "Transaction saved"
        );
        Ok(transaction)
    }

    /// New bill with a total and an optional amount paid up front
    pub async fn record_bill(
        &self,
        customer_id: i64,
        bill_no: &str,
        date: NaiveDate,
        total: impl Into<AmountInput>,
        paid: impl Into<AmountInput>,
    ) -> LedgerResult<Transaction> {
        let draft = TransactionDraft::bill(customer_id, bill_no, date, total, paid);
        self.upsert_transaction(&draft, None).await
    }

    /// Money received without a new invoice
    pub async fn receive_payment(
        &self,
        customer_id: i64,
        date: NaiveDate,
        amount: impl Into<AmountInput>,
    ) -> LedgerResult<Transaction> {
        let draft = TransactionDraft::payment(customer_id, date, amount);
        self.upsert_transaction(&draft, None).await
    }
}

/// In-memory collections for the active route day
pub struct EntityStore {
    remote: Arc<dyn RemoteStore>,
    scope: ScopeData,
}

impl EntityStore {
    pub fn new(remote: Arc<dyn RemoteStore>, day: RouteDay) -> Self {
        Self {
            remote,
            scope: ScopeData {
                day,
                ..ScopeData::default()
            },
        }
    }

    pub fn day(&self) -> RouteDay {
        self.scope.day
    }

    pub fn customers(&self) -> &[Customer] {
        &self.scope.customers
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.scope.transactions
    }

    pub fn scope(&self) -> &ScopeData {
        &self.scope
    }

    pub fn writer(&self) -> LedgerWriter {
        LedgerWriter::new(self.remote.clone())
    }

    /// Fetch the customers of `day` (serial order) and make `day` the active scope
    ///
    /// On failure the store keeps its previous contents.
    pub async fn load_route(&mut self, day: RouteDay) -> LedgerResult<&[Customer]> {
        let customers = self.remote.customers_by_day(day).await.inspect_err(|e| {
            tracing::warn!(day = %day, error = %e, "Route load failed, keeping previous data");
        })?;
        if day != self.scope.day {
            self.scope.transactions.clear();
        }
        self.scope.day = day;
        self.scope.customers = customers;
        Ok(&self.scope.customers)
    }

    /// Fetch the transactions owned by `customer_ids`; an empty set makes no remote call
    pub async fn load_transactions_for(
        &mut self,
        customer_ids: &[i64],
    ) -> LedgerResult<&[Transaction]> {
        let transactions = if customer_ids.is_empty() {
            Vec::new()
        } else {
            self.remote.transactions_for(customer_ids).await?
        };
        self.scope.transactions = transactions;
        Ok(&self.scope.transactions)
    }

    /// Full re-fetch of the active scope; applied only if both reads succeed
    pub async fn refresh(&mut self) -> LedgerResult<()> {
        let data = fetch_scope(self.remote.as_ref(), self.scope.day).await?;
        self.apply(data);
        Ok(())
    }

    /// Replace the scope with a completed fetch
    pub fn apply(&mut self, data: ScopeData) {
        tracing::debug!(
            day = %data.day,
            customers = data.customers.len(),
            transactions = data.transactions.len(),
            "Scope applied"
        );
        self.scope = data;
    }

    pub async fn upsert_customer(
        &self,
        draft: CustomerDraft,
        id: Option<i64>,
    ) -> LedgerResult<Customer> {
        self.writer().upsert_customer(draft, id).await
    }

    pub async fn upsert_transaction(
        &self,
        draft: &TransactionDraft,
        id: Option<i64>,
    ) -> LedgerResult<Transaction> {
        self.writer().upsert_transaction(draft, id).await
    }

    /// One customer's full history, whatever the active route day
    pub async fn statement(&self, customer_id: i64) -> LedgerResult<CustomerStatement> {
        let customer = self
            .remote
            .customer_by_id(customer_id)
            .await?
            .ok_or_else(|| LedgerError::customer_not_found(customer_id))?;
        let transactions = self.remote.transactions_for(&[customer_id]).await?;
        Ok(CustomerStatement::build(customer, &transactions))
    }

    /// Payments received on `date` across every route day
    pub async fn daily_collection(&self, date: NaiveDate) -> LedgerResult<DailyCollection> {
        let transactions = self.remote.transactions_on(date).await?;
        let mut owners: Vec<i64> = transactions.iter().map(|t| t.customer_id).collect();
        owners.sort_unstable();
        owners.dedup();
        let customers = self.remote.customers_by_ids(&owners).await?;
        Ok(DailyCollection::build(date, &transactions, &customers))
    }

    pub fn view(&self, filter: &SearchFilter) -> RouteView {
        RouteView::build(
            self.scope.day,
            &self.scope.customers,
            &self.scope.transactions,
            filter,
        )
    }
}
