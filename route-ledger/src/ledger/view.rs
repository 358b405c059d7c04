//! Derived views
//!
//! Read models built from the Entity Store's collections by the balance
//! functions. Nothing here talks to the remote store.

use super::balance;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use shared::models::{Customer, RouteDay, Transaction};
use std::collections::HashMap;

/// Name / mobile search predicate
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    term: String,
}

impl SearchFilter {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into().trim().to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.term.is_empty()
    }

    /// Case-insensitive substring of the name, or substring of the mobile
    pub fn matches(&self, customer: &Customer) -> bool {
        if self.term.is_empty() {
            return true;
        }
        customer
            .name
            .to_lowercase()
            .contains(&self.term.to_lowercase())
            || customer
                .mobile
                .as_deref()
                .is_some_and(|m| m.contains(&self.term))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerRow {
    pub customer: Customer,
    pub pending: Decimal,
}

/// One route day's customers with their balances
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RouteView {
    pub day: RouteDay,
    /// Rows passing the search filter, in serial order
    pub rows: Vec<CustomerRow>,
    /// Pending over every customer of the day
    pub total_pending: Decimal,
    /// Pending over the filtered rows only
    pub visible_pending: Decimal,
}

impl RouteView {
    pub fn build(
        day: RouteDay,
        customers: &[Customer],
        transactions: &[Transaction],
        filter: &SearchFilter,
    ) -> Self {
        let pending = balance::pending_by_customer(transactions);
        let pending_of = |c: &Customer| pending.get(&c.id).copied().unwrap_or(Decimal::ZERO);

        let rows: Vec<CustomerRow> = customers
            .iter()
            .filter(|c| filter.matches(c))
            .map(|c| CustomerRow {
                customer: c.clone(),
                pending: pending_of(c),
            })
            .collect();

        Self {
            day,
            total_pending: customers.iter().map(pending_of).sum(),
            visible_pending: rows.iter().map(|r| r.pending).sum(),
            rows,
        }
    }

    /// Customers visible after filtering
    pub fn count(&self) -> usize {
        self.rows.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementLine {
    pub transaction: Transaction,
    pub balance: Decimal,
}

/// One customer's history, newest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerStatement {
    pub customer: Customer,
    pub lines: Vec<StatementLine>,
    pub pending: Decimal,
}

impl CustomerStatement {
    pub fn build(customer: Customer, transactions: &[Transaction]) -> Self {
        let mut owned: Vec<&Transaction> = transactions
            .iter()
            .filter(|t| t.customer_id == customer.id)
            .collect();
        owned.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));

        let lines = owned
            .into_iter()
            .map(|t| StatementLine {
                balance: t.balance(),
                transaction: t.clone(),
            })
            .collect();
        let pending = balance::pending_for(customer.id, transactions);
        Self {
            customer,
            lines,
            pending,
        }
    }

    /// Most recent entry ("last bill")
    pub fn last_entry(&self) -> Option<&Transaction> {
        self.lines.first().map(|l| &l.transaction)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionLine {
    pub customer_id: i64,
    pub customer_name: String,
    pub bill_no: String,
    pub paid_amount: Decimal,
}

/// Money received on one calendar day, across all routes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCollection {
    pub date: NaiveDate,
    pub lines: Vec<CollectionLine>,
    pub total: Decimal,
}

pub const UNKNOWN_CUSTOMER: &str = "Unknown";

impl DailyCollection {
    pub fn build(date: NaiveDate, transactions: &[Transaction], customers: &[Customer]) -> Self {
        let names: HashMap<i64, &str> = customers.iter().map(|c| (c.id, c.name.as_str())).collect();
        let lines = transactions
            .iter()
            .filter(|t| t.date == date && t.paid_amount > Decimal::ZERO)
            .map(|t| CollectionLine {
                customer_id: t.customer_id,
                customer_name: names
                    .get(&t.customer_id)
                    .copied()
                    .unwrap_or(UNKNOWN_CUSTOMER)
                    .to_string(),
                bill_no: t.bill_no.clone(),
                paid_amount: t.paid_amount,
            })
            .collect();
        Self {
            date,
            lines,
            total: balance::collected_on(date, transactions),
        }
    }
}
