//! Snapshot Model (备份 / 恢复)

use super::{Customer, Transaction};
use crate::error::ErrorCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Full unfiltered dump of both collections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub customers: Vec<Customer>,
    #[serde(alias = "bills")]
    pub transactions: Vec<Transaction>,
    #[serde(rename = "generatedAt", alias = "generated_at", alias = "date")]
    pub generated_at: DateTime<Utc>,
}

/// Which collection an import issue belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotSection {
    Customers,
    Transactions,
}

/// A snapshot record that could not be imported
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportIssue {
    pub section: SnapshotSection,
    /// Position of the record inside its section
    pub index: usize,
    /// Identity the record carried in the snapshot, if readable
    pub original_id: Option<i64>,
    pub code: ErrorCode,
    pub message: String,
}

/// Outcome of an additive import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub customers_inserted: usize,
    pub transactions_inserted: usize,
    pub errors: Vec<ImportIssue>,
}

impl ImportSummary {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}
