//! Snapshot export / import (备份 / 恢复) and the balance report
//!
//! Both directions work on the full remote data set and ignore the active
//! route day.
//!
//! Import is additive only: every record is created anew, never matched
//! against existing rows, so importing the same snapshot twice duplicates
//! it. Transactions whose owner was imported from the same snapshot are
//! re-pointed at the owner's new id; those whose owner failed to import are
//! skipped and reported.

use super::balance;
use super::error::{LedgerError, LedgerResult};
use super::store::LedgerWriter;
use crate::remote::RemoteStore;
use chrono::{NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use shared::models::{
    Customer, CustomerDraft, ImportIssue, ImportSummary, ReportRow, Snapshot, SnapshotSection,
    Transaction, TransactionDraft,
};
use shared::ErrorCode;
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::sync::Arc;

const CUSTOMER_KEYS: &[&str] = &["customers"];
const TRANSACTION_KEYS: &[&str] = &["transactions", "bills"];

/// `backup_<YYYY-MM-DD>.json`
pub fn backup_file_name(date: NaiveDate) -> String {
    format!("backup_{}.json", date.format("%Y-%m-%d"))
}

/// `Route_Report_<YYYY-MM-DD>.csv`
pub fn report_file_name(date: NaiveDate) -> String {
    format!("Route_Report_{}.csv", date.format("%Y-%m-%d"))
}

/// One report row per customer, in the order given
pub fn export_report(customers: &[Customer], transactions: &[Transaction]) -> Vec<ReportRow> {
    let pending = balance::pending_by_customer(transactions);
    customers
        .iter()
        .map(|c| ReportRow {
            serial_no: c.serial_no,
            name: c.name.clone(),
            mobile: c.mobile.clone(),
            route_day: c.route_day,
            pending: pending.get(&c.id).copied().unwrap_or_default(),
        })
        .collect()
}

/// Write report rows as CSV (`Serial,Name,Mobile,Route,Pending`)
pub fn write_report_csv<W: Write>(rows: &[ReportRow], writer: W) -> LedgerResult<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    // Always write header, even with zero rows
    if rows.is_empty() {
        csv_writer
            .write_record(["Serial", "Name", "Mobile", "Route", "Pending"])
            .map_err(|e| LedgerError::Export(format!("CSV write error: {e}")))?;
    }
    for row in rows {
        csv_writer
            .serialize(row)
            .map_err(|e| LedgerError::Export(format!("CSV write error: {e}")))?;
    }
    csv_writer
        .flush()
        .map_err(|e| LedgerError::Export(format!("CSV flush error: {e}")))?;
    Ok(())
}

pub fn write_snapshot<W: Write>(snapshot: &Snapshot, writer: W) -> LedgerResult<()> {
    serde_json::to_writer_pretty(writer, snapshot)
        .map_err(|e| LedgerError::Export(format!("Snapshot write error: {e}")))
}

/// Backup, restore and reporting over the full data set
#[derive(Clone)]
pub struct SnapshotService {
    remote: Arc<dyn RemoteStore>,
    writer: LedgerWriter,
}

impl SnapshotService {
    pub fn new(remote: Arc<dyn RemoteStore>) -> Self {
        Self {
            writer: LedgerWriter::new(remote.clone()),
            remote,
        }
    }

    /// Full unfiltered dump of both collections
    pub async fn export_snapshot(&self) -> LedgerResult<Snapshot> {
        let customers = self.remote.all_customers().await?;
        let transactions = self.remote.all_transactions().await?;
        tracing::info!(
            customers = customers.len(),
            transactions = transactions.len(),
            "Snapshot exported"
        );
        Ok(Snapshot {
            customers,
            transactions,
            generated_at: Utc::now(),
        })
    }

    /// Report rows for every customer, ordered by route day then serial
    pub async fn full_report(&self) -> LedgerResult<Vec<ReportRow>> {
        let mut customers = self.remote.all_customers().await?;
        let transactions = self.remote.all_transactions().await?;
        customers.sort_by_key(|c| (c.route_day, c.serial_no, c.id));
        Ok(export_report(&customers, &transactions))
    }

    /// Import a snapshot file's raw bytes
    pub async fn import_bytes(&self, bytes: &[u8]) -> LedgerResult<ImportSummary> {
        let document: Value = serde_json::from_slice(bytes)
            .map_err(|e| LedgerError::MalformedSnapshot(format!("not valid JSON: {e}")))?;
        self.import_snapshot(&document).await
    }

    /// Create every customer and transaction in `document` as new records
    ///
    /// The top-level shape is checked before anything is written. A missing
    /// or `null` section counts as empty. Records that cannot be read or
    /// that the store refuses are reported in [`ImportSummary::errors`] and
    /// the import carries on.
    pub async fn import_snapshot(&self, document: &Value) -> LedgerResult<ImportSummary> {
        let doc = document.as_object().ok_or_else(|| {
            LedgerError::MalformedSnapshot(format!(
                "snapshot must be a JSON object, got {}",
                json_kind(document)
            ))
        })?;
        let customers = section(doc, CUSTOMER_KEYS)?;
        let transactions = section(doc, TRANSACTION_KEYS)?;

        let mut summary = ImportSummary::default();
        // 旧 ID → 新 ID
        let mut remap: HashMap<i64, i64> = HashMap::new();
        // 导入失败的旧客户 ID，其账单不得挂到其他客户名下
        let mut rejected: HashSet<i64> = HashSet::new();

        for (index, raw) in customers.iter().enumerate() {
            let original_id = raw.get("id").and_then(Value::as_i64);
            let outcome = match parse_record::<CustomerDraft>(raw) {
                Ok(draft) => self
                    .writer
                    .upsert_customer(draft, None)
                    .await
                    .map_err(|e| (e.code(), e.to_string())),
                Err(message) => Err((ErrorCode::SnapshotRecordRejected, message)),
            };
            match outcome {
                Ok(created) => {
                    if let Some(old) = original_id {
                        remap.insert(old, created.id);
                    }
                    summary.customers_inserted += 1;
                }
                Err((code, message)) => {
                    rejected.extend(original_id);
                    summary.errors.push(ImportIssue {
                        section: SnapshotSection::Customers,
                        index,
                        original_id,
                        code,
                        message,
                    });
                }
            }
        }

        for (index, raw) in transactions.iter().enumerate() {
            let original_id = raw.get("id").and_then(Value::as_i64);
            let outcome = match parse_record::<TransactionDraft>(raw) {
                Ok(mut draft) => {
                    if let Some(&owner) = remap.get(&draft.customer_id) {
                        draft.customer_id = owner;
                        self.insert_transaction(&draft).await
                    } else if rejected.contains(&draft.customer_id) {
                        Err((
                            ErrorCode::SnapshotRecordRejected,
                            format!("owner customer {} was not imported", draft.customer_id),
                        ))
                    } else {
                        self.insert_transaction(&draft).await
                    }
                }
                Err(message) => Err((ErrorCode::SnapshotRecordRejected, message)),
            };
            match outcome {
                Ok(()) => summary.transactions_inserted += 1,
                Err((code, message)) => summary.errors.push(ImportIssue {
                    section: SnapshotSection::Transactions,
                    index,
                    original_id,
                    code,
                    message,
                }),
            }
        }

        if summary.is_clean() {
            tracing::info!(
                customers = summary.customers_inserted,
                transactions = summary.transactions_inserted,
                "Snapshot imported"
            );
        } else {
            tracing::warn!(
                customers = summary.customers_inserted,
                transactions = summary.transactions_inserted,
                errors = summary.errors.len(),
                "Snapshot imported with errors"
            );
        }
        Ok(summary)
    }

    async fn insert_transaction(&self, draft: &TransactionDraft) -> Result<(), (ErrorCode, String)> {
        self.writer
            .upsert_transaction(draft, None)
            .await
            .map(|_| ())
            .map_err(|e| (e.code(), e.to_string()))
    }
}

/// First present, non-null section under any of `keys`
fn section<'a>(doc: &'a Map<String, Value>, keys: &[&str]) -> LedgerResult<&'a [Value]> {
    for key in keys {
        match doc.get(*key) {
            None | Some(Value::Null) => continue,
            Some(Value::Array(items)) => return Ok(items),
            Some(other) => {
                return Err(LedgerError::MalformedSnapshot(format!(
                    "`{key}` must be an array, got {}",
                    json_kind(other)
                )));
            }
        }
    }
    Ok(&[])
}

/// Deserialize one record, letting `null` fields fall back to their defaults
fn parse_record<T: DeserializeOwned>(raw: &Value) -> Result<T, String> {
    let fields = raw
        .as_object()
        .ok_or_else(|| format!("record must be an object, got {}", json_kind(raw)))?;
    let cleaned: Map<String, Value> = fields
        .iter()
        .filter(|(key, value)| !value.is_null() && key.as_str() != "id")
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    serde_json::from_value(Value::Object(cleaned)).map_err(|e| e.to_string())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
