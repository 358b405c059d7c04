//! Transaction Repository
//!
//! Amounts are stored as canonical decimal text and dates as `YYYY-MM-DD`,
//! so rows are read into [`TransactionRow`] and decoded afterwards.

use super::{RepoError, RepoResult, placeholders};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use shared::models::{Transaction, TransactionRecord};
use sqlx::SqlitePool;
use std::str::FromStr;

const TRANSACTION_SELECT: &str =
    "SELECT id, customer_id, bill_no, date, total_amount, paid_amount FROM transactions";

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: i64,
    customer_id: i64,
    bill_no: String,
    date: String,
    total_amount: String,
    paid_amount: String,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = RepoError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let date = NaiveDate::parse_from_str(&row.date, DATE_FORMAT)
            .map_err(|e| RepoError::Corrupt(format!("transaction {} date {:?}: {e}", row.id, row.date)))?;
        let total_amount = decode_amount(row.id, &row.total_amount)?;
        let paid_amount = decode_amount(row.id, &row.paid_amount)?;
        Ok(Transaction {
            id: row.id,
            customer_id: row.customer_id,
            bill_no: row.bill_no,
            date,
            total_amount,
            paid_amount,
        })
    }
}

fn decode_amount(id: i64, raw: &str) -> RepoResult<Decimal> {
    Decimal::from_str(raw)
        .map_err(|e| RepoError::Corrupt(format!("transaction {id} amount {raw:?}: {e}")))
}

fn encode_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn decode_rows(rows: Vec<TransactionRow>) -> RepoResult<Vec<Transaction>> {
    rows.into_iter().map(Transaction::try_from).collect()
}

/// Transactions owned by any of `customer_ids`, oldest first
pub async fn find_by_customers(
    pool: &SqlitePool,
    customer_ids: &[i64],
) -> RepoResult<Vec<Transaction>> {
    if customer_ids.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!(
        "{TRANSACTION_SELECT} WHERE customer_id IN ({}) ORDER BY date ASC, id ASC",
        placeholders(customer_ids.len())
    );
    let mut query = sqlx::query_as::<_, TransactionRow>(&sql);
    for id in customer_ids {
        query = query.bind(*id);
    }
    decode_rows(query.fetch_all(pool).await?)
}

pub async fn find_on_date(pool: &SqlitePool, date: NaiveDate) -> RepoResult<Vec<Transaction>> {
    let sql = format!("{TRANSACTION_SELECT} WHERE date = ? ORDER BY id ASC");
    let rows = sqlx::query_as::<_, TransactionRow>(&sql)
        .bind(encode_date(date))
        .fetch_all(pool)
        .await?;
    decode_rows(rows)
}

pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<Transaction>> {
    let sql = format!("{TRANSACTION_SELECT} ORDER BY id ASC");
    let rows = sqlx::query_as::<_, TransactionRow>(&sql)
        .fetch_all(pool)
        .await?;
    decode_rows(rows)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Transaction>> {
    let sql = format!("{TRANSACTION_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, TransactionRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.map(Transaction::try_from).transpose()
}

pub async fn create(pool: &SqlitePool, data: &TransactionRecord) -> RepoResult<Transaction> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT INTO transactions (id, customer_id, bill_no, date, total_amount, paid_amount, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
    )
    .bind(id)
    .bind(data.customer_id)
    .bind(&data.bill_no)
    .bind(encode_date(data.date))
    .bind(data.total_amount.normalize().to_string())
    .bind(data.paid_amount.normalize().to_string())
    .bind(now)
    .execute(pool)
    .await?;
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create transaction".into()))
}

pub async fn update(pool: &SqlitePool, id: i64, data: &TransactionRecord) -> RepoResult<Transaction> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE transactions SET customer_id = ?1, bill_no = ?2, date = ?3, total_amount = ?4, paid_amount = ?5, updated_at = ?6 WHERE id = ?7",
    )
    .bind(data.customer_id)
    .bind(&data.bill_no)
    .bind(encode_date(data.date))
    .bind(data.total_amount.normalize().to_string())
    .bind(data.paid_amount.normalize().to_string())
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Transaction {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Transaction {id} not found")))
}
