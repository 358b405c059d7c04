//! Customer Repository

use super::{RepoError, RepoResult, placeholders};
use shared::models::{Customer, CustomerDraft, RouteDay};
use sqlx::SqlitePool;

const CUSTOMER_SELECT: &str = "SELECT id, serial_no, name, mobile, route_day FROM customers";

/// Customers of one route day, serial ascending (ties by id)
pub async fn find_by_day(pool: &SqlitePool, day: RouteDay) -> RepoResult<Vec<Customer>> {
    let sql = format!("{CUSTOMER_SELECT} WHERE route_day = ? ORDER BY serial_no ASC, id ASC");
    let rows = sqlx::query_as::<_, Customer>(&sql)
        .bind(day.as_str())
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<Customer>> {
    let sql = format!("{CUSTOMER_SELECT} ORDER BY id ASC");
    let rows = sqlx::query_as::<_, Customer>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Customer>> {
    let sql = format!("{CUSTOMER_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, Customer>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_ids(pool: &SqlitePool, ids: &[i64]) -> RepoResult<Vec<Customer>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!(
        "{CUSTOMER_SELECT} WHERE id IN ({}) ORDER BY id ASC",
        placeholders(ids.len())
    );
    let mut query = sqlx::query_as::<_, Customer>(&sql);
    for id in ids {
        query = query.bind(*id);
    }
    Ok(query.fetch_all(pool).await?)
}

pub async fn create(pool: &SqlitePool, data: &CustomerDraft) -> RepoResult<Customer> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT INTO customers (id, serial_no, name, mobile, route_day, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
    )
    .bind(id)
    .bind(data.serial_no)
    .bind(&data.name)
    .bind(&data.mobile)
    .bind(data.route_day.as_str())
    .bind(now)
    .execute(pool)
    .await?;
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create customer".into()))
}

/// Replace every editable field of an existing customer
pub async fn update(pool: &SqlitePool, id: i64, data: &CustomerDraft) -> RepoResult<Customer> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE customers SET serial_no = ?1, name = ?2, mobile = ?3, route_day = ?4, updated_at = ?5 WHERE id = ?6",
    )
    .bind(data.serial_no)
    .bind(&data.name)
    .bind(&data.mobile)
    .bind(data.route_day.as_str())
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Customer {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Customer {id} not found")))
}
