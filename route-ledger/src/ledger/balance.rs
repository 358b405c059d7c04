//! Balance calculation using rust_decimal for precision
//!
//! Pure functions over a transaction slice. Amounts are summed exactly; no
//! rounding is applied anywhere. A customer with no transactions in the
//! slice has a pending balance of zero.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use shared::models::{Customer, Transaction};
use std::collections::HashMap;

/// Sum of (total - paid) over the transactions owned by `customer_id`
pub fn pending_for(customer_id: i64, transactions: &[Transaction]) -> Decimal {
    transactions
        .iter()
        .filter(|t| t.customer_id == customer_id)
        .map(Transaction::balance)
        .sum()
}

/// Sum of [`pending_for`] over `customers`
pub fn aggregate_pending<'a, I>(customers: I, transactions: &[Transaction]) -> Decimal
where
    I: IntoIterator<Item = &'a Customer>,
{
    let by_customer = pending_by_customer(transactions);
    customers
        .into_iter()
        .map(|c| by_customer.get(&c.id).copied().unwrap_or(Decimal::ZERO))
        .sum()
}

/// Paid amounts collected on `date` (only strictly positive payments count)
pub fn collected_on(date: NaiveDate, transactions: &[Transaction]) -> Decimal {
    transactions
        .iter()
        .filter(|t| t.date == date && t.paid_amount > Decimal::ZERO)
        .map(|t| t.paid_amount)
        .sum()
}

pub fn is_settled(customer: &Customer, transactions: &[Transaction]) -> bool {
    pending_for(customer.id, transactions).is_zero()
}

/// Pending balance per owning customer id, in one pass
pub fn pending_by_customer(transactions: &[Transaction]) -> HashMap<i64, Decimal> {
    let mut map: HashMap<i64, Decimal> = HashMap::new();
    for t in transactions {
        *map.entry(t.customer_id).or_default() += t.balance();
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{PAYMENT_LABEL, RouteDay};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn customer(id: i64, route_day: RouteDay) -> Customer {
        Customer {
            id,
            serial_no: id,
            name: format!("Shop {id}"),
            mobile: None,
            route_day,
        }
    }

    fn txn(id: i64, customer_id: i64, total: &str, paid: &str, date: NaiveDate) -> Transaction {
        Transaction {
            id,
            customer_id,
            bill_no: format!("#{id}"),
            date,
            total_amount: dec(total),
            paid_amount: dec(paid),
        }
    }

    #[test]
    fn test_pending_matches_sum_of_balances() {
        let txns = vec![
            txn(1, 1, "500", "200", day(1)),
            txn(2, 1, "300", "300", day(2)),
            txn(3, 2, "999", "0", day(2)),
        ];
        assert_eq!(pending_for(1, &txns), dec("300"));
        assert_eq!(pending_for(2, &txns), dec("999"));
        assert_eq!(pending_for(3, &txns), Decimal::ZERO);
        assert_eq!(pending_for(1, &[]), Decimal::ZERO);
    }

    #[test]
    fn test_pending_can_be_negative() {
        let mut pay = txn(1, 1, "0", "150", day(4));
        pay.bill_no = PAYMENT_LABEL.into();
        assert_eq!(pending_for(1, &[pay]), dec("-150"));
    }

    #[test]
    fn test_no_float_drift() {
        let txns: Vec<_> = (0..10).map(|i| txn(i, 1, "0.1", "0", day(1))).collect();
        assert_eq!(pending_for(1, &txns), dec("1.0"));
        let txns = vec![txn(1, 1, "0.1", "0", day(1)), txn(2, 1, "0.2", "0", day(1))];
        assert_eq!(pending_for(1, &txns), dec("0.3"));
    }

    #[test]
    fn test_aggregate_only_counts_given_customers() {
        let mon = customer(1, RouteDay::Mon);
        let tue = customer(2, RouteDay::Tue);
        let txns = vec![txn(1, 1, "100", "40", day(1)), txn(2, 2, "70", "0", day(1))];

        assert_eq!(aggregate_pending([&mon], &txns), dec("60"));
        assert_eq!(aggregate_pending([&mon, &tue], &txns), dec("130"));
        assert_eq!(aggregate_pending(std::iter::empty(), &txns), Decimal::ZERO);
        // transactions not loaded yet for a visible customer
        assert_eq!(aggregate_pending([&mon, &customer(3, RouteDay::Mon)], &txns), dec("60"));
    }

    #[test]
    fn test_collected_on_ignores_other_days_and_zero_paid() {
        let txns = vec![
            txn(1, 1, "500", "200", day(5)),
            txn(2, 2, "0", "150", day(5)),
            txn(3, 3, "80", "0", day(5)),
            txn(4, 1, "0", "999", day(6)),
        ];
        assert_eq!(collected_on(day(5), &txns), dec("350"));
        assert_eq!(collected_on(day(7), &txns), Decimal::ZERO);
    }

    #[test]
    fn test_is_settled() {
        let c = customer(1, RouteDay::Mon);
        assert!(is_settled(&c, &[]));
        assert!(is_settled(&c, &[txn(1, 1, "300", "300", day(1))]));
        assert!(!is_settled(&c, &[txn(1, 1, "300", "299.99", day(1))]));
    }
}
