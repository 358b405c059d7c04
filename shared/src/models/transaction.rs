//! Transaction Model (账单 / 收款)

use super::AmountInput;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Reserved label marking a direct payment (no invoice behind it)
pub const PAYMENT_LABEL: &str = "PAY";

/// Transaction entity: a bill or a direct payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub customer_id: i64,
    /// Free-form bill number, or [`PAYMENT_LABEL`]
    pub bill_no: String,
    pub date: NaiveDate,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
}

impl Transaction {
    /// total - paid; negative when overpaid, never clamped
    pub fn balance(&self) -> Decimal {
        self.total_amount - self.paid_amount
    }

    pub fn is_payment(&self) -> bool {
        self.bill_no == PAYMENT_LABEL
    }
}

/// Create / update transaction payload, amounts still raw
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDraft {
    pub customer_id: i64,
    #[serde(default)]
    pub bill_no: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub total_amount: AmountInput,
    #[serde(default)]
    pub paid_amount: AmountInput,
}

impl TransactionDraft {
    /// A bill with a total and an optional amount paid up front
    pub fn bill(
        customer_id: i64,
        bill_no: impl Into<String>,
        date: NaiveDate,
        total_amount: impl Into<AmountInput>,
        paid_amount: impl Into<AmountInput>,
    ) -> Self {
        Self {
            customer_id,
            bill_no: bill_no.into(),
            date,
            total_amount: total_amount.into(),
            paid_amount: paid_amount.into(),
        }
    }

    /// Money received without a new invoice: total fixed at zero
    pub fn payment(customer_id: i64, date: NaiveDate, amount: impl Into<AmountInput>) -> Self {
        Self {
            customer_id,
            bill_no: PAYMENT_LABEL.to_string(),
            date,
            total_amount: AmountInput::default(),
            paid_amount: amount.into(),
        }
    }

    /// Apply the lenient amount policy
    pub fn normalize(&self) -> TransactionRecord {
        TransactionRecord {
            customer_id: self.customer_id,
            bill_no: self.bill_no.trim().to_string(),
            date: self.date,
            total_amount: self.total_amount.coerce(),
            paid_amount: self.paid_amount.coerce(),
        }
    }
}

/// Normalized transaction fields, ready to write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub customer_id: i64,
    pub bill_no: String,
    pub date: NaiveDate,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
}

impl From<&Transaction> for TransactionRecord {
    fn from(t: &Transaction) -> Self {
        Self {
            customer_id: t.customer_id,
            bill_no: t.bill_no.clone(),
            date: t.date,
            total_amount: t.total_amount,
            paid_amount: t.paid_amount,
        }
    }
}
