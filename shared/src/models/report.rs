//! Report Model

use super::RouteDay;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One row of the customer balance report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    #[serde(rename = "Serial")]
    pub serial_no: i64,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Mobile")]
    pub mobile: Option<String>,
    #[serde(rename = "Route")]
    pub route_day: RouteDay,
    #[serde(rename = "Pending")]
    pub pending: Decimal,
}
