//! Customer Model

use super::RouteDay;
use serde::{Deserialize, Serialize};

/// Customer entity (线路客户)
///
/// `serial_no` is an advisory ordering key inside a route day; it is not
/// required to be unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: i64,
    #[serde(rename = "sr_no", alias = "serial_no", default)]
    pub serial_no: i64,
    pub name: String,
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub route_day: RouteDay,
}

/// Create / update customer payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDraft {
    #[serde(rename = "sr_no", alias = "serial_no", default)]
    pub serial_no: i64,
    pub name: String,
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub route_day: RouteDay,
}

impl CustomerDraft {
    pub fn new(serial_no: i64, name: impl Into<String>, route_day: RouteDay) -> Self {
        Self {
            serial_no,
            name: name.into(),
            mobile: None,
            route_day,
        }
    }

    pub fn with_mobile(mut self, mobile: impl Into<String>) -> Self {
        self.mobile = Some(mobile.into());
        self
    }

    /// Trim the name and collapse a blank mobile number to `None`
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.mobile = self
            .mobile
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());
        self
    }
}

impl From<&Customer> for CustomerDraft {
    fn from(customer: &Customer) -> Self {
        Self {
            serial_no: customer.serial_no,
            name: customer.name.clone(),
            mobile: customer.mobile.clone(),
            route_day: customer.route_day,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_trims_and_drops_blank_mobile() {
        let draft = CustomerDraft::new(3, "  Shop A ", RouteDay::Mon)
            .with_mobile("   ")
            .normalized();
        assert_eq!(draft.name, "Shop A");
        assert_eq!(draft.mobile, None);

        let draft = CustomerDraft::new(3, "Shop B", RouteDay::Mon)
            .with_mobile(" 98765 ")
            .normalized();
        assert_eq!(draft.mobile.as_deref(), Some("98765"));
    }

    #[test]
    fn test_customer_json_field_names() {
        let customer = Customer {
            id: 7,
            serial_no: 1,
            name: "Shop A".into(),
            mobile: None,
            route_day: RouteDay::Tue,
        };
        let json = serde_json::to_value(&customer).unwrap();
        assert_eq!(json["sr_no"], 1);
        assert_eq!(json["route_day"], "Tue");

        let back: Customer =
            serde_json::from_str(r#"{"id":7,"serial_no":1,"name":"Shop A","route_day":"Tue"}"#)
                .unwrap();
        assert_eq!(back, customer);
    }
}
