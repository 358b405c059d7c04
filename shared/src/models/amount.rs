//! Lenient amount input
//!
//! Bill and payment amounts arrive from forms and backup files as either JSON
//! numbers or free text. Anything that is not a number coerces to zero, and
//! negative values coerce to zero; this is a parsing policy, not a
//! validation failure.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Raw amount as supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Exact(Decimal),
    Text(String),
}

impl AmountInput {
    /// Coerce into a non-negative decimal
    pub fn coerce(&self) -> Decimal {
        let value = match self {
            AmountInput::Exact(d) => *d,
            AmountInput::Text(s) => parse_lenient(s),
        };
        value.max(Decimal::ZERO)
    }
}

impl Default for AmountInput {
    fn default() -> Self {
        AmountInput::Exact(Decimal::ZERO)
    }
}

impl From<Decimal> for AmountInput {
    fn from(value: Decimal) -> Self {
        AmountInput::Exact(value)
    }
}

impl From<i64> for AmountInput {
    fn from(value: i64) -> Self {
        AmountInput::Exact(Decimal::from(value))
    }
}

impl From<i32> for AmountInput {
    fn from(value: i32) -> Self {
        AmountInput::Exact(Decimal::from(value))
    }
}

impl From<&str> for AmountInput {
    fn from(value: &str) -> Self {
        AmountInput::Text(value.to_string())
    }
}

impl From<String> for AmountInput {
    fn from(value: String) -> Self {
        AmountInput::Text(value)
    }
}

/// Parse the longest leading decimal literal (`12.5kg` → 12.5, `abc` → 0)
pub fn parse_lenient(raw: &str) -> Decimal {
    let s = raw.trim();
    let bytes = s.as_bytes();
    let mut end = 0;
    let mut digits = 0;
    let mut seen_dot = false;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => digits += 1,
            b'.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end += 1;
    }
    if digits == 0 {
        if !s.is_empty() {
            tracing::debug!(raw = %s, "Non-numeric amount coerced to zero");
        }
        return Decimal::ZERO;
    }

    let literal = s[..end].trim_end_matches('.');
    let literal = literal.strip_prefix('+').unwrap_or(literal);
    let literal = match literal.strip_prefix('-') {
        Some(rest) if rest.starts_with('.') => format!("-0{rest}"),
        _ if literal.starts_with('.') => format!("0{literal}"),
        _ => literal.to_string(),
    };
    Decimal::from_str(&literal).unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str_exact(s).unwrap()
    }

    #[test]
    fn test_parse_lenient_numbers() {
        assert_eq!(parse_lenient("150"), dec("150"));
        assert_eq!(parse_lenient(" 12.50 "), dec("12.50"));
        assert_eq!(parse_lenient("0.1"), dec("0.1"));
        assert_eq!(parse_lenient(".5"), dec("0.5"));
        assert_eq!(parse_lenient("7."), dec("7"));
        assert_eq!(parse_lenient("+3"), dec("3"));
        assert_eq!(parse_lenient("-40"), dec("-40"));
    }

    #[test]
    fn test_parse_lenient_prefix_and_garbage() {
        assert_eq!(parse_lenient("12.5kg"), dec("12.5"));
        assert_eq!(parse_lenient("1.2.3"), dec("1.2"));
        assert_eq!(parse_lenient("abc"), Decimal::ZERO);
        assert_eq!(parse_lenient(""), Decimal::ZERO);
        assert_eq!(parse_lenient("-"), Decimal::ZERO);
        assert_eq!(parse_lenient("."), Decimal::ZERO);
    }

    #[test]
    fn test_coerce_is_non_negative() {
        assert_eq!(AmountInput::from("abc").coerce(), Decimal::ZERO);
        assert_eq!(AmountInput::from("-25").coerce(), Decimal::ZERO);
        assert_eq!(AmountInput::from(Decimal::NEGATIVE_ONE).coerce(), Decimal::ZERO);
        assert_eq!(AmountInput::from(300).coerce(), dec("300"));
    }

    #[test]
    fn test_deserialize_number_or_text() {
        let n: AmountInput = serde_json::from_str("500").unwrap();
        assert_eq!(n.coerce(), dec("500"));
        let s: AmountInput = serde_json::from_str("\"200.25\"").unwrap();
        assert_eq!(s.coerce(), dec("200.25"));
        let t: AmountInput = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(t, AmountInput::Text("abc".into()));
        assert_eq!(t.coerce(), Decimal::ZERO);
    }
}
