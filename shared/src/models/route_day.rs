//! Route Day Model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Weekday tag grouping customers into delivery routes
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "String")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
pub enum RouteDay {
    #[default]
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl RouteDay {
    /// All tags in route order (Monday first)
    pub const ALL: [RouteDay; 7] = [
        RouteDay::Mon,
        RouteDay::Tue,
        RouteDay::Wed,
        RouteDay::Thu,
        RouteDay::Fri,
        RouteDay::Sat,
        RouteDay::Sun,
    ];

    /// Short tag, as stored and persisted
    pub const fn as_str(&self) -> &'static str {
        match self {
            RouteDay::Mon => "Mon",
            RouteDay::Tue => "Tue",
            RouteDay::Wed => "Wed",
            RouteDay::Thu => "Thu",
            RouteDay::Fri => "Fri",
            RouteDay::Sat => "Sat",
            RouteDay::Sun => "Sun",
        }
    }

    /// Full weekday name
    pub const fn label(&self) -> &'static str {
        match self {
            RouteDay::Mon => "Monday",
            RouteDay::Tue => "Tuesday",
            RouteDay::Wed => "Wednesday",
            RouteDay::Thu => "Thursday",
            RouteDay::Fri => "Friday",
            RouteDay::Sat => "Saturday",
            RouteDay::Sun => "Sunday",
        }
    }
}

impl fmt::Display for RouteDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown route day tag
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown route day: {0:?}")]
pub struct ParseRouteDayError(pub String);

impl FromStr for RouteDay {
    type Err = ParseRouteDayError;

    /// Accepts the short tag or the full weekday name, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        RouteDay::ALL
            .into_iter()
            .find(|day| {
                day.as_str().eq_ignore_ascii_case(needle) || day.label().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| ParseRouteDayError(s.to_string()))
    }
}

impl TryFrom<String> for RouteDay {
    type Error = ParseRouteDayError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
