//! 变更通知消息类型定义
//!
//! The remote store pushes one [`ChangeEvent`] per confirmed insert, update or
//! delete. Subscribers narrow the stream with a [`ChangeFilter`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Collection a change happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeTable {
    Customers,
    Transactions,
}

impl fmt::Display for ChangeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeTable::Customers => write!(f, "customers"),
            ChangeTable::Transactions => write!(f, "transactions"),
        }
    }
}

/// Kind of change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Insert => write!(f, "insert"),
            ChangeKind::Update => write!(f, "update"),
            ChangeKind::Delete => write!(f, "delete"),
        }
    }
}

/// 变更通知
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: ChangeTable,
    pub kind: ChangeKind,
    /// Id of the affected record
    pub id: i64,
}

impl ChangeEvent {
    pub fn new(table: ChangeTable, kind: ChangeKind, id: i64) -> Self {
        Self { table, kind, id }
    }
}

/// Subscription filter: table + event kind, `None` meaning "any"
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeFilter {
    pub table: Option<ChangeTable>,
    pub kind: Option<ChangeKind>,
}

impl ChangeFilter {
    /// Every table, every kind
    pub fn any() -> Self {
        Self::default()
    }

    /// Every kind of change in one table
    pub fn table(table: ChangeTable) -> Self {
        Self {
            table: Some(table),
            kind: None,
        }
    }

    pub fn with_kind(mut self, kind: ChangeKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        self.table.is_none_or(|t| t == event.table) && self.kind.is_none_or(|k| k == event.kind)
    }
}
