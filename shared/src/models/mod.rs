//! Data models
//!
//! Shared between the ledger engine and its callers.
//! All IDs are `i64` snowflake ids assigned by the store.

pub mod amount;
pub mod customer;
pub mod report;
pub mod route_day;
pub mod session;
pub mod snapshot;
pub mod transaction;

// Re-exports
pub use amount::*;
pub use customer::*;
pub use report::*;
pub use route_day::*;
pub use session::*;
pub use snapshot::*;
pub use transaction::*;
