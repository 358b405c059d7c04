//! Ledger engine
//!
//! - [`EntityStore`] / [`LedgerWriter`] - active scope data and writes
//! - [`balance`] - pure balance arithmetic
//! - [`ChangeReconciler`] - keeps the store in step with the remote store
//! - [`SnapshotService`] - backup, restore, report
//! - [`RouteSelector`] - persisted active route day

pub mod balance;
pub mod error;
pub mod reconciler;
pub mod route;
pub mod snapshot;
pub mod store;
pub mod view;

pub use error::{LedgerError, LedgerResult};
pub use reconciler::{ChangeReconciler, LedgerSnapshot, ReconcileState, ReconcilerHandle};
pub use route::RouteSelector;
pub use snapshot::{
    SnapshotService, backup_file_name, export_report, report_file_name, write_report_csv,
    write_snapshot,
};
pub use store::{EntityStore, LedgerWriter, ScopeData, fetch_scope};
pub use view::{
    CollectionLine, CustomerRow, CustomerStatement, DailyCollection, RouteView, SearchFilter,
    StatementLine,
};
