//! Shared types for the route ledger
//!
//! Models, change-feed messages, the unified error system and small
//! utilities used by every crate in the workspace.

pub mod error;
pub mod message;
pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use error::{AppError, AppResult, ErrorCategory, ErrorCode};
pub use message::{ChangeEvent, ChangeFilter, ChangeKind, ChangeTable};
