//! Unified error system for the route ledger
//!
//! - [`ErrorCode`]: Standardized error codes for all error types
//! - [`ErrorCategory`]: Classification of errors by domain
//! - [`AppError`]: Rich error type with codes, messages, and details
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 4xxx: Customer errors
//! - 5xxx: Transaction errors
//! - 6xxx: Snapshot errors
//! - 9xxx: System errors
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode};
//!
//! let err = AppError::new(ErrorCode::CustomerNotFound);
//! assert_eq!(err.code.code(), 4001);
//!
//! let err = AppError::with_message(ErrorCode::CustomerNameRequired, "Name is empty")
//!     .with_detail("field", "name");
//! assert!(err.details.is_some());
//! ```

mod category;
mod codes;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{AppError, AppResult};
