//! Unified error codes for the route ledger
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 4xxx: Customer errors
//! - 5xxx: Transaction errors
//! - 6xxx: Snapshot errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so they survive JSON
/// round-trips unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Resource not found
    NotFound = 3,

    // ==================== 4xxx: Customer ====================
    /// Customer not found
    CustomerNotFound = 4001,
    /// Customer name is empty
    CustomerNameRequired = 4002,

    // ==================== 5xxx: Transaction ====================
    /// Transaction not found
    TransactionNotFound = 5001,
    /// Transaction references a missing customer
    TransactionOwnerMissing = 5002,

    // ==================== 6xxx: Snapshot ====================
    /// Snapshot document lacks the required top-level shape
    MalformedSnapshot = 6001,
    /// A single snapshot record could not be imported
    SnapshotRecordRejected = 6002,

    // ==================== 9xxx: System ====================
    /// Internal error
    InternalError = 9001,
    /// Remote store could not be reached
    RemoteUnavailable = 9002,
    /// Remote store rejected a write
    RemoteWriteRejected = 9003,
    /// Local persisted state could not be read or written
    LocalStateError = 9004,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::NotFound => "Resource not found",

            // Customer
            ErrorCode::CustomerNotFound => "Customer not found",
            ErrorCode::CustomerNameRequired => "Customer name is required",

            // Transaction
            ErrorCode::TransactionNotFound => "Transaction not found",
            ErrorCode::TransactionOwnerMissing => "Transaction owner does not exist",

            // Snapshot
            ErrorCode::MalformedSnapshot => "Snapshot document is malformed",
            ErrorCode::SnapshotRecordRejected => "Snapshot record was rejected",

            // System
            ErrorCode::InternalError => "Internal error",
            ErrorCode::RemoteUnavailable => "Data store unavailable, data may be stale",
            ErrorCode::RemoteWriteRejected => "Data store rejected the write",
            ErrorCode::LocalStateError => "Local state could not be accessed",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error returned when converting an unknown u16 value into [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            3 => Ok(ErrorCode::NotFound),

            // Customer
            4001 => Ok(ErrorCode::CustomerNotFound),
            4002 => Ok(ErrorCode::CustomerNameRequired),

            // Transaction
            5001 => Ok(ErrorCode::TransactionNotFound),
            5002 => Ok(ErrorCode::TransactionOwnerMissing),

            // Snapshot
            6001 => Ok(ErrorCode::MalformedSnapshot),
            6002 => Ok(ErrorCode::SnapshotRecordRejected),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::RemoteUnavailable),
            9003 => Ok(ErrorCode::RemoteWriteRejected),
            9004 => Ok(ErrorCode::LocalStateError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}
