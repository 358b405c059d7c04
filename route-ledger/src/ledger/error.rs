use crate::local_state::LocalStateError;
use crate::remote::RemoteError;
use shared::{AppError, ErrorCode};
use thiserror::Error;

/// Ledger engine errors
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Required field missing or malformed; no remote call was made
    #[error("Validation failed: {message}")]
    Validation { code: ErrorCode, message: String },

    /// A fetch failed; local data kept and may be stale
    #[error("Remote store unavailable: {0}")]
    RemoteUnavailable(String),

    /// A create / update was rejected; nothing local changed
    #[error("Remote write rejected: {message}")]
    RemoteWrite { code: ErrorCode, message: String },

    /// Import payload lacks the top-level snapshot shape; nothing inserted
    #[error("Malformed snapshot: {0}")]
    MalformedSnapshot(String),

    #[error("Not found: {message}")]
    NotFound { code: ErrorCode, message: String },

    /// Writing a backup or report failed
    #[error("Export failed: {0}")]
    Export(String),

    #[error("Local state error: {0}")]
    LocalState(#[from] LocalStateError),

    /// The change reconciler task is no longer running
    #[error("Reconciler stopped")]
    Stopped,
}

impl LedgerError {
    pub fn validation(code: ErrorCode, message: impl Into<String>) -> Self {
        LedgerError::Validation {
            code,
            message: message.into(),
        }
    }

    pub fn customer_not_found(id: i64) -> Self {
        LedgerError::NotFound {
            code: ErrorCode::CustomerNotFound,
            message: format!("Customer {id} not found"),
        }
    }

    pub fn transaction_not_found(id: i64) -> Self {
        LedgerError::NotFound {
            code: ErrorCode::TransactionNotFound,
            message: format!("Transaction {id} not found"),
        }
    }

    pub fn is_remote_unavailable(&self) -> bool {
        matches!(self, LedgerError::RemoteUnavailable(_))
    }

    /// Error code reported to callers
    pub fn code(&self) -> ErrorCode {
        match self {
            LedgerError::Validation { code, .. }
            | LedgerError::RemoteWrite { code, .. }
            | LedgerError::NotFound { code, .. } => *code,
            LedgerError::RemoteUnavailable(_) => ErrorCode::RemoteUnavailable,
            LedgerError::MalformedSnapshot(_) => ErrorCode::MalformedSnapshot,
            LedgerError::LocalState(_) => ErrorCode::LocalStateError,
            LedgerError::Export(_) | LedgerError::Stopped => ErrorCode::InternalError,
        }
    }
}

impl From<RemoteError> for LedgerError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Unavailable(msg) => LedgerError::RemoteUnavailable(msg),
            RemoteError::Rejected(message) => LedgerError::RemoteWrite {
                code: ErrorCode::RemoteWriteRejected,
                message,
            },
            RemoteError::OwnerMissing(id) => LedgerError::RemoteWrite {
                code: ErrorCode::TransactionOwnerMissing,
                message: format!("Customer {id} does not exist"),
            },
            RemoteError::NotFound(message) => LedgerError::NotFound {
                code: ErrorCode::NotFound,
                message,
            },
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let code = err.code();
        match err {
            LedgerError::RemoteUnavailable(msg) => {
                AppError::remote_unavailable("Data store unavailable, data may be stale")
                    .with_detail("cause", msg)
            }
            LedgerError::Validation { message, .. }
            | LedgerError::RemoteWrite { message, .. }
            | LedgerError::NotFound { message, .. } => AppError::with_message(code, message),
            LedgerError::MalformedSnapshot(msg) | LedgerError::Export(msg) => {
                AppError::with_message(code, msg)
            }
            LedgerError::LocalState(e) => {
                tracing::error!(error = %e, "Local state failure");
                AppError::with_message(code, e.to_string())
            }
            LedgerError::Stopped => AppError::with_message(code, "Reconciler stopped"),
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_errors_map_to_taxonomy() {
        assert!(LedgerError::from(RemoteError::Unavailable("down".into())).is_remote_unavailable());
        assert_eq!(
            LedgerError::from(RemoteError::Rejected("no".into())).code(),
            ErrorCode::RemoteWriteRejected
        );
        assert_eq!(
            LedgerError::from(RemoteError::OwnerMissing(7)).code(),
            ErrorCode::TransactionOwnerMissing
        );
        assert!(matches!(
            LedgerError::from(RemoteError::NotFound("x".into())),
            LedgerError::NotFound { code: ErrorCode::NotFound, .. }
        ));
    }

    #[test]
    fn test_app_error_codes() {
        let app: AppError =
            LedgerError::validation(ErrorCode::CustomerNameRequired, "name is empty").into();
        assert_eq!(app.code, ErrorCode::CustomerNameRequired);
        assert_eq!(app.message, "name is empty");

        let app: AppError = LedgerError::RemoteUnavailable("timeout".into()).into();
        assert_eq!(app.code, ErrorCode::RemoteUnavailable);
        assert_eq!(app.details.unwrap()["cause"], "timeout");

        let app: AppError = LedgerError::MalformedSnapshot("not an object".into()).into();
        assert_eq!(app.code.code(), 6001);

        let app: AppError = LedgerError::customer_not_found(42).into();
        assert_eq!(app.code, ErrorCode::CustomerNotFound);
        assert_eq!(app.message, "Customer 42 not found");

        let app: AppError = LedgerError::from(RemoteError::OwnerMissing(9)).into();
        assert_eq!(app.code, ErrorCode::TransactionOwnerMissing);
    }
}
