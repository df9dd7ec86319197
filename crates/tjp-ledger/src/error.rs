//! # Service Error Types
//!
//! The error surface callers of [`LedgerService`](crate::service::LedgerService)
//! see: a stable machine-readable code plus a human-readable message.
//!
//! ## Error Flow
//! ```text
//! CoreError (validation, rules)  ──┐
//!                                  ├──► LedgerError { code, message }
//! DbError (storage)              ──┘
//! ```

use serde::Serialize;
use thiserror::Error;

use tjp_core::CoreError;
use tjp_db::DbError;

/// Machine-readable error codes for callers.
///
/// Codes are part of the contract; messages are not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input failed validation (bad quantity, malformed phone, ...).
    ValidationError,
    /// Sale or customer does not exist.
    NotFound,
    /// Settlement requested for a kadan that is already paid.
    ///
    /// ## When This Occurs
    /// - Double-tap on the settle button
    /// - Two operators settling the same kadan concurrently (the loser
    ///   of the race gets this code; money moved exactly once)
    AlreadySettled,
    /// Settlement requested for a cash/GPay sale.
    NotCreditSale,
    /// An edit attempted a payment-state change the ledger forbids.
    InvalidTransition,
    /// The record changed under the caller; re-read and retry.
    Conflict,
    /// Storage-level failure (pool, disk, constraint).
    DatabaseError,
    /// Anything else.
    Internal,
}

/// Service-level error with a stable code.
#[derive(Debug, Clone, Error, Serialize)]
#[error("{message}")]
pub struct LedgerError {
    pub code: ErrorCode,
    pub message: String,
}

impl LedgerError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        LedgerError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(what: impl std::fmt::Display) -> Self {
        LedgerError::new(ErrorCode::NotFound, format!("{what} not found"))
    }
}

impl From<CoreError> for LedgerError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::Validation(_) => ErrorCode::ValidationError,
            CoreError::SaleNotFound(_) | CoreError::CustomerNotFound(_) => ErrorCode::NotFound,
            CoreError::AlreadySettled(_) => ErrorCode::AlreadySettled,
            CoreError::NotCreditSale(_) => ErrorCode::NotCreditSale,
            CoreError::InvalidTransition { .. } => ErrorCode::InvalidTransition,
        };
        LedgerError::new(code, err.to_string())
    }
}

impl From<DbError> for LedgerError {
    fn from(err: DbError) -> Self {
        let code = match &err {
            DbError::NotFound { .. } => ErrorCode::NotFound,
            DbError::UniqueViolation { .. } | DbError::TransactionFailed(_) => ErrorCode::Conflict,
            DbError::ForeignKeyViolation { .. }
            | DbError::ConnectionFailed(_)
            | DbError::MigrationFailed(_)
            | DbError::QueryFailed(_)
            | DbError::PoolExhausted => ErrorCode::DatabaseError,
            DbError::Internal(_) => ErrorCode::Internal,
        };
        LedgerError::new(code, err.to_string())
    }
}

/// Result type for service operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use tjp_core::ValidationError;

    #[test]
    fn test_core_error_mapping() {
        let err: LedgerError = CoreError::AlreadySettled("abc".to_string()).into();
        assert_eq!(err.code, ErrorCode::AlreadySettled);

        let err: LedgerError = CoreError::Validation(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        })
        .into();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[test]
    fn test_db_error_mapping() {
        let err: LedgerError = DbError::not_found("Sale", "abc").into();
        assert_eq!(err.code, ErrorCode::NotFound);

        let err: LedgerError = DbError::PoolExhausted.into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }

    #[test]
    fn test_code_serializes_screaming() {
        let json = serde_json::to_string(&ErrorCode::AlreadySettled).unwrap();
        assert_eq!(json, "\"ALREADY_SETTLED\"");
    }
}
