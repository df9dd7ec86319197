//! # Error Types
//!
//! Domain-specific error types for tjp-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          Error Types                                │
//! │                                                                     │
//! │  tjp-core errors (this file)                                        │
//! │  ├── CoreError        - Ledger rule violations                      │
//! │  └── ValidationError  - Input validation failures                   │
//! │                                                                     │
//! │  tjp-db errors (separate crate)                                     │
//! │  └── DbError          - Database operation failures                 │
//! │                                                                     │
//! │  tjp-ledger errors (service crate)                                  │
//! │  └── LedgerError      - What callers see (code + message)           │
//! │                                                                     │
//! │  Flow: ValidationError → CoreError → DbError → LedgerError          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (sale id, contact number, etc.)
//! 3. Errors are enum variants, never String
//! 4. Settlement guards (`AlreadySettled`, `NotCreditSale`) are ordinary
//!    return values, not exceptional control flow - callers treat them as
//!    benign and refresh their view of the sale

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Ledger business rule violations.
///
/// These errors represent illegal operations on sales or loyalty state.
/// They should be caught and translated to user-friendly messages.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Sale cannot be found.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Customer cannot be found (by contact number).
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Settlement was requested for a sale that is already Paid.
    ///
    /// ## When This Occurs
    /// - Operator double-clicks the settle button
    /// - Two devices settle the same kadan concurrently (exactly one wins)
    ///
    /// Idempotency guard: the second call must not double-count revenue.
    #[error("Sale {0} is already settled")]
    AlreadySettled(String),

    /// Settlement was requested for a non-credit sale.
    ///
    /// Cash/GPay sales are Paid at creation; there is nothing to settle.
    #[error("Sale {0} is not a credit sale")]
    NotCreditSale(String),

    /// Attempted illegal state change.
    ///
    /// ## When This Occurs
    /// - Editing paymentType away from Credit while the debt is Unpaid
    ///   without supplying a settlement reason
    /// - Any attempt to reopen a Paid sale
    #[error("Invalid transition for sale {sale_id}: {reason}")]
    InvalidTransition { sale_id: String, reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when operator input doesn't meet requirements.
/// Used for early validation before any money-bearing write runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, malformed phone number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::AlreadySettled("sale-42".to_string());
        assert_eq!(err.to_string(), "Sale sale-42 is already settled");

        let err = CoreError::InvalidTransition {
            sale_id: "sale-42".to_string(),
            reason: "cannot change paymentType away from Credit while Unpaid".to_string(),
        };
        assert!(err.to_string().contains("sale-42"));
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "customerName".to_string(),
        };
        assert_eq!(err.to_string(), "customerName is required");

        let err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must be positive");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "contactNumber".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
