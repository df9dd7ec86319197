//! # Validation Module
//!
//! Input validation for sale recording and edits.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                              │
//! │                                                                     │
//! │  Layer 1: Caller (UI / API adapter)                                 │
//! │  ├── Basic format checks, immediate feedback                        │
//! │           │                                                         │
//! │           ▼                                                         │
//! │  Layer 2: THIS MODULE - rejected before any money-bearing write     │
//! │           │                                                         │
//! │           ▼                                                         │
//! │  Layer 3: Database (SQLite)                                         │
//! │  ├── NOT NULL / CHECK constraints                                   │
//! │  └── UNIQUE idempotency key                                         │
//! │                                                                     │
//! │  Defense in depth: multiple layers catch different errors           │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::{MAX_PRICE_PAISE, MAX_SALE_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a customer name.
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 120 characters
pub fn validate_customer_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "customerName".to_string(),
        });
    }

    if name.len() > 120 {
        return Err(ValidationError::TooLong {
            field: "customerName".to_string(),
            max: 120,
        });
    }

    Ok(())
}

/// Validates a contact number and returns its normalized form.
///
/// ## Rules
/// - Must not be empty
/// - Optional leading `+`, otherwise digits, spaces and hyphens only
/// - 7 to 15 digits after stripping formatting
///
/// ## Returns
/// The digits-only form (leading `+` preserved). Normalizing here keeps
/// `98765 43210` and `98765-43210` from fragmenting one customer's
/// kadan and loyalty history into two keys. Genuinely different numbers
/// for the same person remain two customers - phone number is the key.
pub fn validate_contact_number(contact: &str) -> ValidationResult<String> {
    let contact = contact.trim();

    if contact.is_empty() {
        return Err(ValidationError::Required {
            field: "contactNumber".to_string(),
        });
    }

    let (plus, rest) = match contact.strip_prefix('+') {
        Some(rest) => ("+", rest),
        None => ("", contact),
    };

    let mut digits = String::with_capacity(rest.len());
    for c in rest.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
        } else if c == ' ' || c == '-' {
            continue;
        } else {
            return Err(ValidationError::InvalidFormat {
                field: "contactNumber".to_string(),
                reason: "must contain only digits, spaces, hyphens and a leading +".to_string(),
            });
        }
    }

    if digits.len() < 7 || digits.len() > 15 {
        return Err(ValidationError::InvalidFormat {
            field: "contactNumber".to_string(),
            reason: "must be 7 to 15 digits".to_string(),
        });
    }

    Ok(format!("{}{}", plus, digits))
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a sale quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_SALE_QUANTITY (999) - guards against typing
///   1000 instead of 10
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_SALE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_SALE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price per unit in paise.
///
/// ## Rules
/// - Must be positive (> 0); the ledger has no free or negative-priced
///   sales, corrections go through an edit
/// - Must not exceed MAX_PRICE_PAISE, which also keeps the total
///   multiplication inside i64
pub fn validate_price_paise(paise: i64) -> ValidationResult<()> {
    if paise <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "pricePerUnit".to_string(),
        });
    }

    if paise > MAX_PRICE_PAISE {
        return Err(ValidationError::OutOfRange {
            field: "pricePerUnit".to_string(),
            min: 1,
            max: MAX_PRICE_PAISE,
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a sale id (UUID string format).
pub fn validate_sale_id(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_customer_name() {
        assert!(validate_customer_name("Partha").is_ok());
        assert!(validate_customer_name("").is_err());
        assert!(validate_customer_name("   ").is_err());
        assert!(validate_customer_name(&"A".repeat(200)).is_err());
    }

    #[test]
    fn test_validate_contact_number() {
        assert_eq!(
            validate_contact_number("9500591897").unwrap(),
            "9500591897"
        );
        assert_eq!(
            validate_contact_number("+91 98765 43210").unwrap(),
            "+919876543210"
        );
        assert_eq!(
            validate_contact_number("98765-43210").unwrap(),
            "9876543210"
        );

        assert!(validate_contact_number("").is_err());
        assert!(validate_contact_number("12345").is_err()); // too short
        assert!(validate_contact_number("1234567890123456").is_err()); // too long
        assert!(validate_contact_number("98765abc10").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_price_paise() {
        assert!(validate_price_paise(5000).is_ok());
        assert!(validate_price_paise(MAX_PRICE_PAISE).is_ok());

        assert!(validate_price_paise(0).is_err());
        assert!(validate_price_paise(-100).is_err());
        assert!(validate_price_paise(MAX_PRICE_PAISE + 1).is_err());
        assert!(validate_price_paise(i64::MAX).is_err());
    }

    #[test]
    fn test_max_price_times_max_quantity_cannot_overflow() {
        let total = MAX_PRICE_PAISE.checked_mul(MAX_SALE_QUANTITY);
        assert!(total.is_some());
    }

    #[test]
    fn test_validate_sale_id() {
        assert!(validate_sale_id("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_sale_id("").is_err());
        assert!(validate_sale_id("not-a-uuid").is_err());
    }
}
