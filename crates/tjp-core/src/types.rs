//! # Domain Types
//!
//! Core domain types for the TJP farm ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          Domain Types                               │
//! │                                                                     │
//! │  ┌────────────────┐   ┌────────────────┐   ┌────────────────┐      │
//! │  │     Sale       │   │    Customer    │   │ BillOutboxEntry│      │
//! │  │  ────────────  │   │  ────────────  │   │  ────────────  │      │
//! │  │  id (UUID)     │   │ contact_number │   │  id (UUID)     │      │
//! │  │  product_type  │   │ name           │   │  sale_id (FK)  │      │
//! │  │  payment_type  │   │ last_reset_at  │   │  payload JSON  │      │
//! │  │  total paise   │   └────────────────┘   └────────────────┘      │
//! │  └────────────────┘                                                 │
//! │                                                                     │
//! │  ┌────────────────┐   ┌────────────────┐   ┌────────────────┐      │
//! │  │  ProductType   │   │  PaymentType   │   │ SettlementState│      │
//! │  │  ────────────  │   │  ────────────  │   │  ────────────  │      │
//! │  │  Mushroom      │   │  Cash          │   │  NotCredit     │      │
//! │  │  Seeds         │   │  Gpay          │   │  Outstanding   │      │
//! │  └────────────────┘   │  Credit        │   │  Settled       │      │
//! │                       └────────────────┘   └────────────────┘      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Settlement as a Tagged State
//! The reference app stored `paymentStatus`, `settledDate` and `settledBy`
//! as three independently-settable fields, which admits illegal combos
//! (a Paid kadan with no settlement record). Here the flat columns stay
//! for storage, but [`Sale::settlement`] is the read path: it collapses
//! them into [`SettlementState`], and the write paths in tjp-db are the
//! only code allowed to touch the raw fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Product Type
// =============================================================================

/// What the farm sells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    /// Fresh mushroom, sold by the pocket. The only product that counts
    /// toward loyalty.
    Mushroom,
    /// Spawn/seeds, sold by the kilogram. Never contributes to loyalty.
    Seeds,
}

impl ProductType {
    /// The sale unit for this product.
    ///
    /// Derived, never user-editable independently: the reference app
    /// defaulted `unit` from the product and nothing else ever wrote it.
    pub const fn unit(&self) -> &'static str {
        match self {
            ProductType::Mushroom => "pockets",
            ProductType::Seeds => "kg",
        }
    }
}

// =============================================================================
// Payment Type
// =============================================================================

/// How the customer intends to pay at the time of sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    /// Physical cash, paid on the spot.
    Cash,
    /// UPI transfer, paid on the spot.
    Gpay,
    /// Kadan - deferred payment, starts Unpaid.
    Credit,
}

impl PaymentType {
    /// Whether this sale is a kadan (deferred payment).
    #[inline]
    pub const fn is_credit(&self) -> bool {
        matches!(self, PaymentType::Credit)
    }

    /// The payment status a fresh sale of this type starts in.
    ///
    /// Invariant: `paymentType != Credit ⇒ paymentStatus == Paid`.
    #[inline]
    pub const fn initial_status(&self) -> PaymentStatus {
        match self {
            PaymentType::Credit => PaymentStatus::Unpaid,
            _ => PaymentStatus::Paid,
        }
    }
}

// =============================================================================
// Payment Status
// =============================================================================

/// Whether the money for a sale has been received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Money received (immediately, or via settlement of a kadan).
    Paid,
    /// Kadan outstanding. Only ever entered at creation of a Credit sale.
    Unpaid,
}

// =============================================================================
// Settlement Method
// =============================================================================

/// How a kadan was eventually paid off.
///
/// May differ from the originally intended method; `paymentType` stays
/// `Credit` for audit, this records the actual settlement tender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum SettlementMethod {
    Cash,
    Gpay,
}

impl std::fmt::Display for SettlementMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettlementMethod::Cash => write!(f, "Cash"),
            SettlementMethod::Gpay => write!(f, "GPay"),
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A recorded sale - the unit record of the ledger.
///
/// ## Lifecycle
/// Created by `record_sale`; mutated only by an explicit edit (which
/// recomputes `total_amount_paise`) or by the settlement transition;
/// never deleted except by an explicit administrative purge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    /// Unique identifier (UUID v4). Immutable, assigned at creation.
    pub id: String,

    /// Customer display name (free text).
    pub customer_name: String,

    /// Customer phone number - the de-facto customer key.
    pub contact_number: String,

    /// What was sold.
    pub product_type: ProductType,

    /// Quantity sold (pockets or kg). Always positive.
    pub quantity: i64,

    /// Sale unit, derived from `product_type` at write time.
    pub unit: String,

    /// Price per unit in paise.
    pub price_per_unit_paise: i64,

    /// Derived total in paise.
    ///
    /// Invariant: always `quantity * price_per_unit_paise`, recomputed
    /// server-side on every create/edit, never trusted from the caller.
    pub total_amount_paise: i64,

    /// How the customer pays. Stays `Credit` even after settlement.
    pub payment_type: PaymentType,

    /// Whether the money has been received.
    pub payment_status: PaymentStatus,

    /// When the kadan was settled. Set exactly once, on Unpaid → Paid.
    pub settled_date: Option<DateTime<Utc>>,

    /// Tender used to settle the kadan. Set together with `settled_date`.
    pub settled_by: Option<SettlementMethod>,

    /// Business date of the transaction. May be back-dated by the
    /// operator; distinct from `created_at`.
    pub date: DateTime<Utc>,

    /// When the record was created.
    pub created_at: DateTime<Utc>,

    /// When the record was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    /// Returns the unit price as Money.
    #[inline]
    pub fn price_per_unit(&self) -> Money {
        Money::from_paise(self.price_per_unit_paise)
    }

    /// Returns the total as Money.
    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_paise(self.total_amount_paise)
    }

    /// Whether this sale is an outstanding kadan (unpaid credit).
    #[inline]
    pub fn is_outstanding_kadan(&self) -> bool {
        self.payment_type.is_credit() && self.payment_status == PaymentStatus::Unpaid
    }

    /// Collapses the raw payment fields into the tagged settlement state.
    ///
    /// The write paths guarantee a Paid credit sale always carries both
    /// `settled_date` and `settled_by`, so the `Settled` arm can require
    /// them; anything else on a credit sale is an outstanding kadan.
    pub fn settlement(&self) -> SettlementState {
        if !self.payment_type.is_credit() {
            return SettlementState::NotCredit;
        }
        match (self.payment_status, self.settled_date, self.settled_by) {
            (PaymentStatus::Paid, Some(date), Some(method)) => {
                SettlementState::Settled { date, method }
            }
            _ => SettlementState::Outstanding { since: self.date },
        }
    }
}

/// Tagged view of a sale's settlement position.
///
/// Eliminates the illegal-state space of the raw field combination:
/// a sale is either not on credit, an outstanding kadan, or settled
/// (with both the date and the tender known).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SettlementState {
    /// Cash/GPay sale, paid at creation; settlement does not apply.
    NotCredit,
    /// Kadan still owed, open since the business date of the sale.
    Outstanding { since: DateTime<Utc> },
    /// Kadan paid off. Terminal: no transition leaves this state.
    Settled {
        date: DateTime<Utc>,
        method: SettlementMethod,
    },
}

// =============================================================================
// Customer
// =============================================================================

/// A customer row, keyed by phone number.
///
/// Holds the latest known name and the loyalty reset marker. Loyalty
/// counters are NOT stored here - they are derived from sale history
/// plus `last_reset_at` (see [`crate::loyalty`]), so this row can be
/// rebuilt at any time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    /// Phone number - primary key.
    pub contact_number: String,

    /// Latest name seen on a sale for this number.
    pub name: String,

    /// When the operator last reset this customer's loyalty cycle.
    /// Qualifying sales dated on or before this moment stop counting.
    pub last_reset_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Bill Outbox
// =============================================================================

/// An entry in the bill hand-off outbox.
///
/// After a sale commits, a `{ sale, loyalty }` payload is queued here for
/// the bill/notification collaborator. Delivery is best-effort and
/// human-completed; a failed delivery never touches the sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct BillOutboxEntry {
    pub id: String,

    /// The sale this bill belongs to.
    pub sale_id: String,

    /// Customer phone number for the message draft.
    pub contact_number: String,

    /// The full `{ sale, loyalty }` payload as JSON.
    pub payload: String,

    /// Number of delivery attempts.
    pub attempts: i64,

    /// Last error message if delivery failed.
    pub last_error: Option<String>,

    pub created_at: DateTime<Utc>,

    /// When delivery was last attempted.
    pub attempted_at: Option<DateTime<Utc>>,

    /// When the bill was successfully handed off.
    pub delivered_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_sale(payment_type: PaymentType) -> Sale {
        let now = Utc::now();
        Sale {
            id: "s-1".to_string(),
            customer_name: "Partha".to_string(),
            contact_number: "9500591897".to_string(),
            product_type: ProductType::Mushroom,
            quantity: 12,
            unit: ProductType::Mushroom.unit().to_string(),
            price_per_unit_paise: Money::from_rupees(50).paise(),
            total_amount_paise: Money::from_rupees(600).paise(),
            payment_type,
            payment_status: payment_type.initial_status(),
            settled_date: None,
            settled_by: None,
            date: now,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_unit_derivation() {
        assert_eq!(ProductType::Mushroom.unit(), "pockets");
        assert_eq!(ProductType::Seeds.unit(), "kg");
    }

    #[test]
    fn test_initial_status() {
        assert_eq!(PaymentType::Cash.initial_status(), PaymentStatus::Paid);
        assert_eq!(PaymentType::Gpay.initial_status(), PaymentStatus::Paid);
        assert_eq!(PaymentType::Credit.initial_status(), PaymentStatus::Unpaid);
    }

    #[test]
    fn test_settlement_state_not_credit() {
        let sale = sample_sale(PaymentType::Cash);
        assert_eq!(sale.settlement(), SettlementState::NotCredit);
        assert!(!sale.is_outstanding_kadan());
    }

    #[test]
    fn test_settlement_state_outstanding() {
        let sale = sample_sale(PaymentType::Credit);
        assert!(sale.is_outstanding_kadan());
        assert!(matches!(
            sale.settlement(),
            SettlementState::Outstanding { .. }
        ));
    }

    #[test]
    fn test_settlement_state_settled() {
        let mut sale = sample_sale(PaymentType::Credit);
        let settled = Utc::now();
        sale.payment_status = PaymentStatus::Paid;
        sale.settled_date = Some(settled);
        sale.settled_by = Some(SettlementMethod::Gpay);

        // paymentType stays Credit for audit even after settlement
        assert_eq!(sale.payment_type, PaymentType::Credit);
        assert!(!sale.is_outstanding_kadan());
        assert_eq!(
            sale.settlement(),
            SettlementState::Settled {
                date: settled,
                method: SettlementMethod::Gpay,
            }
        );
    }

    #[test]
    fn test_money_helpers() {
        let sale = sample_sale(PaymentType::Cash);
        assert_eq!(sale.price_per_unit(), Money::from_rupees(50));
        assert_eq!(sale.total_amount(), Money::from_rupees(600));
    }
}
