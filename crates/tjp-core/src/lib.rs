//! # tjp-core: Pure Business Logic for the TJP Farm Ledger
//!
//! This crate is the **heart** of the farm ledger. It contains all
//! business logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     TJP Farm Ledger Architecture                    │
//! │                                                                     │
//! │  ┌─────────────────────────────────────────────────────────────┐    │
//! │  │                 Caller (UI / API adapter)                   │    │
//! │  │    record sale ──► settle kadan ──► loyalty view            │    │
//! │  └──────────────────────────┬──────────────────────────────────┘    │
//! │                             │                                       │
//! │  ┌──────────────────────────▼──────────────────────────────────┐    │
//! │  │                  tjp-ledger (service layer)                 │    │
//! │  └──────────────────────────┬──────────────────────────────────┘    │
//! │                             │                                       │
//! │  ┌──────────────────────────▼──────────────────────────────────┐    │
//! │  │               ★ tjp-core (THIS CRATE) ★                     │    │
//! │  │                                                             │    │
//! │  │   ┌─────────┐  ┌─────────┐  ┌─────────┐  ┌────────────┐     │    │
//! │  │   │  types  │  │  money  │  │ loyalty │  │ validation │     │    │
//! │  │   │  Sale   │  │  Money  │  │ Milesto │  │   rules    │     │    │
//! │  │   │ Payment │  │  paise  │  │ -nes    │  │   checks   │     │    │
//! │  │   └─────────┘  └─────────┘  └─────────┘  └────────────┘     │    │
//! │  │                                                             │    │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS        │    │
//! │  └──────────────────────────┬──────────────────────────────────┘    │
//! │                             │                                       │
//! │  ┌──────────────────────────▼──────────────────────────────────┐    │
//! │  │                  tjp-db (Database Layer)                    │    │
//! │  │           SQLite queries, migrations, repositories          │    │
//! │  └─────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Sale, Customer, payment enums, settlement state)
//! - [`money`] - Money type with integer paise arithmetic (no floating point!)
//! - [`loyalty`] - Loyalty counter derivation and milestone crossings
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation rules
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in paise (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod loyalty;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use tjp_core::Money` instead of
// `use tjp_core::money::Money`

pub use error::{CoreError, CoreResult, ValidationError};
pub use loyalty::{LoyaltyDelta, LoyaltyPolicy, LoyaltySnapshot, Milestone};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity for a single sale.
///
/// ## Business Reason
/// Prevents accidental over-entry (e.g., typing 1000 instead of 10).
/// The farm has never sold more than a few hundred pockets in one go.
pub const MAX_SALE_QUANTITY: i64 = 999;

/// Maximum price per unit in paise (₹1,00,000).
///
/// ## Business Reason
/// Catches fat-fingered prices the same way MAX_SALE_QUANTITY catches
/// quantities, and keeps `quantity * price_per_unit_paise` far inside
/// i64 so the total can never overflow.
pub const MAX_PRICE_PAISE: i64 = 10_000_000;
