//! # tjp-ledger: Service Layer for the TJP Farm Ledger
//!
//! Orchestrates the farm's sales, kadan and loyalty workflows on top of
//! [`tjp_core`] (pure rules) and [`tjp_db`] (SQLite storage).
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                   TJP Farm Ledger Workspace                         │
//! │                                                                     │
//! │   Caller (CLI / HTTP adapter / desktop shell)                       │
//! │       │                                                             │
//! │       ▼                                                             │
//! │   tjp-ledger (THIS CRATE)                                           │
//! │   ├── service.rs  - LedgerService: record / edit / settle / query   │
//! │   ├── handoff.rs  - bill rendering + outbox drain                   │
//! │   ├── config.rs   - farm name, loyalty policy, env overrides        │
//! │   └── error.rs    - LedgerError { code, message }                   │
//! │       │                                                             │
//! │       ├──────────────► tjp-core (Money, loyalty, validation)        │
//! │       └──────────────► tjp-db   (repositories over SQLite)          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tjp_db::{Database, DbConfig};
//! use tjp_ledger::{LedgerConfig, LedgerService, NewSale};
//!
//! let db = Database::new(DbConfig::new("./tjp_ledger.db")).await?;
//! let ledger = LedgerService::new(db, LedgerConfig::from_env());
//!
//! let recorded = ledger.record_sale(NewSale { /* ... */ }).await?;
//! println!("total {}", recorded.sale.total_amount());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod handoff;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::LedgerConfig;
pub use error::{ErrorCode, LedgerError, LedgerResult};
pub use handoff::{
    drain_pending, render_bill_message, whatsapp_draft_link, BillHandoff, BillPayload,
    DrainSummary, WhatsAppDraftHandoff,
};
pub use service::{LedgerService, NewSale, RecordedSale, SalePatch, SalesReport};
