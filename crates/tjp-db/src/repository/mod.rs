//! # Repository Modules
//!
//! Data access layer. Each repository owns a clone of the pool and the
//! SQL for one table; business rules stay out of this layer and live in
//! tjp-ledger.

pub mod customer;
pub mod outbox;
pub mod sale;

pub use customer::{CustomerLifetimeRow, CustomerRepository};
pub use outbox::BillOutboxRepository;
pub use sale::{PaymentTotals, SaleFilter, SaleRepository};
