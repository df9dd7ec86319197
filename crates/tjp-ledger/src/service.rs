//! # Ledger Service
//!
//! Orchestration of the ledger's operations. This is the only layer
//! that combines rules (tjp-core), storage (tjp-db) and the bill
//! hand-off; callers (CLI, HTTP adapter, desktop shell) talk to
//! [`LedgerService`] and nothing below it.
//!
//! ## Write Path Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        record_sale                                  │
//! │                                                                     │
//! │  validate ─► derive (unit, total, status) ─► INSERT sale  ◄── the  │
//! │                                                  │      money-     │
//! │                                                  │      bearing    │
//! │                    best-effort, logged, never ───┤      write      │
//! │                    fails the sale:               │                  │
//! │                      ├── upsert customer         ▼                  │
//! │                      └── queue bill outbox   loyalty delta          │
//! │                                                  │                  │
//! │                                                  ▼                  │
//! │                               RecordedSale { sale, loyalty }        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use tjp_core::{
    validation, CoreError, LoyaltyDelta, LoyaltySnapshot, Money, PaymentStatus, PaymentType,
    ProductType, Sale, SettlementMethod,
};
use tjp_db::{Database, PaymentTotals, SaleFilter};

use crate::config::LedgerConfig;
use crate::error::{ErrorCode, LedgerError, LedgerResult};
use crate::handoff::{self, BillPayload};

// =============================================================================
// Request / Response Types
// =============================================================================

/// Input for recording a sale.
///
/// `unit`, `total_amount` and `payment_status` are deliberately absent:
/// they are derived server-side and never trusted from the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSale {
    pub customer_name: String,
    pub contact_number: String,
    pub product_type: ProductType,
    pub quantity: i64,
    pub price_per_unit_paise: i64,
    pub payment_type: PaymentType,
    /// Business date; defaults to now. Operators may back-date.
    pub date: Option<DateTime<Utc>>,
    /// Optional client key making a retried submit return the original
    /// sale instead of double-recording.
    pub idempotency_key: Option<String>,
}

/// Partial update for an existing sale. `None` fields keep their value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SalePatch {
    pub customer_name: Option<String>,
    pub contact_number: Option<String>,
    pub product_type: Option<ProductType>,
    pub quantity: Option<i64>,
    pub price_per_unit_paise: Option<i64>,
    pub payment_type: Option<PaymentType>,
    pub date: Option<DateTime<Utc>>,
    /// Required when the edit pays off an outstanding kadan.
    pub settled_by: Option<SettlementMethod>,
}

/// A recorded sale together with its loyalty movement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedSale {
    pub sale: Sale,
    pub loyalty: LoyaltyDelta,
}

/// A list of sales with their grand total, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesReport {
    pub sales: Vec<Sale>,
    pub total: Money,
}

impl SalesReport {
    fn from_sales(sales: Vec<Sale>) -> Self {
        let total = sales.iter().map(Sale::total_amount).sum();
        SalesReport { sales, total }
    }
}

// =============================================================================
// Ledger Service
// =============================================================================

/// The farm ledger service.
#[derive(Debug, Clone)]
pub struct LedgerService {
    db: Database,
    config: LedgerConfig,
}

impl LedgerService {
    /// Creates a service over an initialized database.
    pub fn new(db: Database, config: LedgerConfig) -> Self {
        LedgerService { db, config }
    }

    /// The underlying database handle (for the outbox drain loop).
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// The active configuration.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // =========================================================================
    // Sales
    // =========================================================================

    /// Records a sale and returns it with its loyalty movement.
    ///
    /// The sale INSERT is the single money-bearing write. The customer
    /// upsert and the bill outbox entry come after it and are
    /// best-effort: their failure is logged and never rolls back or
    /// fails the sale.
    pub async fn record_sale(&self, input: NewSale) -> LedgerResult<RecordedSale> {
        validation::validate_customer_name(&input.customer_name).map_err(CoreError::from)?;
        let contact =
            validation::validate_contact_number(&input.contact_number).map_err(CoreError::from)?;
        validation::validate_quantity(input.quantity).map_err(CoreError::from)?;
        validation::validate_price_paise(input.price_per_unit_paise).map_err(CoreError::from)?;

        let now = Utc::now();
        let price = Money::from_paise(input.price_per_unit_paise);

        let sale = Sale {
            id: Uuid::new_v4().to_string(),
            customer_name: input.customer_name.trim().to_string(),
            contact_number: contact.clone(),
            product_type: input.product_type,
            quantity: input.quantity,
            unit: input.product_type.unit().to_string(),
            price_per_unit_paise: price.paise(),
            total_amount_paise: price.multiply_quantity(input.quantity).paise(),
            payment_type: input.payment_type,
            payment_status: input.payment_type.initial_status(),
            settled_date: None,
            settled_by: None,
            date: input.date.unwrap_or(now),
            created_at: now,
            updated_at: now,
        };

        // Loyalty position before this sale lands.
        let lifetime_before = self.db.customers().lifetime_pockets(&contact).await?;
        let last_reset_at = self
            .db
            .customers()
            .get(&contact)
            .await?
            .and_then(|c| c.last_reset_at);

        let stored = self
            .db
            .sales()
            .insert(&sale, input.idempotency_key.as_deref())
            .await?;

        if stored.id != sale.id {
            // Idempotency replay: the original already moved the
            // counters, this request moves nothing.
            info!(id = %stored.id, "Sale replayed via idempotency key");
            let loyalty = LoyaltyDelta {
                contact_number: contact,
                lifetime_before,
                lifetime_after: lifetime_before,
                reached: Vec::new(),
            };
            return Ok(RecordedSale { sale: stored, loyalty });
        }

        // A sale back-dated into a closed cycle is excluded from the
        // derived lifetime sum, so the delta must not count it either.
        let counted_quantity = match last_reset_at {
            Some(reset) if sale.date <= reset => 0,
            _ => sale.quantity,
        };
        let loyalty = LoyaltyDelta::for_sale(
            contact.clone(),
            lifetime_before,
            sale.product_type,
            counted_quantity,
            &self.config.loyalty,
        );

        info!(
            id = %stored.id,
            contact = %contact,
            total = %stored.total_amount(),
            payment = ?stored.payment_type,
            pockets = loyalty.lifetime_after,
            "Sale recorded"
        );

        // Side effects after the commit. Failures here must not fail
        // the sale the operator just recorded.
        if let Err(e) = self
            .db
            .customers()
            .upsert(&contact, &stored.customer_name, now)
            .await
        {
            warn!(contact = %contact, error = %e, "Customer upsert failed after sale");
        }

        let payload = BillPayload {
            sale: stored.clone(),
            loyalty: loyalty.clone(),
            farm_name: self.config.farm_name.clone(),
            order_phone: self.config.order_phone.clone(),
        };
        if let Err(e) = handoff::queue_bill(&self.db, &payload, now).await {
            warn!(sale_id = %stored.id, error = %e, "Bill queueing failed after sale");
        }

        Ok(RecordedSale { sale: stored, loyalty })
    }

    /// Edits a sale, recomputing derived fields.
    ///
    /// ## Transition Rules
    /// - A settled kadan is terminal: its payment fields cannot change.
    /// - Moving an outstanding kadan off Credit requires `settled_by`
    ///   in the patch; the edit then settles the kadan (paymentType
    ///   stays Credit for audit) instead of silently erasing the debt.
    /// - Changing a paid sale onto Credit reopens it as a fresh kadan.
    pub async fn edit_sale(&self, id: &str, patch: SalePatch) -> LedgerResult<Sale> {
        validation::validate_sale_id(id).map_err(CoreError::from)?;

        let current = self
            .db
            .sales()
            .get_by_id(id)
            .await?
            .ok_or_else(|| LedgerError::from(CoreError::SaleNotFound(id.to_string())))?;

        let expected = current.payment_status;
        let now = Utc::now();
        let mut updated = current.clone();

        if let Some(name) = patch.customer_name {
            validation::validate_customer_name(&name).map_err(CoreError::from)?;
            updated.customer_name = name.trim().to_string();
        }
        if let Some(contact) = patch.contact_number {
            updated.contact_number =
                validation::validate_contact_number(&contact).map_err(CoreError::from)?;
        }
        if let Some(product) = patch.product_type {
            updated.product_type = product;
            updated.unit = product.unit().to_string();
        }
        if let Some(qty) = patch.quantity {
            validation::validate_quantity(qty).map_err(CoreError::from)?;
            updated.quantity = qty;
        }
        if let Some(price) = patch.price_per_unit_paise {
            validation::validate_price_paise(price).map_err(CoreError::from)?;
            updated.price_per_unit_paise = price;
        }
        if let Some(date) = patch.date {
            updated.date = date;
        }

        if let Some(new_payment) = patch.payment_type {
            self.apply_payment_change(&current, &mut updated, new_payment, patch.settled_by, now)?;
        }

        // Derived fields are never trusted from the patch.
        updated.total_amount_paise = updated
            .price_per_unit()
            .multiply_quantity(updated.quantity)
            .paise();
        updated.updated_at = now;

        self.db.sales().update_guarded(&updated, expected).await?;

        if updated.contact_number != current.contact_number {
            // The reassigned history must stay visible on the loyalty
            // surface under its new key.
            if let Err(e) = self
                .db
                .customers()
                .upsert(&updated.contact_number, &updated.customer_name, now)
                .await
            {
                warn!(
                    contact = %updated.contact_number,
                    error = %e,
                    "Customer upsert failed after contact edit"
                );
            }
        }

        info!(id = %updated.id, total = %updated.total_amount(), "Sale edited");
        Ok(updated)
    }

    /// Applies a payment-type change to an edit in progress.
    fn apply_payment_change(
        &self,
        current: &Sale,
        updated: &mut Sale,
        new_payment: PaymentType,
        settled_by: Option<SettlementMethod>,
        now: DateTime<Utc>,
    ) -> LedgerResult<()> {
        if new_payment == current.payment_type {
            return Ok(());
        }

        if current.payment_type.is_credit() && current.payment_status == PaymentStatus::Paid {
            return Err(CoreError::InvalidTransition {
                sale_id: current.id.clone(),
                reason: "a settled kadan cannot change payment type".to_string(),
            }
            .into());
        }

        if current.is_outstanding_kadan() {
            // The debt must be settled, not edited away.
            let method = settled_by.ok_or_else(|| {
                LedgerError::from(CoreError::InvalidTransition {
                    sale_id: current.id.clone(),
                    reason: "moving an outstanding kadan off credit requires settledBy"
                        .to_string(),
                })
            })?;
            updated.payment_type = PaymentType::Credit;
            updated.payment_status = PaymentStatus::Paid;
            updated.settled_date = Some(now);
            updated.settled_by = Some(method);
            return Ok(());
        }

        // Paid sale changing method.
        updated.payment_type = new_payment;
        if new_payment.is_credit() {
            // Reopened as a fresh kadan.
            updated.payment_status = PaymentStatus::Unpaid;
            updated.settled_date = None;
            updated.settled_by = None;
        } else {
            updated.payment_status = PaymentStatus::Paid;
        }
        Ok(())
    }

    /// Deletes a sale. Destructive and admin-only; derived loyalty and
    /// balances recompute from the remaining history.
    pub async fn delete_sale(&self, id: &str) -> LedgerResult<()> {
        validation::validate_sale_id(id).map_err(CoreError::from)?;
        self.db.sales().delete(id).await?;
        info!(id = %id, "Sale deleted");
        Ok(())
    }

    /// Settles an outstanding kadan.
    ///
    /// Safe under concurrent double-submission: the storage layer's
    /// conditional update lets exactly one settle succeed; the loser is
    /// classified here from a fresh read.
    pub async fn settle(&self, id: &str, method: SettlementMethod) -> LedgerResult<Sale> {
        validation::validate_sale_id(id).map_err(CoreError::from)?;

        let now = Utc::now();
        if let Some(sale) = self.db.sales().try_settle(id, method, now).await? {
            info!(id = %id, method = %method, amount = %sale.total_amount(), "Kadan settled");
            return Ok(sale);
        }

        // No row matched: find out why.
        match self.db.sales().get_by_id(id).await? {
            None => Err(CoreError::SaleNotFound(id.to_string()).into()),
            Some(sale) if !sale.payment_type.is_credit() => {
                Err(CoreError::NotCreditSale(id.to_string()).into())
            }
            Some(sale) if sale.payment_status == PaymentStatus::Paid => {
                Err(CoreError::AlreadySettled(id.to_string()).into())
            }
            Some(_) => Err(LedgerError::new(
                ErrorCode::Conflict,
                format!("settlement of sale {id} raced another update, retry"),
            )),
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Lists sales matching the filter, with their grand total.
    pub async fn list_sales(&self, filter: &SaleFilter) -> LedgerResult<SalesReport> {
        let sales = self.db.sales().list(filter).await?;
        Ok(SalesReport::from_sales(sales))
    }

    /// All outstanding kadan with the total still owed.
    pub async fn kadan_list(&self) -> LedgerResult<SalesReport> {
        let sales = self.db.sales().kadan_list().await?;
        Ok(SalesReport::from_sales(sales))
    }

    /// Outstanding kadan balance for one customer.
    pub async fn outstanding_balance(&self, contact_number: &str) -> LedgerResult<Money> {
        let contact =
            validation::validate_contact_number(contact_number).map_err(CoreError::from)?;
        Ok(self.db.sales().outstanding_balance(&contact).await?)
    }

    /// Totals grouped by payment method over an optional date range.
    pub async fn totals_by_payment_method(
        &self,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
    ) -> LedgerResult<PaymentTotals> {
        Ok(self
            .db
            .sales()
            .totals_by_payment_method(start_date, end_date)
            .await?)
    }

    // =========================================================================
    // Customers & Loyalty
    // =========================================================================

    /// All customers with their derived loyalty position.
    pub async fn customers(&self) -> LedgerResult<Vec<LoyaltySnapshot>> {
        let rows = self.db.customers().list_with_lifetime().await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                LoyaltySnapshot::derive(
                    row.contact_number,
                    row.name,
                    row.lifetime_pockets,
                    row.last_reset_at,
                    &self.config.loyalty,
                )
            })
            .collect())
    }

    /// Loyalty snapshot for one customer.
    pub async fn loyalty(&self, contact_number: &str) -> LedgerResult<LoyaltySnapshot> {
        let contact =
            validation::validate_contact_number(contact_number).map_err(CoreError::from)?;

        let customer = self
            .db
            .customers()
            .get(&contact)
            .await?
            .ok_or_else(|| LedgerError::from(CoreError::CustomerNotFound(contact.clone())))?;

        let pockets = self.db.customers().lifetime_pockets(&contact).await?;
        Ok(LoyaltySnapshot::derive(
            customer.contact_number,
            customer.name,
            pockets,
            customer.last_reset_at,
            &self.config.loyalty,
        ))
    }

    /// Resets a customer's loyalty cycle after a reward was handed over.
    ///
    /// Explicit and operator-confirmed: sales dated on or before the
    /// reset stop counting, any unredeemed milestone is forfeited.
    pub async fn reset_loyalty(&self, contact_number: &str) -> LedgerResult<LoyaltySnapshot> {
        let contact =
            validation::validate_contact_number(contact_number).map_err(CoreError::from)?;

        let now = Utc::now();
        let customer = self.db.customers().reset_loyalty(&contact, now).await?;
        let pockets = self.db.customers().lifetime_pockets(&contact).await?;

        info!(contact = %contact, "Loyalty cycle reset");
        Ok(LoyaltySnapshot::derive(
            customer.contact_number,
            customer.name,
            pockets,
            customer.last_reset_at,
            &self.config.loyalty,
        ))
    }
}
