//! # Sale Repository
//!
//! Database operations for the sales ledger.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        Sale Lifecycle                               │
//! │                                                                     │
//! │  1. RECORD                                                          │
//! │     └── insert() → Sale { paymentStatus: from paymentType }         │
//! │                                                                     │
//! │  2. (OPTIONAL) EDIT                                                 │
//! │     └── update_guarded() → totals recomputed by the service layer   │
//! │                                                                     │
//! │  3. (CREDIT ONLY) SETTLE                                            │
//! │     └── try_settle() → conditional UPDATE keyed on current status   │
//! │         Two concurrent settles race safely: exactly one succeeds,   │
//! │         the other observes zero rows affected                       │
//! │                                                                     │
//! │  4. (ADMIN ONLY) DELETE                                             │
//! │     └── delete() → hard delete, loyalty recomputes from what's left │
//! │                                                                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use tjp_core::{Money, PaymentStatus, PaymentType, ProductType, Sale, SettlementMethod};

/// Columns selected for every Sale read, in struct order.
const SALE_COLUMNS: &str = "\
    id, customer_name, contact_number, product_type, quantity, unit, \
    price_per_unit_paise, total_amount_paise, payment_type, payment_status, \
    settled_date, settled_by, date, created_at, updated_at";

// =============================================================================
// Query Surface Types
// =============================================================================

/// Read-side filter for listing sales.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaleFilter {
    /// Include sales with business date on or after this moment.
    pub start_date: Option<DateTime<Utc>>,
    /// Include sales with business date on or before this moment.
    pub end_date: Option<DateTime<Utc>>,
    pub product_type: Option<ProductType>,
    pub payment_type: Option<PaymentType>,
}

/// Grouped totals for daily/monthly reporting.
///
/// `credit_unpaid` is outstanding kadan; `credit_settled` is kadan that
/// has since been paid off (still tagged Credit for audit). `all` sums
/// every sale in range regardless of method or status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTotals {
    pub cash: Money,
    pub gpay: Money,
    pub credit_unpaid: Money,
    pub credit_settled: Money,
    pub all: Money,
}

// =============================================================================
// Sale Repository
// =============================================================================

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Gets a sale by its client-supplied idempotency key.
    pub async fn get_by_idempotency_key(&self, key: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE idempotency_key = ?1"
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Inserts a sale.
    ///
    /// ## Idempotency
    /// If `idempotency_key` is supplied and a sale with that key already
    /// exists, the stored sale is returned instead of inserting a
    /// duplicate. A caller that timed out can therefore retry the same
    /// request without double-recording a money-bearing write.
    pub async fn insert(&self, sale: &Sale, idempotency_key: Option<&str>) -> DbResult<Sale> {
        if let Some(key) = idempotency_key {
            if let Some(existing) = self.get_by_idempotency_key(key).await? {
                debug!(id = %existing.id, key = %key, "Idempotency key replay, returning stored sale");
                return Ok(existing);
            }
        }

        debug!(id = %sale.id, contact = %sale.contact_number, total = sale.total_amount_paise, "Inserting sale");

        let result = sqlx::query(
            r#"
            INSERT INTO sales (
                id, customer_name, contact_number, product_type, quantity, unit,
                price_per_unit_paise, total_amount_paise, payment_type, payment_status,
                settled_date, settled_by, date, idempotency_key, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14, ?15, ?16
            )
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.customer_name)
        .bind(&sale.contact_number)
        .bind(sale.product_type)
        .bind(sale.quantity)
        .bind(&sale.unit)
        .bind(sale.price_per_unit_paise)
        .bind(sale.total_amount_paise)
        .bind(sale.payment_type)
        .bind(sale.payment_status)
        .bind(sale.settled_date)
        .bind(sale.settled_by)
        .bind(sale.date)
        .bind(idempotency_key)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(sale.clone()),
            // Lost a race on the idempotency key: someone committed the
            // same request between our check and the insert.
            Err(e) => {
                let db_err: DbError = e.into();
                if let (DbError::UniqueViolation { ref field, .. }, Some(key)) =
                    (&db_err, idempotency_key)
                {
                    if field.contains("idempotency_key") {
                        if let Some(existing) = self.get_by_idempotency_key(key).await? {
                            return Ok(existing);
                        }
                    }
                }
                Err(db_err)
            }
        }
    }

    /// Updates an edited sale, guarded by the payment status the editor
    /// read.
    ///
    /// The service layer merges the patch and recomputes totals; this
    /// method writes the merged row only if the payment status is still
    /// what the editor saw, so an edit cannot clobber a concurrent
    /// settlement.
    pub async fn update_guarded(&self, sale: &Sale, expected: PaymentStatus) -> DbResult<()> {
        debug!(id = %sale.id, "Updating sale");

        let result = sqlx::query(
            r#"
            UPDATE sales SET
                customer_name = ?2,
                contact_number = ?3,
                product_type = ?4,
                quantity = ?5,
                unit = ?6,
                price_per_unit_paise = ?7,
                total_amount_paise = ?8,
                payment_type = ?9,
                payment_status = ?10,
                settled_date = ?11,
                settled_by = ?12,
                date = ?13,
                updated_at = ?14
            WHERE id = ?1 AND payment_status = ?15
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.customer_name)
        .bind(&sale.contact_number)
        .bind(sale.product_type)
        .bind(sale.quantity)
        .bind(&sale.unit)
        .bind(sale.price_per_unit_paise)
        .bind(sale.total_amount_paise)
        .bind(sale.payment_type)
        .bind(sale.payment_status)
        .bind(sale.settled_date)
        .bind(sale.settled_by)
        .bind(sale.date)
        .bind(sale.updated_at)
        .bind(expected)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get_by_id(&sale.id).await? {
                None => Err(DbError::not_found("Sale", &sale.id)),
                Some(_) => Err(DbError::TransactionFailed(format!(
                    "sale {} changed concurrently, re-read before editing",
                    sale.id
                ))),
            };
        }

        Ok(())
    }

    /// Attempts the Unpaid → Paid settlement transition.
    ///
    /// ## Atomicity
    /// A single conditional UPDATE keyed on the current payment state.
    /// Returns the settled sale on success, or `None` if no row matched
    /// - the caller then classifies the failure (not found / not a
    /// credit sale / already settled) from a fresh read.
    pub async fn try_settle(
        &self,
        id: &str,
        method: SettlementMethod,
        now: DateTime<Utc>,
    ) -> DbResult<Option<Sale>> {
        debug!(id = %id, method = %method, "Settling kadan");

        let result = sqlx::query(
            r#"
            UPDATE sales SET
                payment_status = 'paid',
                settled_date = ?2,
                settled_by = ?3,
                updated_at = ?2
            WHERE id = ?1 AND payment_type = 'credit' AND payment_status = 'unpaid'
            "#,
        )
        .bind(id)
        .bind(now)
        .bind(method)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_by_id(id).await
    }

    /// Hard-deletes a sale. Admin-only, destructive.
    ///
    /// Loyalty counters are derived, so they simply recompute from the
    /// remaining rows on the next query; no compensation runs here.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM sales WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", id));
        }

        debug!(id = %id, "Sale deleted");
        Ok(())
    }

    /// Lists sales matching the filter, newest business date first.
    pub async fn list(&self, filter: &SaleFilter) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            r#"
            SELECT {SALE_COLUMNS} FROM sales
            WHERE (?1 IS NULL OR date >= ?1)
              AND (?2 IS NULL OR date <= ?2)
              AND (?3 IS NULL OR product_type = ?3)
              AND (?4 IS NULL OR payment_type = ?4)
            ORDER BY date DESC
            "#
        ))
        .bind(filter.start_date)
        .bind(filter.end_date)
        .bind(filter.product_type)
        .bind(filter.payment_type)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Lists outstanding kadan (unpaid credit sales), newest first.
    pub async fn kadan_list(&self) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            r#"
            SELECT {SALE_COLUMNS} FROM sales
            WHERE payment_type = 'credit' AND payment_status = 'unpaid'
            ORDER BY date DESC
            "#
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Outstanding balance for one customer.
    ///
    /// This is THE formula for invariant 3: the sum of `totalAmount`
    /// over unpaid credit sales, computed from the ledger at query time.
    /// No running counter exists anywhere that could drift from it.
    pub async fn outstanding_balance(&self, contact_number: &str) -> DbResult<Money> {
        let paise: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT SUM(total_amount_paise) FROM sales
            WHERE contact_number = ?1
              AND payment_type = 'credit'
              AND payment_status = 'unpaid'
            "#,
        )
        .bind(contact_number)
        .fetch_one(&self.pool)
        .await?;

        Ok(Money::from_paise(paise.unwrap_or(0)))
    }

    /// Grouped totals by payment method over an optional date range.
    pub async fn totals_by_payment_method(
        &self,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
    ) -> DbResult<PaymentTotals> {
        let (cash, gpay, credit_unpaid, credit_settled, all): (i64, i64, i64, i64, i64) =
            sqlx::query_as(
                r#"
                SELECT
                    COALESCE(SUM(CASE WHEN payment_type = 'cash' THEN total_amount_paise ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN payment_type = 'gpay' THEN total_amount_paise ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN payment_type = 'credit' AND payment_status = 'unpaid' THEN total_amount_paise ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN payment_type = 'credit' AND payment_status = 'paid' THEN total_amount_paise ELSE 0 END), 0),
                    COALESCE(SUM(total_amount_paise), 0)
                FROM sales
                WHERE (?1 IS NULL OR date >= ?1)
                  AND (?2 IS NULL OR date <= ?2)
                "#,
            )
            .bind(start_date)
            .bind(end_date)
            .fetch_one(&self.pool)
            .await?;

        Ok(PaymentTotals {
            cash: Money::from_paise(cash),
            gpay: Money::from_paise(gpay),
            credit_unpaid: Money::from_paise(credit_unpaid),
            credit_settled: Money::from_paise(credit_settled),
            all: Money::from_paise(all),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use uuid::Uuid;

    fn sample_sale(contact: &str, payment_type: PaymentType, rupees: i64, qty: i64) -> Sale {
        let now = Utc::now();
        Sale {
            id: Uuid::new_v4().to_string(),
            customer_name: "Partha".to_string(),
            contact_number: contact.to_string(),
            product_type: ProductType::Mushroom,
            quantity: qty,
            unit: ProductType::Mushroom.unit().to_string(),
            price_per_unit_paise: Money::from_rupees(rupees).paise(),
            total_amount_paise: Money::from_rupees(rupees).multiply_quantity(qty).paise(),
            payment_type,
            payment_status: payment_type.initial_status(),
            settled_date: None,
            settled_by: None,
            date: now,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_fetch_roundtrip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let sale = sample_sale("9500591897", PaymentType::Cash, 50, 3);

        db.sales().insert(&sale, None).await.unwrap();

        let fetched = db.sales().get_by_id(&sale.id).await.unwrap().unwrap();
        assert_eq!(fetched.total_amount(), Money::from_rupees(150));
        assert_eq!(fetched.payment_status, PaymentStatus::Paid);
        assert_eq!(fetched.unit, "pockets");
    }

    #[tokio::test]
    async fn test_idempotency_key_replay_returns_stored_sale() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let first = sample_sale("9500591897", PaymentType::Cash, 50, 3);
        let retry = sample_sale("9500591897", PaymentType::Cash, 50, 3);

        let stored = db.sales().insert(&first, Some("req-1")).await.unwrap();
        let replayed = db.sales().insert(&retry, Some("req-1")).await.unwrap();

        // The retry did not create a second sale.
        assert_eq!(stored.id, replayed.id);
        let all = db.sales().list(&SaleFilter::default()).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_settle_is_idempotent_guarded() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let sale = sample_sale("9500591897", PaymentType::Credit, 50, 3);
        db.sales().insert(&sale, None).await.unwrap();

        let now = Utc::now();
        let settled = db
            .sales()
            .try_settle(&sale.id, SettlementMethod::Gpay, now)
            .await
            .unwrap()
            .expect("first settle succeeds");
        assert_eq!(settled.payment_status, PaymentStatus::Paid);
        assert_eq!(settled.settled_by, Some(SettlementMethod::Gpay));
        assert!(settled.settled_date.is_some());
        // paymentType stays Credit for audit
        assert_eq!(settled.payment_type, PaymentType::Credit);

        // Second settle matches no row: benign for the caller.
        let second = db
            .sales()
            .try_settle(&sale.id, SettlementMethod::Cash, Utc::now())
            .await
            .unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_outstanding_balance_single_formula() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let sales = db.sales();

        // Three kadan of ₹50, ₹75, ₹100 for one customer.
        let s50 = sample_sale("9500591897", PaymentType::Credit, 50, 1);
        let s75 = sample_sale("9500591897", PaymentType::Credit, 75, 1);
        let s100 = sample_sale("9500591897", PaymentType::Credit, 100, 1);
        // Noise: another customer's kadan and a cash sale.
        let other = sample_sale("9159659711", PaymentType::Credit, 500, 1);
        let cash = sample_sale("9500591897", PaymentType::Cash, 40, 2);

        for s in [&s50, &s75, &s100, &other, &cash] {
            sales.insert(s, None).await.unwrap();
        }

        assert_eq!(
            sales.outstanding_balance("9500591897").await.unwrap(),
            Money::from_rupees(225)
        );

        // Settling the ₹75 kadan decrements the balance exactly once.
        sales
            .try_settle(&s75.id, SettlementMethod::Cash, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            sales.outstanding_balance("9500591897").await.unwrap(),
            Money::from_rupees(150)
        );

        // Other customers' sales never leak in.
        assert_eq!(
            sales.outstanding_balance("9159659711").await.unwrap(),
            Money::from_rupees(500)
        );
    }

    #[tokio::test]
    async fn test_kadan_list_and_filters() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let sales = db.sales();

        let kadan = sample_sale("9500591897", PaymentType::Credit, 60, 2);
        let cash = sample_sale("9500591897", PaymentType::Cash, 60, 2);
        sales.insert(&kadan, None).await.unwrap();
        sales.insert(&cash, None).await.unwrap();

        let list = sales.kadan_list().await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, kadan.id);

        let filter = SaleFilter {
            payment_type: Some(PaymentType::Cash),
            ..Default::default()
        };
        let cash_only = sales.list(&filter).await.unwrap();
        assert_eq!(cash_only.len(), 1);
        assert_eq!(cash_only[0].id, cash.id);
    }

    #[tokio::test]
    async fn test_totals_by_payment_method() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let sales = db.sales();

        sales
            .insert(&sample_sale("1111111", PaymentType::Cash, 100, 1), None)
            .await
            .unwrap();
        sales
            .insert(&sample_sale("2222222", PaymentType::Gpay, 200, 1), None)
            .await
            .unwrap();
        let kadan = sample_sale("3333333", PaymentType::Credit, 300, 1);
        sales.insert(&kadan, None).await.unwrap();

        let totals = sales.totals_by_payment_method(None, None).await.unwrap();
        assert_eq!(totals.cash, Money::from_rupees(100));
        assert_eq!(totals.gpay, Money::from_rupees(200));
        assert_eq!(totals.credit_unpaid, Money::from_rupees(300));
        assert_eq!(totals.credit_settled, Money::zero());
        assert_eq!(totals.all, Money::from_rupees(600));

        // Settlement moves the kadan bucket without changing `all`.
        sales
            .try_settle(&kadan.id, SettlementMethod::Gpay, Utc::now())
            .await
            .unwrap()
            .unwrap();
        let totals = sales.totals_by_payment_method(None, None).await.unwrap();
        assert_eq!(totals.credit_unpaid, Money::zero());
        assert_eq!(totals.credit_settled, Money::from_rupees(300));
        assert_eq!(totals.all, Money::from_rupees(600));
    }

    #[tokio::test]
    async fn test_delete_not_found() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db.sales().delete("missing-id").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
