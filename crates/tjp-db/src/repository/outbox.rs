//! # Bill Outbox Repository
//!
//! Durable queue of bill payloads awaiting hand-off.
//!
//! ## Outbox Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Bill Delivery Flow                             │
//! │                                                                     │
//! │  recordSale ──► queue() row written AFTER the sale commits          │
//! │                     │                                               │
//! │                     ▼                                               │
//! │  drain loop ──► get_pending(limit) ──► hand-off attempt             │
//! │                     │                        │                      │
//! │                     │              ┌─────────┴─────────┐            │
//! │                     │              ▼                   ▼            │
//! │                     │       mark_delivered()    mark_failed()       │
//! │                     │                           (attempts += 1)     │
//! │                     │                                               │
//! │  Entries past the attempt cap are skipped, never deleted - the      │
//! │  operator can inspect or requeue them by hand.                      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failed or delayed bill never affects the sale it belongs to; the
//! ledger row is already committed by the time anything lands here.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::error::DbResult;
use tjp_core::BillOutboxEntry;

const OUTBOX_COLUMNS: &str = "\
    id, sale_id, contact_number, payload, attempts, last_error, \
    created_at, attempted_at, delivered_at";

/// Repository for the bill outbox queue.
#[derive(Debug, Clone)]
pub struct BillOutboxRepository {
    pool: SqlitePool,
}

impl BillOutboxRepository {
    /// Creates a new BillOutboxRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BillOutboxRepository { pool }
    }

    /// Queues a bill payload for delivery.
    pub async fn queue(&self, entry: &BillOutboxEntry) -> DbResult<()> {
        debug!(id = %entry.id, sale_id = %entry.sale_id, "Queueing bill");

        sqlx::query(
            r#"
            INSERT INTO bill_outbox (
                id, sale_id, contact_number, payload, attempts, last_error,
                created_at, attempted_at, delivered_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.sale_id)
        .bind(&entry.contact_number)
        .bind(&entry.payload)
        .bind(entry.attempts)
        .bind(&entry.last_error)
        .bind(entry.created_at)
        .bind(entry.attempted_at)
        .bind(entry.delivered_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets undelivered entries with fewer than `max_attempts` tries,
    /// oldest first.
    pub async fn get_pending(
        &self,
        limit: i64,
        max_attempts: i64,
    ) -> DbResult<Vec<BillOutboxEntry>> {
        let entries = sqlx::query_as::<_, BillOutboxEntry>(&format!(
            r#"
            SELECT {OUTBOX_COLUMNS} FROM bill_outbox
            WHERE delivered_at IS NULL AND attempts < ?1
            ORDER BY created_at ASC
            LIMIT ?2
            "#
        ))
        .bind(max_attempts)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Marks an entry delivered.
    pub async fn mark_delivered(&self, id: &str, now: DateTime<Utc>) -> DbResult<()> {
        sqlx::query(
            "UPDATE bill_outbox SET delivered_at = ?2, attempted_at = ?2, \
             attempts = attempts + 1, last_error = NULL WHERE id = ?1",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!(id = %id, "Bill delivered");
        Ok(())
    }

    /// Records a failed delivery attempt.
    pub async fn mark_failed(&self, id: &str, error: &str, now: DateTime<Utc>) -> DbResult<()> {
        warn!(id = %id, error = %error, "Bill delivery failed");

        sqlx::query(
            "UPDATE bill_outbox SET attempts = attempts + 1, last_error = ?2, \
             attempted_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(error)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Counts undelivered entries (including ones past the attempt cap).
    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM bill_outbox WHERE delivered_at IS NULL")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use tjp_core::{Money, PaymentType, ProductType, Sale};
    use uuid::Uuid;

    async fn seeded_sale(db: &Database) -> Sale {
        let now = Utc::now();
        let sale = Sale {
            id: Uuid::new_v4().to_string(),
            customer_name: "Ravi".to_string(),
            contact_number: "9500591897".to_string(),
            product_type: ProductType::Mushroom,
            quantity: 2,
            unit: "pockets".to_string(),
            price_per_unit_paise: Money::from_rupees(50).paise(),
            total_amount_paise: Money::from_rupees(100).paise(),
            payment_type: PaymentType::Cash,
            payment_status: PaymentType::Cash.initial_status(),
            settled_date: None,
            settled_by: None,
            date: now,
            created_at: now,
            updated_at: now,
        };
        db.sales().insert(&sale, None).await.unwrap();
        sale
    }

    fn entry_for(sale: &Sale) -> BillOutboxEntry {
        BillOutboxEntry {
            id: Uuid::new_v4().to_string(),
            sale_id: sale.id.clone(),
            contact_number: sale.contact_number.clone(),
            payload: "{}".to_string(),
            attempts: 0,
            last_error: None,
            created_at: Utc::now(),
            attempted_at: None,
            delivered_at: None,
        }
    }

    #[tokio::test]
    async fn test_queue_and_drain_lifecycle() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let sale = seeded_sale(&db).await;
        let outbox = db.bill_outbox();

        let entry = entry_for(&sale);
        outbox.queue(&entry).await.unwrap();
        assert_eq!(outbox.count_pending().await.unwrap(), 1);

        let pending = outbox.get_pending(10, 5).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, entry.id);

        outbox.mark_delivered(&entry.id, Utc::now()).await.unwrap();
        assert_eq!(outbox.count_pending().await.unwrap(), 0);
        assert!(outbox.get_pending(10, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_attempt_cap_skips_poison_entries() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let sale = seeded_sale(&db).await;
        let outbox = db.bill_outbox();

        let entry = entry_for(&sale);
        outbox.queue(&entry).await.unwrap();

        for _ in 0..3 {
            outbox
                .mark_failed(&entry.id, "handset unreachable", Utc::now())
                .await
                .unwrap();
        }

        // Past the cap: drained no more, but still visible as pending.
        assert!(outbox.get_pending(10, 3).await.unwrap().is_empty());
        assert_eq!(outbox.count_pending().await.unwrap(), 1);

        let with_higher_cap = outbox.get_pending(10, 5).await.unwrap();
        assert_eq!(with_higher_cap.len(), 1);
        assert_eq!(with_higher_cap[0].attempts, 3);
        assert_eq!(
            with_higher_cap[0].last_error.as_deref(),
            Some("handset unreachable")
        );
    }

    #[tokio::test]
    async fn test_deleting_sale_cascades_outbox() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let sale = seeded_sale(&db).await;
        let outbox = db.bill_outbox();

        outbox.queue(&entry_for(&sale)).await.unwrap();
        db.sales().delete(&sale.id).await.unwrap();

        assert_eq!(outbox.count_pending().await.unwrap(), 0);
    }
}
