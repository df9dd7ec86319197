//! # Customer Repository
//!
//! Phone-keyed customer rows and the loyalty reset marker.
//!
//! ## Derived Loyalty
//! The lifetime pocket count is never stored. It is the SUM of mushroom
//! quantities over this customer's sales with a business date strictly
//! after `last_reset_at` (or all of them when no reset has happened).
//! Deleting or editing a sale changes the next query's answer and
//! nothing else, so the counter cannot drift from the ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use tjp_core::Customer;

/// One row of the customer list with its derived lifetime count.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CustomerLifetimeRow {
    pub contact_number: String,
    pub name: String,
    pub last_reset_at: Option<DateTime<Utc>>,
    pub lifetime_pockets: i64,
}

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Gets a customer by contact number.
    pub async fn get(&self, contact_number: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT contact_number, name, last_reset_at, created_at, updated_at \
             FROM customers WHERE contact_number = ?1",
        )
        .bind(contact_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Creates the customer row if missing, otherwise refreshes the name.
    ///
    /// Every recorded sale passes through here, so the customer list is
    /// always exactly "everyone who has ever bought something". The
    /// reset marker is never touched by an upsert.
    pub async fn upsert(&self, contact_number: &str, name: &str, now: DateTime<Utc>) -> DbResult<()> {
        debug!(contact = %contact_number, "Upserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (contact_number, name, last_reset_at, created_at, updated_at)
            VALUES (?1, ?2, NULL, ?3, ?3)
            ON CONFLICT (contact_number) DO UPDATE SET
                name = excluded.name,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(contact_number)
        .bind(name)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Lifetime mushroom pockets for one customer since their last reset.
    pub async fn lifetime_pockets(&self, contact_number: &str) -> DbResult<i64> {
        let pockets: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT SUM(s.quantity)
            FROM sales s
            LEFT JOIN customers c ON c.contact_number = s.contact_number
            WHERE s.contact_number = ?1
              AND s.product_type = 'mushroom'
              AND (c.last_reset_at IS NULL OR s.date > c.last_reset_at)
            "#,
        )
        .bind(contact_number)
        .fetch_one(&self.pool)
        .await?;

        Ok(pockets.unwrap_or(0))
    }

    /// Lists all customers with their derived lifetime counts, best
    /// loyalty position first.
    pub async fn list_with_lifetime(&self) -> DbResult<Vec<CustomerLifetimeRow>> {
        let rows = sqlx::query_as::<_, CustomerLifetimeRow>(
            r#"
            SELECT
                c.contact_number,
                c.name,
                c.last_reset_at,
                COALESCE(SUM(
                    CASE
                        WHEN s.product_type = 'mushroom'
                         AND (c.last_reset_at IS NULL OR s.date > c.last_reset_at)
                        THEN s.quantity
                        ELSE 0
                    END
                ), 0) AS lifetime_pockets
            FROM customers c
            LEFT JOIN sales s ON s.contact_number = c.contact_number
            GROUP BY c.contact_number
            ORDER BY lifetime_pockets DESC, c.name COLLATE NOCASE
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Moves the loyalty reset marker to `now`.
    ///
    /// Sales dated on or before the marker stop counting; history is
    /// untouched, so an accidental reset is recoverable by clearing the
    /// marker in the database.
    pub async fn reset_loyalty(
        &self,
        contact_number: &str,
        now: DateTime<Utc>,
    ) -> DbResult<Customer> {
        debug!(contact = %contact_number, "Resetting loyalty cycle");

        let result = sqlx::query(
            "UPDATE customers SET last_reset_at = ?2, updated_at = ?2 WHERE contact_number = ?1",
        )
        .bind(contact_number)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", contact_number));
        }

        self.get(contact_number)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", contact_number))
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

    fn mushroom_sale(contact: &str, qty: i64, date: DateTime<Utc>) -> Sale {
        Sale {
            id: Uuid::new_v4().to_string(),
            customer_name: "Kumar".to_string(),
            contact_number: contact.to_string(),
            product_type: ProductType::Mushroom,
            quantity: qty,
            unit: "pockets".to_string(),
            price_per_unit_paise: Money::from_rupees(50).paise(),
            total_amount_paise: Money::from_rupees(50).multiply_quantity(qty).paise(),
            payment_type: PaymentType::Cash,
            payment_status: PaymentType::Cash.initial_status(),
            settled_date: None,
            settled_by: None,
            date,
            created_at: date,
            updated_at: date,
        }
    }

    #[tokio::test]
    async fn test_upsert_creates_then_refreshes_name() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let customers = db.customers();
        let now = Utc::now();

        customers.upsert("9500591897", "Kumar", now).await.unwrap();
        customers.upsert("9500591897", "Kumar S", now).await.unwrap();

        let customer = customers.get("9500591897").await.unwrap().unwrap();
        assert_eq!(customer.name, "Kumar S");
        assert!(customer.last_reset_at.is_none());
    }

    #[tokio::test]
    async fn test_lifetime_pockets_derived_and_reset() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();
        db.customers().upsert("9500591897", "Kumar", now).await.unwrap();

        let early = now - chrono::Duration::days(10);
        db.sales()
            .insert(&mushroom_sale("9500591897", 8, early), None)
            .await
            .unwrap();
        db.sales()
            .insert(&mushroom_sale("9500591897", 5, now), None)
            .await
            .unwrap();

        assert_eq!(db.customers().lifetime_pockets("9500591897").await.unwrap(), 13);

        // Reset between the two sales: only the later one still counts.
        let marker = now - chrono::Duration::days(5);
        db.customers()
            .reset_loyalty("9500591897", marker)
            .await
            .unwrap();
        assert_eq!(db.customers().lifetime_pockets("9500591897").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_seeds_never_count() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();
        db.customers().upsert("9500591897", "Kumar", now).await.unwrap();

        let mut seeds = mushroom_sale("9500591897", 50, now);
        seeds.product_type = ProductType::Seeds;
        seeds.unit = "kg".to_string();
        db.sales().insert(&seeds, None).await.unwrap();

        assert_eq!(db.customers().lifetime_pockets("9500591897").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_with_lifetime() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();
        db.customers().upsert("9500591897", "Kumar", now).await.unwrap();
        db.customers().upsert("9159659711", "Anitha", now).await.unwrap();
        db.sales()
            .insert(&mushroom_sale("9500591897", 4, now), None)
            .await
            .unwrap();

        let rows = db.customers().list_with_lifetime().await.unwrap();
        assert_eq!(rows.len(), 2);
        // Highest lifetime count first.
        assert_eq!(rows[0].name, "Kumar");
        assert_eq!(rows[0].lifetime_pockets, 4);
        assert_eq!(rows[1].name, "Anitha");
        assert_eq!(rows[1].lifetime_pockets, 0);
    }

    #[tokio::test]
    async fn test_reset_unknown_customer() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db
            .customers()
            .reset_loyalty("0000000", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
