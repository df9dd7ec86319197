//! # Bill Hand-off
//!
//! Renders bill messages and drains the outbox toward the delivery
//! collaborator.
//!
//! ## Human-completed Delivery
//! The farm sends bills over WhatsApp from the operator's own handset.
//! This module therefore never talks to a network API: "delivery" means
//! producing a prefilled `wa.me` draft link for the operator to tap.
//! The [`BillHandoff`] trait keeps that boundary swappable (a real API
//! client, a printer, a test probe) without touching the drain loop.
//!
//! A failed or delayed hand-off never affects the sale it belongs to;
//! the ledger row committed before the outbox entry was even written.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use tjp_core::{BillOutboxEntry, LoyaltyDelta, Milestone, Sale};
use tjp_db::Database;

use crate::error::LedgerResult;

// =============================================================================
// Payload
// =============================================================================

/// The `{ sale, loyalty }` payload queued for every recorded sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillPayload {
    pub sale: Sale,
    pub loyalty: LoyaltyDelta,
    pub farm_name: String,
    pub order_phone: String,
}

/// Queues a bill payload in the outbox.
pub(crate) async fn queue_bill(
    db: &Database,
    payload: &BillPayload,
    now: chrono::DateTime<Utc>,
) -> LedgerResult<()> {
    let entry = BillOutboxEntry {
        id: Uuid::new_v4().to_string(),
        sale_id: payload.sale.id.clone(),
        contact_number: payload.sale.contact_number.clone(),
        payload: serde_json::to_string(payload).unwrap_or_else(|_| "{}".to_string()),
        attempts: 0,
        last_error: None,
        created_at: now,
        attempted_at: None,
        delivered_at: None,
    };
    db.bill_outbox().queue(&entry).await?;
    Ok(())
}

// =============================================================================
// Rendering
// =============================================================================

/// Renders the WhatsApp bill message for a recorded sale.
pub fn render_bill_message(payload: &BillPayload) -> String {
    let sale = &payload.sale;

    let mut message = format!(
        "✅ *{} - DIGITAL BILL*\n\n\
         வணக்கம் *{}*! 👋\n\n\
         🍄 {:?}: {} {} x {}\n\
         💰 *Total: {}*\n\
         💳 Payment: {:?}\n",
        payload.farm_name.to_uppercase(),
        sale.customer_name,
        sale.product_type,
        sale.quantity,
        sale.unit,
        sale.price_per_unit(),
        sale.total_amount(),
        sale.payment_type,
    );

    if sale.is_outstanding_kadan() {
        message.push_str("📝 *Kadan noted - balance due.*\n");
    }

    for milestone in &payload.loyalty.reached {
        match milestone {
            Milestone::FreePocket => {
                message.push_str(
                    "\n🎉 வாழ்த்துக்கள்! Loyalty cycle complete!\n\
                     🍄 உங்கள் அடுத்த order-ல் 1 FREE POCKET பெறலாம்!\n",
                );
            }
            Milestone::BulkReward => {
                message.push_str("\n🔥 BULK OFFER unlocked: 2 FREE POCKETS on your next order!\n");
            }
        }
    }

    message.push_str(&format!(
        "\n📞 Order செய்ய: {}\n\nநன்றி! மீண்டும் வருக! 🙏✨",
        payload.order_phone
    ));

    message
}

/// Builds a `wa.me` draft link the operator taps to send the bill.
///
/// Matches the farm's convention: digits only, 10-digit local numbers
/// get the 91 country prefix.
pub fn whatsapp_draft_link(contact_number: &str, message: &str) -> String {
    let digits: String = contact_number.chars().filter(|c| c.is_ascii_digit()).collect();
    let full = if digits.len() == 10 {
        format!("91{digits}")
    } else {
        digits
    };
    format!("https://wa.me/{}?text={}", full, percent_encode(message))
}

/// Percent-encodes a string for use in a URL query value.
fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len() * 3);
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

// =============================================================================
// Hand-off Boundary
// =============================================================================

/// The delivery collaborator the drain loop hands bills to.
pub trait BillHandoff {
    /// Attempts to hand off one bill. An `Err` is recorded on the
    /// outbox entry and retried on the next drain.
    fn deliver(&self, payload: &BillPayload) -> Result<(), String>;
}

/// Default hand-off: surfaces the prefilled `wa.me` draft link in the
/// log for the operator. Always succeeds - the human completes the send.
#[derive(Debug, Clone, Default)]
pub struct WhatsAppDraftHandoff;

impl BillHandoff for WhatsAppDraftHandoff {
    fn deliver(&self, payload: &BillPayload) -> Result<(), String> {
        let message = render_bill_message(payload);
        let link = whatsapp_draft_link(&payload.sale.contact_number, &message);
        info!(sale_id = %payload.sale.id, link = %link, "Bill draft ready");
        Ok(())
    }
}

// =============================================================================
// Drain Loop
// =============================================================================

/// Result of one outbox drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainSummary {
    pub delivered: usize,
    pub failed: usize,
}

/// Drains pending outbox entries through the hand-off, oldest first.
///
/// Entries past `max_attempts` are skipped and stay visible for manual
/// inspection; an unparseable payload is counted as a failed attempt.
pub async fn drain_pending(
    db: &Database,
    handoff: &dyn BillHandoff,
    limit: i64,
    max_attempts: i64,
) -> LedgerResult<DrainSummary> {
    let pending = db.bill_outbox().get_pending(limit, max_attempts).await?;
    let mut summary = DrainSummary::default();

    for entry in pending {
        let now = Utc::now();

        let payload: BillPayload = match serde_json::from_str(&entry.payload) {
            Ok(p) => p,
            Err(e) => {
                warn!(id = %entry.id, error = %e, "Unparseable bill payload");
                db.bill_outbox()
                    .mark_failed(&entry.id, &format!("bad payload: {e}"), now)
                    .await?;
                summary.failed += 1;
                continue;
            }
        };

        match handoff.deliver(&payload) {
            Ok(()) => {
                db.bill_outbox().mark_delivered(&entry.id, now).await?;
                summary.delivered += 1;
            }
            Err(e) => {
                db.bill_outbox().mark_failed(&entry.id, &e, now).await?;
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tjp_core::{LoyaltyPolicy, Money, PaymentType, ProductType};

    fn payload(payment_type: PaymentType, reached_free_pocket: bool) -> BillPayload {
        let now = Utc::now();
        let sale = Sale {
            id: "s-1".to_string(),
            customer_name: "Kumar".to_string(),
            contact_number: "9500591897".to_string(),
            product_type: ProductType::Mushroom,
            quantity: 3,
            unit: "pockets".to_string(),
            price_per_unit_paise: Money::from_rupees(50).paise(),
            total_amount_paise: Money::from_rupees(150).paise(),
            payment_type,
            payment_status: payment_type.initial_status(),
            settled_date: None,
            settled_by: None,
            date: now,
            created_at: now,
            updated_at: now,
        };
        let loyalty = LoyaltyDelta::for_sale(
            "9500591897",
            if reached_free_pocket { 8 } else { 2 },
            ProductType::Mushroom,
            3,
            &LoyaltyPolicy::default(),
        );
        BillPayload {
            sale,
            loyalty,
            farm_name: "TJP Mushroom Farming".to_string(),
            order_phone: "7010322499".to_string(),
        }
    }

    #[test]
    fn test_render_cash_bill() {
        let message = render_bill_message(&payload(PaymentType::Cash, false));
        assert!(message.contains("TJP MUSHROOM FARMING - DIGITAL BILL"));
        assert!(message.contains("Kumar"));
        assert!(message.contains("₹150"));
        assert!(message.contains("7010322499"));
        assert!(!message.contains("Kadan noted"));
        assert!(!message.contains("FREE POCKET"));
    }

    #[test]
    fn test_render_kadan_and_milestone() {
        let message = render_bill_message(&payload(PaymentType::Credit, true));
        assert!(message.contains("Kadan noted"));
        assert!(message.contains("1 FREE POCKET"));
    }

    #[test]
    fn test_whatsapp_link_prefixes_country_code() {
        let link = whatsapp_draft_link("9500591897", "hello bill");
        assert!(link.starts_with("https://wa.me/919500591897?text="));
        assert!(link.contains("hello%20bill"));

        // Already-prefixed numbers are left alone.
        let link = whatsapp_draft_link("+91 95005 91897", "x");
        assert!(link.starts_with("https://wa.me/919500591897?"));
    }

    #[test]
    fn test_percent_encode() {
        assert_eq!(percent_encode("a b"), "a%20b");
        assert_eq!(percent_encode("₹50"), "%E2%82%B950");
        assert_eq!(percent_encode("safe-._~"), "safe-._~");
    }

    struct FailingHandoff;
    impl BillHandoff for FailingHandoff {
        fn deliver(&self, _payload: &BillPayload) -> Result<(), String> {
            Err("handset unreachable".to_string())
        }
    }

    #[tokio::test]
    async fn test_drain_marks_delivered_and_failed() {
        let db = Database::new(tjp_db::DbConfig::in_memory()).await.unwrap();
        let p = payload(PaymentType::Cash, false);
        db.sales().insert(&p.sale, None).await.unwrap();
        queue_bill(&db, &p, Utc::now()).await.unwrap();

        // First pass fails: attempt recorded, entry stays pending.
        let summary = drain_pending(&db, &FailingHandoff, 10, 5).await.unwrap();
        assert_eq!(summary, DrainSummary { delivered: 0, failed: 1 });
        assert_eq!(db.bill_outbox().count_pending().await.unwrap(), 1);

        // Second pass with the real hand-off delivers it.
        let summary = drain_pending(&db, &WhatsAppDraftHandoff, 10, 5)
            .await
            .unwrap();
        assert_eq!(summary, DrainSummary { delivered: 1, failed: 0 });
        assert_eq!(db.bill_outbox().count_pending().await.unwrap(), 0);
    }
}
