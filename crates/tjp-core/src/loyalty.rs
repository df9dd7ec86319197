//! # Loyalty Engine
//!
//! Pure derivation of customer loyalty counters and reward milestones.
//!
//! ## The 10-Pocket Cycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Loyalty Accrual                                  │
//! │                                                                     │
//! │  Mushroom sale (qty pockets)                                        │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  lifetime_pockets += qty        (Seeds never contribute)            │
//! │       │                                                             │
//! │       ├── crossed 10? → FreePocket milestone (1 free pocket)        │
//! │       ├── crossed 20? → BulkReward milestone (2 free / bulk offer)  │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  Milestones are NOTIFICATIONS - a human redeems them, then          │
//! │  explicitly resets the cycle. Nothing is discounted automatically.  │
//! │                                                                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Re-derivable by Construction
//! Every function here is a pure fold over sale history plus the reset
//! marker. There is no hidden counter to drift: the cached per-customer
//! view in the database is a materialized twin of [`lifetime_pockets`]
//! and may be thrown away and recomputed at any time.
//!
//! The only permitted mutations of loyalty state are (a) recording a
//! qualifying Mushroom sale, and (b) an explicit, operator-confirmed
//! reset - which moves `last_reset_at` and forfeits any unredeemed
//! milestone tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::ProductType;

// =============================================================================
// Policy
// =============================================================================

/// Milestone thresholds for one loyalty cycle.
///
/// The cycle is open-ended: 0-10 and 10-20 are two successive milestone
/// bands within one cycle, closed only by an explicit operator reset
/// (no modulo wraparound).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoyaltyPolicy {
    /// Cumulative pockets unlocking the 1-free-pocket reward.
    pub free_pocket_at: i64,
    /// Cumulative pockets unlocking the bulk (2-free-pocket) reward.
    pub bulk_reward_at: i64,
}

impl Default for LoyaltyPolicy {
    fn default() -> Self {
        LoyaltyPolicy {
            free_pocket_at: 10,
            bulk_reward_at: 20,
        }
    }
}

// =============================================================================
// Milestones
// =============================================================================

/// A reward milestone a customer can reach within one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Milestone {
    /// Reached `free_pocket_at` cumulative pockets: 1 free pocket.
    FreePocket,
    /// Reached `bulk_reward_at` cumulative pockets: bulk reward.
    BulkReward,
}

impl Milestone {
    /// The cumulative pocket count that unlocks this milestone.
    pub const fn threshold(&self, policy: &LoyaltyPolicy) -> i64 {
        match self {
            Milestone::FreePocket => policy.free_pocket_at,
            Milestone::BulkReward => policy.bulk_reward_at,
        }
    }

    const ALL: [Milestone; 2] = [Milestone::FreePocket, Milestone::BulkReward];
}

// =============================================================================
// Derivation
// =============================================================================

/// Pocket count a sale contributes toward loyalty.
///
/// Only Mushroom quantity counts; Seeds sales contribute nothing no
/// matter the quantity.
#[inline]
pub const fn qualifying_quantity(product_type: ProductType, quantity: i64) -> i64 {
    match product_type {
        ProductType::Mushroom => quantity,
        ProductType::Seeds => 0,
    }
}

/// Milestones newly crossed by moving from `before` to `after` pockets.
///
/// A milestone is crossed when `before < threshold <= after`, so a single
/// sale straddling a boundary (e.g. 8 → 13) still flags it, a sale
/// landing exactly on the threshold flags it, and a sale entirely past it
/// (13 → 15) does not flag it again. One large sale can cross both
/// milestones at once.
pub fn milestones_crossed(before: i64, after: i64, policy: &LoyaltyPolicy) -> Vec<Milestone> {
    Milestone::ALL
        .into_iter()
        .filter(|m| {
            let t = m.threshold(policy);
            before < t && t <= after
        })
        .collect()
}

/// Highest milestone already reached at `pockets`, if any.
pub fn eligible_milestone(pockets: i64, policy: &LoyaltyPolicy) -> Option<Milestone> {
    Milestone::ALL
        .into_iter()
        .rev()
        .find(|m| pockets >= m.threshold(policy))
}

/// Pockets still needed for the next milestone, if one remains.
pub fn pockets_to_next(pockets: i64, policy: &LoyaltyPolicy) -> Option<i64> {
    Milestone::ALL
        .into_iter()
        .map(|m| m.threshold(policy))
        .find(|&t| pockets < t)
        .map(|t| t - pockets)
}

/// Folds a customer's sale history into their lifetime pocket count.
///
/// Counts qualifying quantity of every sale dated strictly after
/// `last_reset_at` (or all of history if never reset). This is the
/// authoritative definition; the SQL aggregate in tjp-db must agree
/// with it.
pub fn lifetime_pockets<'a, I>(sales: I, last_reset_at: Option<DateTime<Utc>>) -> i64
where
    I: IntoIterator<Item = (ProductType, i64, DateTime<Utc>)>,
{
    sales
        .into_iter()
        .filter(|(_, _, date)| match last_reset_at {
            Some(reset) => *date > reset,
            None => true,
        })
        .map(|(product, qty, _)| qualifying_quantity(product, qty))
        .sum()
}

// =============================================================================
// Read Models
// =============================================================================

/// The loyalty movement caused by one recorded sale.
///
/// Returned alongside the stored sale so the caller can decide whether
/// to congratulate the customer. `reached` lists milestones crossed by
/// exactly this sale - each raised once, never skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoyaltyDelta {
    pub contact_number: String,
    /// Lifetime pockets before this sale.
    pub lifetime_before: i64,
    /// Lifetime pockets after this sale.
    pub lifetime_after: i64,
    /// Milestones newly crossed by this sale.
    pub reached: Vec<Milestone>,
}

impl LoyaltyDelta {
    /// Derives the delta for one sale given the prior count.
    pub fn for_sale(
        contact_number: impl Into<String>,
        lifetime_before: i64,
        product_type: ProductType,
        quantity: i64,
        policy: &LoyaltyPolicy,
    ) -> Self {
        let lifetime_after = lifetime_before + qualifying_quantity(product_type, quantity);
        LoyaltyDelta {
            contact_number: contact_number.into(),
            lifetime_before,
            lifetime_after,
            reached: milestones_crossed(lifetime_before, lifetime_after, policy),
        }
    }

    /// Whether this sale moved the counter at all.
    pub fn contributed(&self) -> bool {
        self.lifetime_after != self.lifetime_before
    }
}

/// Per-customer loyalty snapshot for the customer list view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoyaltySnapshot {
    pub contact_number: String,
    pub name: String,
    /// Qualifying pockets accumulated since the last reset.
    pub lifetime_pockets: i64,
    /// Highest milestone currently unlocked, if any. A flag for the
    /// operator - redemption is manual.
    pub eligible: Option<Milestone>,
    /// Pockets remaining until the next milestone, if one remains.
    pub pockets_to_next: Option<i64>,
    pub last_reset_at: Option<DateTime<Utc>>,
}

impl LoyaltySnapshot {
    pub fn derive(
        contact_number: impl Into<String>,
        name: impl Into<String>,
        lifetime_pockets: i64,
        last_reset_at: Option<DateTime<Utc>>,
        policy: &LoyaltyPolicy,
    ) -> Self {
        LoyaltySnapshot {
            contact_number: contact_number.into(),
            name: name.into(),
            lifetime_pockets,
            eligible: eligible_milestone(lifetime_pockets, policy),
            pockets_to_next: pockets_to_next(lifetime_pockets, policy),
            last_reset_at,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn policy() -> LoyaltyPolicy {
        LoyaltyPolicy::default()
    }

    #[test]
    fn test_qualifying_quantity() {
        assert_eq!(qualifying_quantity(ProductType::Mushroom, 5), 5);
        // A Seeds sale of quantity 50 does not change lifetimePockets
        assert_eq!(qualifying_quantity(ProductType::Seeds, 50), 0);
    }

    #[test]
    fn test_milestone_straddles_boundary() {
        // Customer at 8 buys 5 pockets in one sale: reached-10 flagged
        // exactly once, not skipped and not raised twice.
        let crossed = milestones_crossed(8, 13, &policy());
        assert_eq!(crossed, vec![Milestone::FreePocket]);

        // The next sale past the boundary raises nothing new.
        let crossed = milestones_crossed(13, 15, &policy());
        assert!(crossed.is_empty());
    }

    #[test]
    fn test_milestone_exact_landing() {
        let crossed = milestones_crossed(7, 10, &policy());
        assert_eq!(crossed, vec![Milestone::FreePocket]);
    }

    #[test]
    fn test_single_sale_crosses_both_milestones() {
        let crossed = milestones_crossed(2, 25, &policy());
        assert_eq!(crossed, vec![Milestone::FreePocket, Milestone::BulkReward]);
    }

    #[test]
    fn test_no_milestone_below_threshold() {
        assert!(milestones_crossed(0, 9, &policy()).is_empty());
    }

    #[test]
    fn test_eligible_and_next() {
        let p = policy();
        assert_eq!(eligible_milestone(9, &p), None);
        assert_eq!(eligible_milestone(10, &p), Some(Milestone::FreePocket));
        assert_eq!(eligible_milestone(23, &p), Some(Milestone::BulkReward));

        assert_eq!(pockets_to_next(7, &p), Some(3));
        assert_eq!(pockets_to_next(10, &p), Some(10));
        assert_eq!(pockets_to_next(25, &p), None);
    }

    #[test]
    fn test_lifetime_pockets_fold() {
        let now = Utc::now();
        let history = vec![
            (ProductType::Mushroom, 4, now - Duration::days(10)),
            (ProductType::Seeds, 50, now - Duration::days(8)),
            (ProductType::Mushroom, 3, now - Duration::days(5)),
        ];
        assert_eq!(lifetime_pockets(history, None), 7);
    }

    #[test]
    fn test_reset_semantics() {
        let now = Utc::now();
        let reset = now - Duration::days(3);
        let history = vec![
            // Pre-reset history is forfeited...
            (ProductType::Mushroom, 12, now - Duration::days(10)),
            (ProductType::Mushroom, 5, now - Duration::days(7)),
            // ...only this sale counts.
            (ProductType::Mushroom, 3, now - Duration::days(1)),
        ];
        assert_eq!(lifetime_pockets(history.clone(), Some(reset)), 3);

        // Never reset: everything counts.
        assert_eq!(lifetime_pockets(history, None), 20);
    }

    #[test]
    fn test_delta_for_sale() {
        let delta = LoyaltyDelta::for_sale("9500591897", 8, ProductType::Mushroom, 5, &policy());
        assert_eq!(delta.lifetime_before, 8);
        assert_eq!(delta.lifetime_after, 13);
        assert_eq!(delta.reached, vec![Milestone::FreePocket]);
        assert!(delta.contributed());

        let delta = LoyaltyDelta::for_sale("9500591897", 8, ProductType::Seeds, 50, &policy());
        assert_eq!(delta.lifetime_after, 8);
        assert!(delta.reached.is_empty());
        assert!(!delta.contributed());
    }

    #[test]
    fn test_snapshot_derive() {
        let snap = LoyaltySnapshot::derive("9500591897", "Partha", 13, None, &policy());
        assert_eq!(snap.lifetime_pockets, 13);
        assert_eq!(snap.eligible, Some(Milestone::FreePocket));
        assert_eq!(snap.pockets_to_next, Some(7));
    }
}
