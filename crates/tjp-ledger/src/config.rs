//! # Ledger Configuration
//!
//! Runtime configuration for the service layer. Everything has a sane
//! default so a bare `LedgerConfig::default()` runs the farm as-is;
//! environment variables override for other deployments.

use tjp_core::LoyaltyPolicy;

/// Service-layer configuration.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Farm name used in bill messages.
    pub farm_name: String,

    /// Phone number customers call to place orders (printed on bills).
    pub order_phone: String,

    /// Loyalty milestone thresholds.
    pub loyalty: LoyaltyPolicy,

    /// Delivery attempts before an outbox entry is parked for manual
    /// inspection.
    pub max_bill_attempts: i64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            farm_name: "TJP Mushroom Farming".to_string(),
            order_phone: "7010322499".to_string(),
            loyalty: LoyaltyPolicy::default(),
            max_bill_attempts: 5,
        }
    }
}

impl LedgerConfig {
    /// Builds a config from defaults plus environment overrides.
    ///
    /// ## Environment Variables
    /// - `TJP_FARM_NAME` - farm name on bills
    /// - `TJP_ORDER_PHONE` - order phone on bills
    pub fn from_env() -> Self {
        let mut config = LedgerConfig::default();

        if let Ok(name) = std::env::var("TJP_FARM_NAME") {
            if !name.trim().is_empty() {
                config.farm_name = name;
            }
        }
        if let Ok(phone) = std::env::var("TJP_ORDER_PHONE") {
            if !phone.trim().is_empty() {
                config.order_phone = phone;
            }
        }

        config
    }

    /// Sets the loyalty policy.
    pub fn loyalty(mut self, policy: LoyaltyPolicy) -> Self {
        self.loyalty = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::default();
        assert_eq!(config.farm_name, "TJP Mushroom Farming");
        assert_eq!(config.loyalty.free_pocket_at, 10);
        assert_eq!(config.loyalty.bulk_reward_at, 20);
        assert_eq!(config.max_bill_attempts, 5);
    }

    #[test]
    fn test_loyalty_builder() {
        let config = LedgerConfig::default().loyalty(LoyaltyPolicy {
            free_pocket_at: 5,
            bulk_reward_at: 12,
        });
        assert_eq!(config.loyalty.free_pocket_at, 5);
    }
}
