//! Customer ranks and the checkout discount they earn.
//!
//! A [`RankTable`] is an ascending list of spend thresholds. The first rule must start at zero and acts as the
//! fallback tier; discounts may not decrease as the threshold rises. Quoting a discount is a pure function of the
//! amount and the customer's tier. The tier itself is looked up from the rank store, not recomputed per quote.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::{Money, Tier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierRule {
    pub tier: Tier,
    /// Minimum lifetime spend to qualify for the tier.
    pub threshold: Money,
    pub discount_percentage: u8,
}

impl TierRule {
    pub fn new(tier: Tier, threshold: i64, discount_percentage: u8) -> Self {
        Self { tier, threshold: Money::from(threshold), discount_percentage }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RankTableError {
    #[error("A rank table needs at least one rule")]
    Empty,
    #[error("The lowest tier must have a threshold of zero")]
    MissingFallback,
    #[error("Tier thresholds must be strictly ascending. {0} breaks the order")]
    ThresholdsNotAscending(Tier),
    #[error("Discounts must not decrease for higher tiers. {0} breaks the order")]
    DiscountNotMonotonic(Tier),
    #[error("Discount for {0} exceeds 100%")]
    DiscountTooLarge(Tier),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankTable {
    rules: Vec<TierRule>,
}

impl Default for RankTable {
    fn default() -> Self {
        Self {
            rules: vec![
                TierRule::new(Tier::Bronze, 0, 0),
                TierRule::new(Tier::Silver, 1_000, 5),
                TierRule::new(Tier::Gold, 2_000, 10),
                TierRule::new(Tier::Diamond, 5_000, 15),
            ],
        }
    }
}

impl RankTable {
    pub fn new(rules: Vec<TierRule>) -> Result<Self, RankTableError> {
        let first = rules.first().ok_or(RankTableError::Empty)?;
        if first.threshold != Money::default() {
            return Err(RankTableError::MissingFallback);
        }
        for rule in &rules {
            if rule.discount_percentage > 100 {
                return Err(RankTableError::DiscountTooLarge(rule.tier));
            }
        }
        for pair in rules.windows(2) {
            if pair[1].threshold <= pair[0].threshold {
                return Err(RankTableError::ThresholdsNotAscending(pair[1].tier));
            }
            if pair[1].discount_percentage < pair[0].discount_percentage {
                return Err(RankTableError::DiscountNotMonotonic(pair[1].tier));
            }
        }
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[TierRule] {
        &self.rules
    }

    /// The highest tier whose threshold does not exceed `spend`.
    pub fn tier_for_spend(&self, spend: Money) -> Tier {
        self.rules.iter().rev().find(|r| spend >= r.threshold).map(|r| r.tier).unwrap_or_default()
    }

    /// Tiers missing from the table earn no discount.
    pub fn discount_percentage(&self, tier: Tier) -> u8 {
        self.rules.iter().find(|r| r.tier == tier).map(|r| r.discount_percentage).unwrap_or(0)
    }

    pub fn quote(&self, original_amount: Money, tier: Tier) -> DiscountQuote {
        let discount_percentage = self.discount_percentage(tier);
        let discount_amount = original_amount.percentage(discount_percentage);
        DiscountQuote {
            original_amount,
            tier,
            discount_percentage,
            discount_amount,
            final_amount: original_amount - discount_amount,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountQuote {
    pub original_amount: Money,
    pub tier: Tier,
    pub discount_percentage: u8,
    /// `original_amount * discount_percentage / 100`, rounded down.
    pub discount_amount: Money,
    pub final_amount: Money,
}
