//! Market and negotiated offer pricing.

use std::collections::HashMap;

use harvest_core::{PricingMode, RequestItem};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Configuration for offer valuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationConfig {
    /// Price per unit keyed by exact product name.
    pub unit_prices: HashMap<String, f64>,

    /// Price used for products missing from `unit_prices`.
    pub default_unit_price: f64,

    /// Multiplier applied when no per-product discounts are configured.
    pub flat_multiplier: f64,

    /// Percentage discount for products missing from a discount map.
    pub default_discount_pct: f64,

    /// Lower bound of the weighted discount.
    pub min_discount: f64,

    /// Upper bound of the weighted discount.
    pub max_discount: f64,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            unit_prices: default_unit_prices(),
            default_unit_price: 5.0,
            flat_multiplier: 0.85,
            default_discount_pct: 10.0,
            min_discount: 0.05,
            max_discount: 0.35,
        }
    }
}

fn default_unit_prices() -> HashMap<String, f64> {
    [
        ("Alface", 5.0),
        ("Tomate", 6.0),
        ("Cenoura", 4.5),
        ("Batata", 4.0),
        ("Mandioca", 3.5),
        ("Abóbora", 3.8),
        ("Couve", 4.2),
        ("Banana", 4.8),
        ("Laranja", 3.2),
        ("Feijão", 8.5),
        ("Arroz", 6.2),
        ("Milho", 2.9),
        ("Ovos", 12.0),
        ("Leite", 4.6),
    ]
    .into_iter()
    .map(|(name, price)| (name.to_string(), price))
    .collect()
}

/// How the proposed value was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuationMethod {
    /// Flat multiplier, no per-product discounts.
    Flat,
    /// Weighted per-product discounts, clamped.
    WeightedDiscount,
}

/// Prices computed for one offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    pub market_value: f64,
    pub proposed_value: f64,
    /// `proposed_value / market_value`, as applied.
    pub multiplier: f64,
    pub method: ValuationMethod,
}

/// Computes market and proposed values for a request's items.
#[derive(Debug, Clone, Default)]
pub struct OfferValuator {
    config: ValuationConfig,
}

impl OfferValuator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ValuationConfig) -> Self {
        Self { config }
    }

    /// Catalog price for `product_name` (exact match).
    pub fn unit_price(&self, product_name: &str) -> f64 {
        self.config
            .unit_prices
            .get(product_name)
            .copied()
            .unwrap_or(self.config.default_unit_price)
    }

    /// Sum of unit price times quantity.
    pub fn market_value(&self, items: &[RequestItem]) -> f64 {
        items
            .iter()
            .map(|item| self.unit_price(&item.product_name) * item.quantity)
            .sum()
    }

    /// Price `items` under the negotiator's pricing mode, if any.
    ///
    /// A `CUSTOM_PER_FARMER` formula is never evaluated; it takes the flat path.
    pub fn value(&self, items: &[RequestItem], pricing: Option<&PricingMode>) -> Valuation {
        let market_value = self.market_value(items);

        match pricing {
            Some(PricingMode::FixedPerProduct { discounts }) if !discounts.is_empty() => {
                self.weighted(items, market_value, discounts)
            }
            Some(PricingMode::CustomPerFarmer { formula }) => {
                warn!(%formula, "custom per-farmer pricing is not evaluated; using flat discount");
                self.flat(market_value)
            }
            _ => self.flat(market_value),
        }
    }

    fn flat(&self, market_value: f64) -> Valuation {
        Valuation {
            market_value,
            proposed_value: market_value * self.config.flat_multiplier,
            multiplier: self.config.flat_multiplier,
            method: ValuationMethod::Flat,
        }
    }

    fn weighted(&self, items: &[RequestItem], market_value: f64, discounts: &HashMap<String, f64>) -> Valuation {
        let lowered: HashMap<String, f64> = discounts
            .iter()
            .map(|(name, pct)| (name.trim().to_lowercase(), *pct))
            .collect();

        let discounted: f64 = items
            .iter()
            .map(|item| {
                let pct = lowered
                    .get(&item.product_name.trim().to_lowercase())
                    .copied()
                    .unwrap_or(self.config.default_discount_pct);
                self.unit_price(&item.product_name) * item.quantity * pct / 100.0
            })
            .sum();

        let weighted_discount = if market_value > 0.0 {
            discounted / market_value
        } else {
            0.0
        };
        let clamped = weighted_discount.clamp(self.config.min_discount, self.config.max_discount);
        let multiplier = 1.0 - clamped;

        Valuation {
            market_value,
            proposed_value: market_value * multiplier,
            multiplier,
            method: ValuationMethod::WeightedDiscount,
        }
    }
}
