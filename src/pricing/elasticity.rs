//! Price tiers and the demand-elasticity curve that assigns each tier an
//! arrival rate.
//!
//! Tier 0 is full price. Tier indices increase with the discount, so a
//! markdown-only policy may move from tier `p` to any tier `>= p`.

use crate::error::{Error, Result};
use crate::math::poisson::{PoissonDemand, TailApproximation};

/// Exponential demand response `rate = alpha * exp(-beta * price)`, where the
/// price is the fraction of full price still charged (`1 - discount`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElasticityCurve {
    pub alpha: f64,
    pub beta: f64,
}

impl Default for ElasticityCurve {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            beta: 5.0,
        }
    }
}

impl ElasticityCurve {
    pub fn new(alpha: f64, beta: f64) -> Self {
        Self { alpha, beta }
    }

    /// Arrival rate when selling at `discount` off full price.
    pub fn rate(&self, discount: f64) -> f64 {
        self.alpha * (-self.beta * (1.0 - discount)).exp()
    }
}

/// One point of the price grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceTier {
    /// Fraction taken off full price, in `[0, 1]`.
    pub discount: f64,
    /// Poisson arrival rate of demand at this tier.
    pub rate: f64,
}

impl PriceTier {
    pub fn new(discount: f64, rate: f64) -> Self {
        Self { discount, rate }
    }

    /// Revenue per unit sold, as a fraction of full price.
    pub fn price(&self) -> f64 {
        1.0 - self.discount
    }
}

/// Ordered price grid, shallowest discount first.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceGrid {
    tiers: Vec<PriceTier>,
}

impl PriceGrid {
    /// `levels + 1` tiers with discounts `0, 1/levels, ..., 1`, rated by `curve`.
    ///
    /// # Errors
    /// Returns an error if `levels` is zero or the curve yields a non-positive
    /// rate for any tier.
    pub fn new(levels: usize, curve: ElasticityCurve) -> Result<Self> {
        if levels == 0 {
            return Err(Error::invalid_input("price grid needs at least one level"));
        }
        let tiers = (0..=levels)
            .map(|i| {
                let discount = i as f64 / levels as f64;
                PriceTier::new(discount, curve.rate(discount))
            })
            .collect();
        Self::from_tiers(tiers)
    }

    /// Grid from explicit tiers.
    ///
    /// # Errors
    /// The grid must be non-empty, discounts must lie in `[0, 1]` and be
    /// non-decreasing, and every rate must be positive and finite.
    pub fn from_tiers(tiers: Vec<PriceTier>) -> Result<Self> {
        if tiers.is_empty() {
            return Err(Error::invalid_input("price grid has no tiers"));
        }
        for (i, tier) in tiers.iter().enumerate() {
            if !(0.0..=1.0).contains(&tier.discount) {
                return Err(Error::invalid_input(format!(
                    "tier {} discount {} is outside [0, 1]",
                    i, tier.discount
                )));
            }
            if !(tier.rate.is_finite() && tier.rate > 0.0) {
                return Err(Error::InvalidRate(tier.rate));
            }
        }
        if let Some(i) = tiers
            .windows(2)
            .position(|pair| pair[1].discount < pair[0].discount)
        {
            return Err(Error::invalid_input(format!(
                "tier {} discounts less than tier {}",
                i + 1,
                i
            )));
        }
        Ok(Self { tiers })
    }

    pub fn tiers(&self) -> &[PriceTier] {
        &self.tiers
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    pub fn tier(&self, index: usize) -> Option<&PriceTier> {
        self.tiers.get(index)
    }

    /// Demand model of every tier, in tier order.
    pub fn demand_models(&self, tail: TailApproximation) -> Result<Vec<PoissonDemand>> {
        self.tiers
            .iter()
            .map(|tier| PoissonDemand::with_tail(tier.rate, tail))
            .collect()
    }
}
