use crate::error::{Error, Result};
use crate::math::poisson::TailApproximation;
use crate::pricing::elasticity::{ElasticityCurve, PriceGrid};

/// Parameters of a clearance-pricing instance.
///
/// The defaults are the reference configuration: 20 periods, 18 units of
/// stock, a 51-tier price grid on `alpha = 1, beta = 5`, no discounting and an
/// 11-term demand tail.
#[derive(Debug, Clone, PartialEq)]
pub struct ClearanceConfig {
    /// Number of pricing periods.
    pub horizon: usize,
    /// Stock on hand at period 0.
    pub initial_inventory: usize,
    /// Grid resolution `n`; the grid has `n + 1` tiers.
    pub price_levels: usize,
    pub elasticity: ElasticityCurve,
    /// Discount factor applied to next-period value.
    pub gamma: f64,
    pub tail: TailApproximation,
}

impl Default for ClearanceConfig {
    fn default() -> Self {
        Self {
            horizon: 20,
            initial_inventory: 18,
            price_levels: 50,
            elasticity: ElasticityCurve::default(),
            gamma: 1.0,
            tail: TailApproximation::default(),
        }
    }
}

impl ClearanceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.price_levels == 0 {
            return Err(Error::invalid_input("price_levels must be at least 1"));
        }
        if !(self.gamma > 0.0 && self.gamma <= 1.0) {
            return Err(Error::InvalidDiscount(self.gamma));
        }
        self.tail.validate()
    }

    /// Price grid described by `price_levels` and `elasticity`.
    pub fn price_grid(&self) -> Result<PriceGrid> {
        PriceGrid::new(self.price_levels, self.elasticity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = ClearanceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.price_grid().unwrap().len(), 51);
    }

    #[test]
    fn test_validation() {
        let config = ClearanceConfig {
            price_levels: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidInput(_))));

        let config = ClearanceConfig {
            gamma: 0.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidDiscount(_))));

        let config = ClearanceConfig {
            tail: TailApproximation::Truncated { window: 0 },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
