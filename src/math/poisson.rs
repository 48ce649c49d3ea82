//! Poisson demand with a stockout tail.
//!
//! The mass function is evaluated in log space,
//! `exp(k ln(lambda) - lambda - ln Gamma(k + 1))`, which stays finite for large
//! `k` and tiny `lambda`. The upper tail `P(D >= k)` is either a truncated sum
//! of the mass function or the exact complement of the CDF.

use statrs::distribution::{DiscreteCDF, Poisson};
use statrs::function::gamma::ln_gamma;

use crate::error::{Error, Result};

/// Number of mass terms summed by the default tail approximation.
pub const DEFAULT_TAIL_WINDOW: usize = 11;

/// How `P(D >= k)` is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailApproximation {
    /// `sum_{i=0}^{window-1} pmf(k + i)`; drops the mass beyond the window.
    Truncated { window: usize },
    /// `1 - CDF(k - 1)`.
    Exact,
}

impl Default for TailApproximation {
    fn default() -> Self {
        TailApproximation::Truncated {
            window: DEFAULT_TAIL_WINDOW,
        }
    }
}

impl TailApproximation {
    pub fn validate(&self) -> Result<()> {
        match *self {
            TailApproximation::Truncated { window: 0 } => Err(Error::invalid_input(
                "tail window must cover at least one term",
            )),
            _ => Ok(()),
        }
    }
}

/// Demand per period at one price tier.
#[derive(Debug, Clone)]
pub struct PoissonDemand {
    rate: f64,
    ln_rate: f64,
    tail: TailApproximation,
    distribution: Poisson,
}

impl PoissonDemand {
    /// Demand with arrival rate `rate` and the default tail window.
    pub fn new(rate: f64) -> Result<Self> {
        Self::with_tail(rate, TailApproximation::default())
    }

    /// # Errors
    /// Returns [`Error::InvalidRate`] unless `rate` is positive and finite, and
    /// [`Error::InvalidInput`] for a zero-width tail window.
    pub fn with_tail(rate: f64, tail: TailApproximation) -> Result<Self> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(Error::InvalidRate(rate));
        }
        tail.validate()?;
        let distribution = Poisson::new(rate).map_err(|_| Error::InvalidRate(rate))?;
        Ok(Self {
            rate,
            ln_rate: rate.ln(),
            tail,
            distribution,
        })
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn tail(&self) -> TailApproximation {
        self.tail
    }

    /// `P(D = k)`.
    pub fn pmf(&self, k: usize) -> f64 {
        let k = k as f64;
        (k * self.ln_rate - self.rate - ln_gamma(k + 1.0)).exp()
    }

    /// `P(D >= k)`, under the configured tail rule.
    pub fn prob_at_least(&self, k: usize) -> f64 {
        match self.tail {
            TailApproximation::Truncated { window } => (0..window).map(|i| self.pmf(k + i)).sum(),
            TailApproximation::Exact => {
                if k == 0 {
                    1.0
                } else {
                    (1.0 - self.distribution.cdf(k as u64 - 1)).max(0.0)
                }
            }
        }
    }

    /// Distribution of units sold out of `stock`: entry `d < stock` is
    /// `P(D = d)`, entry `stock` is `P(D >= stock)`.
    pub fn stockout_distribution(&self, stock: usize) -> Vec<f64> {
        (0..=stock)
            .map(|d| {
                if d < stock {
                    self.pmf(d)
                } else {
                    self.prob_at_least(stock)
                }
            })
            .collect()
    }
}
