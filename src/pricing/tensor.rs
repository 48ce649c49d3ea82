//! Dense form of the clearance dynamics.
//!
//! For each tier, `probability[[tier, i, j]]` is the chance of moving from
//! inventory `i` to inventory `j` while selling at that tier, and
//! `reward[[tier, i, j]]` the revenue collected on the way. Both are built from
//! the distance template `i - j`, which is the number of units sold. Column 0
//! (sold out) carries the whole tail `P(D >= i)`, so each row is exactly the
//! table form's successor distribution.

use log::trace;
use ndarray::{Array1, Array2, Array3, ArrayView2, Axis};
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::pricing::problem::ClearanceProblem;

/// Per-tier transition and reward matrices, indexed `[tier, inventory, successor]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PricingTensors {
    probability: Array3<f64>,
    reward: Array3<f64>,
}

/// `template[[i, j]] = i - j`.
pub fn distance_template(levels: usize) -> Array2<i64> {
    Array2::from_shape_fn((levels, levels), |(i, j)| i as i64 - j as i64)
}

impl PricingTensors {
    pub fn build(problem: &ClearanceProblem) -> Self {
        let levels = problem.num_inventory_levels();
        let tiers = problem.num_tiers();
        let template = distance_template(levels);

        let slices: Vec<(Array2<f64>, Array2<f64>)> = problem
            .demand()
            .par_iter()
            .zip(problem.grid().tiers().par_iter())
            .enumerate()
            .map(|(index, (demand, tier))| {
                let mut probability =
                    template.mapv(|d| if d < 0 { 0.0 } else { demand.pmf(d as usize) });
                for (i, cell) in probability.column_mut(0).iter_mut().enumerate() {
                    *cell = demand.prob_at_least(i);
                }
                let price = tier.price();
                let reward = template.mapv(|d| d.max(0) as f64 * price);
                trace!("tier {} tensors built (rate {:.4})", index, demand.rate());
                (probability, reward)
            })
            .collect();

        let mut probability = Array3::<f64>::zeros((tiers, levels, levels));
        let mut reward = Array3::<f64>::zeros((tiers, levels, levels));
        for (tier, (p, r)) in slices.into_iter().enumerate() {
            probability.index_axis_mut(Axis(0), tier).assign(&p);
            reward.index_axis_mut(Axis(0), tier).assign(&r);
        }
        Self {
            probability,
            reward,
        }
    }

    /// Tensors from raw arrays shaped `[tier, inventory, successor]`.
    ///
    /// # Errors
    /// Both arrays must share one shape, have at least one tier and one
    /// inventory level, and be square in the last two axes. Probabilities must
    /// be finite and non-negative.
    pub fn from_arrays(probability: Array3<f64>, reward: Array3<f64>) -> Result<Self> {
        if probability.shape() != reward.shape() {
            return Err(Error::dimension_mismatch(format!(
                "probability {:?} vs reward {:?}",
                probability.shape(),
                reward.shape()
            )));
        }
        let (tiers, rows, cols) = probability.dim();
        if tiers == 0 || rows == 0 {
            return Err(Error::EmptyStateSpace);
        }
        if rows != cols {
            return Err(Error::dimension_mismatch(format!(
                "transition matrices must be square, got {rows}x{cols}"
            )));
        }
        if probability.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(Error::invalid_input(
                "transition probabilities must be finite and non-negative",
            ));
        }
        Ok(Self {
            probability,
            reward,
        })
    }

    pub fn num_tiers(&self) -> usize {
        self.probability.len_of(Axis(0))
    }

    pub fn num_inventory_levels(&self) -> usize {
        self.probability.len_of(Axis(1))
    }

    /// `Prob[i, j]` of one tier.
    pub fn probability(&self, tier: usize) -> ArrayView2<'_, f64> {
        self.probability.index_axis(Axis(0), tier)
    }

    /// `Reward[i, j]` of one tier.
    pub fn reward(&self, tier: usize) -> ArrayView2<'_, f64> {
        self.reward.index_axis(Axis(0), tier)
    }

    /// Total probability of each row of one tier; one up to tail truncation.
    pub fn row_mass(&self, tier: usize) -> Array1<f64> {
        self.probability(tier).sum_axis(Axis(1))
    }
}
