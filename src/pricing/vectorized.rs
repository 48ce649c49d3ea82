//! Backward induction for clearance pricing in dense matrix form.
//!
//! Instead of walking an explicit successor table per `(state, action)`, each
//! period computes a Q matrix `Q[inventory, action]` with one matrix-vector
//! product per tier:
//!
//! `Q[:, a] = rowsum(Prob_a .* Reward_a) + gamma * Prob_a . V_next[:, a]`
//!
//! Because prices can only be marked down, state tier `p` may choose any
//! action `a >= p`. The value of column `p` is therefore the running maximum
//! of `Q` scanned from the deepest discount back to `p`, and the policy is the
//! index achieving it. On ties the scan keeps the lowest index, matching the
//! ascending enumeration of the table-driven solver.

use log::{debug, info};
use ndarray::{Array1, Array2, Zip};
use rayon::prelude::*;

use crate::cs::dynamic::backward_induction::{Decision, ValuePolicyTable};
use crate::error::{Error, Result};
use crate::pricing::problem::{ClearanceProblem, State};
use crate::pricing::tensor::PricingTensors;

/// Value and policy matrices of one period, indexed `[inventory, tier]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodMatrices {
    pub value: Array2<f64>,
    pub policy: Array2<usize>,
}

/// Dense solver specialised to markdown-only pricing.
#[derive(Debug, Clone)]
pub struct VectorizedBackwardDP {
    tensors: PricingTensors,
    horizon: usize,
    gamma: f64,
}

impl VectorizedBackwardDP {
    /// # Errors
    /// Returns [`Error::InvalidDiscount`] unless `gamma` lies in (0, 1].
    pub fn new(tensors: PricingTensors, horizon: usize, gamma: f64) -> Result<Self> {
        if !(gamma > 0.0 && gamma <= 1.0) {
            return Err(Error::InvalidDiscount(gamma));
        }
        Ok(Self {
            tensors,
            horizon,
            gamma,
        })
    }

    pub fn from_problem(problem: &ClearanceProblem) -> Self {
        Self {
            tensors: problem.tensors(),
            horizon: problem.horizon(),
            gamma: problem.gamma(),
        }
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn tensors(&self) -> &PricingTensors {
        &self.tensors
    }

    /// Q matrix `[inventory, action]` given next period's value matrix.
    ///
    /// # Errors
    /// Returns [`Error::DimensionMismatch`] if `next_value` is not shaped
    /// `[inventory levels, tiers]`.
    pub fn q_function(&self, next_value: &Array2<f64>) -> Result<Array2<f64>> {
        let shape = (
            self.tensors.num_inventory_levels(),
            self.tensors.num_tiers(),
        );
        if next_value.dim() != shape {
            return Err(Error::dimension_mismatch(format!(
                "value matrix is {:?}, expected {:?}",
                next_value.dim(),
                shape
            )));
        }

        let columns: Vec<Array1<f64>> = (0..shape.1)
            .into_par_iter()
            .map(|action| {
                let prob = self.tensors.probability(action);
                let reward = self.tensors.reward(action);
                let expected_reward = (&prob * &reward).sum_axis(ndarray::Axis(1));
                let continuation = prob.dot(&next_value.column(action));
                expected_reward + continuation * self.gamma
            })
            .collect();

        let mut q = Array2::<f64>::zeros(shape);
        for (action, column) in columns.iter().enumerate() {
            q.column_mut(action).assign(column);
        }
        Ok(q)
    }

    /// Runs backward induction over all periods.
    pub fn solve(&self) -> Result<VectorizedSolution> {
        let shape = (
            self.tensors.num_inventory_levels(),
            self.tensors.num_tiers(),
        );
        info!(
            "vectorized backward induction: {} periods, {} inventory levels, {} tiers",
            self.horizon, shape.0, shape.1
        );

        let terminal = Array2::<f64>::zeros(shape);
        let mut periods: Vec<PeriodMatrices> = Vec::with_capacity(self.horizon);
        for period in (0..self.horizon).rev() {
            let later = periods.last().map_or(&terminal, |p| &p.value);
            let q = self.q_function(later)?;
            periods.push(markdown_scan(&q));
            debug!("period {} finalized", period);
        }
        // Computed latest period first.
        periods.reverse();

        info!("vectorized backward induction finished");
        Ok(VectorizedSolution { periods, terminal })
    }
}

/// Running maximum of each Q row from the deepest discount back to tier 0.
///
/// `value[[i, p]] = max_{a >= p} q[[i, a]]` and `policy[[i, p]]` is the
/// smallest `a` attaining it.
pub fn markdown_scan(q: &Array2<f64>) -> PeriodMatrices {
    let mut value = Array2::<f64>::zeros(q.raw_dim());
    let mut policy = Array2::<usize>::zeros(q.raw_dim());
    Zip::from(q.rows())
        .and(value.rows_mut())
        .and(policy.rows_mut())
        .par_for_each(|q_row, mut value_row, mut policy_row| {
            let mut best = f64::NEG_INFINITY;
            let mut best_action = q_row.len().saturating_sub(1);
            for action in (0..q_row.len()).rev() {
                if q_row[action] >= best {
                    best = q_row[action];
                    best_action = action;
                }
                value_row[action] = best;
                policy_row[action] = best_action;
            }
        });
    PeriodMatrices { value, policy }
}

/// Value/policy matrices of every period, earliest first.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorizedSolution {
    periods: Vec<PeriodMatrices>,
    terminal: Array2<f64>,
}

impl VectorizedSolution {
    pub fn horizon(&self) -> usize {
        self.periods.len()
    }

    pub fn periods(&self) -> &[PeriodMatrices] {
        &self.periods
    }

    pub fn period(&self, period: usize) -> Option<&PeriodMatrices> {
        self.periods.get(period)
    }

    /// Terminal (all zero) value matrix.
    pub fn terminal(&self) -> &Array2<f64> {
        &self.terminal
    }

    pub fn value(&self, period: usize, state: State) -> Option<f64> {
        if period == self.horizon() {
            return self.terminal.get((state.inventory, state.tier)).copied();
        }
        self.period(period)?
            .value
            .get((state.inventory, state.tier))
            .copied()
    }

    pub fn action(&self, period: usize, state: State) -> Option<usize> {
        self.period(period)?
            .policy
            .get((state.inventory, state.tier))
            .copied()
    }

    /// Table form of one period; `period == horizon` gives the terminal
    /// table with no actions.
    pub fn to_table(&self, period: usize) -> Option<ValuePolicyTable<State, usize>> {
        if period == self.horizon() {
            return Some(
                self.terminal
                    .indexed_iter()
                    .map(|((i, p), &value)| (State::new(i, p), Decision { value, action: None }))
                    .collect(),
            );
        }
        let matrices = self.period(period)?;
        Some(
            matrices
                .value
                .indexed_iter()
                .map(|((i, p), &value)| {
                    let action = Some(matrices.policy[[i, p]]);
                    (State::new(i, p), Decision { value, action })
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::poisson::TailApproximation;
    use crate::pricing::elasticity::{PriceGrid, PriceTier};
    use approx::assert_relative_eq;
    use ndarray::{array, Array3};

    #[test]
    fn test_markdown_scan() {
        let q = array![[1.0, 3.0, 2.0], [5.0, 4.0, 4.0], [0.0, 0.0, 0.0]];
        let scan = markdown_scan(&q);
        assert_eq!(scan.value, array![[3.0, 3.0, 2.0], [5.0, 4.0, 4.0], [0.0, 0.0, 0.0]]);
        // Ties resolve to the smallest allowed tier.
        assert_eq!(scan.policy, array![[1, 1, 2], [0, 1, 2], [0, 1, 2]]);
    }

    #[test]
    fn test_single_period_is_expected_revenue() {
        let grid = PriceGrid::from_tiers(vec![PriceTier::new(0.0, 0.8)]).unwrap();
        let problem =
            ClearanceProblem::from_grid(1, 2, grid, 1.0, TailApproximation::Exact).unwrap();
        let solution = VectorizedBackwardDP::from_problem(&problem).solve().unwrap();
        let demand = &problem.demand()[0];
        // E[min(D, 2)] = P(D = 1) + 2 P(D >= 2)
        let expected = demand.pmf(1) + 2.0 * demand.prob_at_least(2);
        assert_relative_eq!(
            solution.value(0, State::new(2, 0)).unwrap(),
            expected,
            max_relative = 1e-12
        );
        assert_eq!(solution.action(0, State::new(2, 0)), Some(0));
    }

    #[test]
    fn test_terminal_and_table_conversion() {
        let grid = PriceGrid::from_tiers(vec![
            PriceTier::new(0.0, 0.5),
            PriceTier::new(0.5, 1.5),
        ])
        .unwrap();
        let problem =
            ClearanceProblem::from_grid(2, 3, grid, 0.9, TailApproximation::default()).unwrap();
        let solution = VectorizedBackwardDP::from_problem(&problem).solve().unwrap();
        assert_eq!(solution.horizon(), 2);

        let terminal = solution.to_table(2).unwrap();
        assert_eq!(terminal.len(), 8);
        assert!(terminal.values().all(|d| d.value == 0.0 && d.action.is_none()));
        assert_eq!(solution.value(2, State::new(3, 1)), Some(0.0));
        assert_eq!(solution.action(2, State::new(3, 1)), None);

        let first = solution.to_table(0).unwrap();
        for (state, decision) in &first {
            assert_eq!(Some(decision.value), solution.value(0, *state));
            assert_eq!(decision.action, solution.action(0, *state));
            assert!(decision.action.unwrap() >= state.tier);
        }
        assert!(solution.to_table(3).is_none());
    }

    #[test]
    fn test_q_function_shape_check() {
        let tensors = PricingTensors::from_arrays(
            Array3::<f64>::zeros((2, 3, 3)),
            Array3::<f64>::zeros((2, 3, 3)),
        )
        .unwrap();
        let dp = VectorizedBackwardDP::new(tensors, 1, 1.0).unwrap();
        assert!(dp.q_function(&Array2::zeros((3, 2))).is_ok());
        assert!(matches!(
            dp.q_function(&Array2::zeros((2, 3))),
            Err(Error::DimensionMismatch(_))
        ));
    }

    #[test]
    fn test_invalid_gamma() {
        let tensors = PricingTensors::from_arrays(
            Array3::<f64>::zeros((1, 2, 2)),
            Array3::<f64>::zeros((1, 2, 2)),
        )
        .unwrap();
        assert!(matches!(
            VectorizedBackwardDP::new(tensors, 1, 0.0),
            Err(Error::InvalidDiscount(_))
        ));
    }
}
