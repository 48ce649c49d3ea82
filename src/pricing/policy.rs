use crate::cs::dynamic::backward_induction::BackwardSolution;
use crate::pricing::problem::State;
use crate::pricing::vectorized::VectorizedSolution;

/// Read access to a solved pricing policy, whichever solver produced it.
pub trait ClearancePolicy {
    /// Number of decision periods.
    fn horizon(&self) -> usize;

    /// Optimal expected revenue from `state` at the start of `period`.
    fn value(&self, period: usize, state: State) -> Option<f64>;

    /// Tier to charge in `state` during `period`.
    fn action(&self, period: usize, state: State) -> Option<usize>;

    /// `(value, tier)` at period 0 for the given state.
    fn opening_decision(&self, state: State) -> Option<(f64, usize)> {
        Some((self.value(0, state)?, self.action(0, state)?))
    }
}

impl ClearancePolicy for BackwardSolution<State, usize> {
    fn horizon(&self) -> usize {
        BackwardSolution::horizon(self)
    }

    fn value(&self, period: usize, state: State) -> Option<f64> {
        self.decision(period, &state).map(|d| d.value)
    }

    fn action(&self, period: usize, state: State) -> Option<usize> {
        self.decision(period, &state).and_then(|d| d.action)
    }
}

impl ClearancePolicy for VectorizedSolution {
    fn horizon(&self) -> usize {
        VectorizedSolution::horizon(self)
    }

    fn value(&self, period: usize, state: State) -> Option<f64> {
        VectorizedSolution::value(self, period, state)
    }

    fn action(&self, period: usize, state: State) -> Option<usize> {
        VectorizedSolution::action(self, period, state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::poisson::TailApproximation;
    use crate::pricing::elasticity::{PriceGrid, PriceTier};
    use crate::pricing::problem::ClearanceProblem;
    use crate::pricing::vectorized::VectorizedBackwardDP;
    use approx::assert_relative_eq;

    fn opening<P: ClearancePolicy>(policy: &P, state: State) -> (f64, usize) {
        policy.opening_decision(state).unwrap()
    }

    #[test]
    fn test_both_solutions_answer_through_trait() {
        let grid = PriceGrid::from_tiers(vec![
            PriceTier::new(0.0, 0.3),
            PriceTier::new(0.4, 1.1),
        ])
        .unwrap();
        let problem =
            ClearanceProblem::from_grid(3, 4, grid, 1.0, TailApproximation::default()).unwrap();
        let table = problem.backward_dp().unwrap().solve().unwrap();
        let dense = VectorizedBackwardDP::from_problem(&problem).solve().unwrap();

        let state = problem.initial_state();
        let (v1, a1) = opening(&table, state);
        let (v2, a2) = opening(&dense, state);
        assert_relative_eq!(v1, v2, max_relative = 1e-9);
        assert_eq!(a1, a2);
        assert_eq!(ClearancePolicy::horizon(&table), 3);
        assert_eq!(ClearancePolicy::horizon(&dense), 3);

        // Terminal period has values but no action.
        assert_eq!(ClearancePolicy::value(&table, 3, state), Some(0.0));
        assert_eq!(ClearancePolicy::action(&table, 3, state), None);
        assert_eq!(ClearancePolicy::action(&dense, 3, state), None);
    }
}
