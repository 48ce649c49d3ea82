//! Clearance pricing as a finite MDP.
//!
//! A state is `(inventory, tier)`. Choosing tier `p1 >= p` sells
//! `min(D, inventory)` units at tier `p1`'s price, where `D` is Poisson with
//! that tier's rate, and moves to `(inventory - sold, p1)`. Selling out
//! absorbs the whole demand tail `P(D >= inventory)`.

use std::collections::BTreeMap;
use std::fmt;

use log::{debug, warn};
use rayon::prelude::*;

use crate::cs::dynamic::backward_induction::{
    BackwardDP, Outcome, SuccessorTable, TransitionTable,
};
use crate::error::{Error, Result};
use crate::math::poisson::{PoissonDemand, TailApproximation};
use crate::pricing::config::ClearanceConfig;
use crate::pricing::elasticity::PriceGrid;
use crate::pricing::tensor::PricingTensors;

/// Probability mass a transition row may lose to tail truncation before a
/// warning is logged.
const MASS_LOSS_WARNING: f64 = 1e-3;

/// Remaining stock and current price tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct State {
    pub inventory: usize,
    pub tier: usize,
}

impl State {
    pub fn new(inventory: usize, tier: usize) -> Self {
        Self { inventory, tier }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(inventory {}, tier {})", self.inventory, self.tier)
    }
}

/// A validated clearance-pricing instance, ready for either solver.
#[derive(Debug, Clone)]
pub struct ClearanceProblem {
    horizon: usize,
    initial_inventory: usize,
    grid: PriceGrid,
    demand: Vec<PoissonDemand>,
    gamma: f64,
}

impl ClearanceProblem {
    pub fn new(config: &ClearanceConfig) -> Result<Self> {
        config.validate()?;
        Self::from_grid(
            config.horizon,
            config.initial_inventory,
            config.price_grid()?,
            config.gamma,
            config.tail,
        )
    }

    /// Instance over an explicit price grid.
    ///
    /// # Errors
    /// Rejects `gamma` outside (0, 1] and zero-width tail windows. Grid rates
    /// are already validated by [`PriceGrid`].
    pub fn from_grid(
        horizon: usize,
        initial_inventory: usize,
        grid: PriceGrid,
        gamma: f64,
        tail: TailApproximation,
    ) -> Result<Self> {
        if !(gamma > 0.0 && gamma <= 1.0) {
            return Err(Error::InvalidDiscount(gamma));
        }
        let demand = grid.demand_models(tail)?;
        for (tier, model) in demand.iter().enumerate() {
            // Row 0 loses the most mass: P(D >= window).
            let lost = 1.0 - model.prob_at_least(0);
            if lost > MASS_LOSS_WARNING {
                warn!(
                    "tier {} (rate {:.4}) loses {:.2e} probability mass to tail truncation",
                    tier,
                    model.rate(),
                    lost
                );
            }
        }
        Ok(Self {
            horizon,
            initial_inventory,
            grid,
            demand,
            gamma,
        })
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn initial_inventory(&self) -> usize {
        self.initial_inventory
    }

    pub fn grid(&self) -> &PriceGrid {
        &self.grid
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn demand(&self) -> &[PoissonDemand] {
        &self.demand
    }

    pub fn num_tiers(&self) -> usize {
        self.grid.len()
    }

    /// Inventory levels `0..=initial_inventory`.
    pub fn num_inventory_levels(&self) -> usize {
        self.initial_inventory + 1
    }

    /// Full stock at full price.
    pub fn initial_state(&self) -> State {
        State::new(self.initial_inventory, 0)
    }

    /// Every state, inventory-major.
    pub fn states(&self) -> impl Iterator<Item = State> + '_ {
        (0..self.num_inventory_levels())
            .flat_map(move |s| (0..self.num_tiers()).map(move |p| State::new(s, p)))
    }

    /// Per-period transition/reward table shared by every period.
    pub fn transition_table(&self) -> TransitionTable<State, usize> {
        let tiers = self.num_tiers();
        let table: TransitionTable<State, usize> = (0..self.num_inventory_levels())
            .into_par_iter()
            .flat_map_iter(|s| {
                let rows: Vec<Vec<f64>> = self
                    .demand
                    .iter()
                    .map(|d| d.stockout_distribution(s))
                    .collect();
                (0..tiers).map(move |p| {
                    let actions: BTreeMap<usize, SuccessorTable<State>> = (p..tiers)
                        .map(|p1| (p1, self.successors(s, p1, &rows[p1])))
                        .collect();
                    (State::new(s, p), actions)
                })
            })
            .collect();
        debug!(
            "built transition table: {} states, {} tiers",
            table.len(),
            tiers
        );
        table
    }

    fn successors(&self, inventory: usize, tier: usize, sold: &[f64]) -> SuccessorTable<State> {
        let price = self.grid.tiers()[tier].price();
        sold.iter()
            .enumerate()
            .map(|(d, &probability)| {
                (
                    State::new(inventory - d, tier),
                    Outcome::new(probability, d as f64 * price),
                )
            })
            .collect()
    }

    /// Zero salvage value for every state.
    pub fn terminal_values(&self) -> BTreeMap<State, f64> {
        self.states().map(|s| (s, 0.0)).collect()
    }

    /// Table-driven solver over `horizon` copies of the transition table.
    pub fn backward_dp(&self) -> Result<BackwardDP<State, usize>> {
        BackwardDP::stationary(
            self.transition_table(),
            self.horizon,
            self.terminal_values(),
            self.gamma,
        )
    }

    /// Dense per-tier transition and reward tensors.
    pub fn tensors(&self) -> PricingTensors {
        PricingTensors::build(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::elasticity::PriceTier;
    use approx::assert_relative_eq;

    fn small_problem() -> ClearanceProblem {
        let grid = PriceGrid::from_tiers(vec![
            PriceTier::new(0.0, 0.5),
            PriceTier::new(0.3, 0.9),
            PriceTier::new(0.6, 1.4),
        ])
        .unwrap();
        ClearanceProblem::from_grid(2, 3, grid, 1.0, TailApproximation::default()).unwrap()
    }

    #[test]
    fn test_state_ordering_and_display() {
        assert!(State::new(1, 5) < State::new(2, 0));
        assert!(State::new(2, 0) < State::new(2, 1));
        assert_eq!(State::new(3, 1).to_string(), "(inventory 3, tier 1)");
    }

    #[test]
    fn test_states_cover_grid() {
        let problem = small_problem();
        let states: Vec<State> = problem.states().collect();
        assert_eq!(states.len(), 4 * 3);
        assert_eq!(states[0], State::new(0, 0));
        assert_eq!(states[11], State::new(3, 2));
        assert_eq!(problem.initial_state(), State::new(3, 0));
    }

    #[test]
    fn test_actions_only_deepen_discount() {
        let table = small_problem().transition_table();
        assert_eq!(table.len(), 12);
        for (state, actions) in &table {
            let tiers: Vec<usize> = actions.keys().copied().collect();
            let expected: Vec<usize> = (state.tier..3).collect();
            assert_eq!(tiers, expected);
            for (&action, successors) in actions {
                assert_eq!(successors.len(), state.inventory + 1);
                for next in successors.keys() {
                    assert_eq!(next.tier, action);
                    assert!(next.inventory <= state.inventory);
                }
            }
        }
    }

    #[test]
    fn test_transition_probabilities_and_rewards() {
        let problem = small_problem();
        let table = problem.transition_table();
        let demand = &problem.demand()[1];
        let successors = &table[&State::new(3, 0)][&1];

        // Two units sold at tier 1: P(D = 2), revenue 2 * 0.7.
        let two = successors[&State::new(1, 1)];
        assert_relative_eq!(two.probability, demand.pmf(2));
        assert_relative_eq!(two.reward, 2.0 * 0.7, max_relative = 1e-12);

        // Sell-out absorbs the tail.
        let out = successors[&State::new(0, 1)];
        assert_relative_eq!(out.probability, demand.prob_at_least(3));
        assert_relative_eq!(out.reward, 3.0 * 0.7, max_relative = 1e-12);

        let mass: f64 = successors.values().map(|o| o.probability).sum();
        assert_relative_eq!(mass, 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_terminal_values_are_zero() {
        let problem = small_problem();
        let terminal = problem.terminal_values();
        assert_eq!(terminal.len(), 12);
        assert!(terminal.values().all(|&v| v == 0.0));
    }

    #[test]
    fn test_invalid_problem() {
        let grid = PriceGrid::from_tiers(vec![PriceTier::new(0.0, 1.0)]).unwrap();
        assert!(matches!(
            ClearanceProblem::from_grid(1, 1, grid, 0.0, TailApproximation::default()),
            Err(Error::InvalidDiscount(_))
        ));
        let config = ClearanceConfig {
            price_levels: 0,
            ..Default::default()
        };
        assert!(ClearanceProblem::new(&config).is_err());
    }
}
