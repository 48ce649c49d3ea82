//! Finite-horizon backward induction over explicit transition tables.
//!
//! Every period is described by a nested table
//! `state -> action -> next state -> (probability, reward)`. Starting from the
//! caller's terminal values, the solver performs one exact Bellman backup per
//! period, latest period first, and hands back the value/policy tables in
//! chronological order (index 0 is the earliest period).
//!
//! Actions are enumerated in ascending order and an action only replaces the
//! incumbent when its expected return is strictly greater, so ties always go
//! to the smallest action.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

use log::{debug, info};
use rayon::prelude::*;

use crate::error::{Error, Result};

/// Probability and immediate reward of one `(state, action) -> next state` edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Outcome {
    pub probability: f64,
    pub reward: f64,
}

impl Outcome {
    pub fn new(probability: f64, reward: f64) -> Self {
        Self {
            probability,
            reward,
        }
    }
}

/// Successor distribution of a single `(state, action)` pair.
pub type SuccessorTable<S> = BTreeMap<S, Outcome>;

/// One period of dynamics: `state -> action -> next state -> outcome`.
///
/// Probabilities for a fixed `(state, action)` must be non-negative. They are
/// not required to sum to exactly one; truncated demand tails are tolerated.
pub type TransitionTable<S, A> = BTreeMap<S, BTreeMap<A, SuccessorTable<S>>>;

/// Optimal value of a state and the action achieving it.
///
/// `action` is `None` only for terminal values supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision<A> {
    pub value: f64,
    pub action: Option<A>,
}

/// Optimal value and action for every state of one period.
pub type ValuePolicyTable<S, A> = BTreeMap<S, Decision<A>>;

/// Table-driven finite-horizon solver.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use clearance_dp::cs::dynamic::backward_induction::{BackwardDP, Outcome, TransitionTable};
///
/// // One state, two actions: "wait" pays 1, "sell" pays 2.
/// let mut actions = BTreeMap::new();
/// actions.insert(0_u8, BTreeMap::from([(0_u8, Outcome::new(1.0, 1.0))]));
/// actions.insert(1_u8, BTreeMap::from([(0_u8, Outcome::new(1.0, 2.0))]));
/// let table: TransitionTable<u8, u8> = BTreeMap::from([(0_u8, actions)]);
///
/// let terminal = BTreeMap::from([(0_u8, 0.0)]);
/// let dp = BackwardDP::stationary(table, 3, terminal, 1.0).unwrap();
/// let solution = dp.solve().unwrap();
///
/// assert_eq!(solution.horizon(), 3);
/// assert_eq!(solution.decision(0, &0).unwrap().value, 6.0);
/// assert_eq!(solution.decision(0, &0).unwrap().action, Some(1));
/// ```
#[derive(Debug, Clone)]
pub struct BackwardDP<S, A> {
    /// One table per period, earliest period first.
    transitions: Vec<Arc<TransitionTable<S, A>>>,
    terminal_values: BTreeMap<S, f64>,
    gamma: f64,
}

impl<S, A> BackwardDP<S, A>
where
    S: Ord + Copy + Debug + Send + Sync,
    A: Ord + Copy + Debug + Send + Sync,
{
    /// Creates a solver from one transition table per period (earliest first).
    ///
    /// # Errors
    /// Returns an error if `gamma` is outside (0, 1], if the terminal table or
    /// any period table is empty, or if any probability is negative or not
    /// finite.
    pub fn new(
        transitions: Vec<TransitionTable<S, A>>,
        terminal_values: BTreeMap<S, f64>,
        gamma: f64,
    ) -> Result<Self> {
        Self::from_shared(
            transitions.into_iter().map(Arc::new).collect(),
            terminal_values,
            gamma,
        )
    }

    /// Creates a solver whose dynamics are the same `table` in every one of
    /// `horizon` periods. The table is shared, not copied.
    pub fn stationary(
        table: TransitionTable<S, A>,
        horizon: usize,
        terminal_values: BTreeMap<S, f64>,
        gamma: f64,
    ) -> Result<Self> {
        Self::from_shared(vec![Arc::new(table); horizon], terminal_values, gamma)
    }

    fn from_shared(
        transitions: Vec<Arc<TransitionTable<S, A>>>,
        terminal_values: BTreeMap<S, f64>,
        gamma: f64,
    ) -> Result<Self> {
        if !(gamma > 0.0 && gamma <= 1.0) {
            return Err(Error::InvalidDiscount(gamma));
        }
        if terminal_values.is_empty() {
            return Err(Error::EmptyStateSpace);
        }

        let mut previous: Option<&Arc<TransitionTable<S, A>>> = None;
        for (period, table) in transitions.iter().enumerate() {
            // Replicated tables only need checking once.
            if previous.is_some_and(|p| Arc::ptr_eq(p, table)) {
                continue;
            }
            validate_table(period, table)?;
            previous = Some(table);
        }

        Ok(Self {
            transitions,
            terminal_values,
            gamma,
        })
    }

    /// Number of decision periods.
    pub fn horizon(&self) -> usize {
        self.transitions.len()
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    /// Transition table of `period`, if it exists.
    pub fn transitions(&self, period: usize) -> Option<&TransitionTable<S, A>> {
        self.transitions.get(period).map(|t| t.as_ref())
    }

    /// The caller's terminal values, each with no action attached.
    pub fn terminal_table(&self) -> ValuePolicyTable<S, A> {
        self.terminal_values
            .iter()
            .map(|(&s, &value)| (s, Decision { value, action: None }))
            .collect()
    }

    /// Runs backward induction from the terminal period to period 0.
    ///
    /// # Errors
    /// Fails with [`Error::NoFeasibleAction`] when a state offers no action and
    /// with [`Error::MissingSuccessor`] when a transition references a state
    /// the later period never valued. No partial result is returned.
    pub fn solve(&self) -> Result<BackwardSolution<S, A>> {
        let terminal = self.terminal_table();
        info!(
            "backward induction: {} periods, {} terminal states",
            self.horizon(),
            terminal.len()
        );

        let mut periods: Vec<ValuePolicyTable<S, A>> = Vec::with_capacity(self.horizon());
        for (period, table) in self.transitions.iter().enumerate().rev() {
            let later = periods.last().unwrap_or(&terminal);
            let finalized = bellman_backup(period, table, later, self.gamma)?;
            debug!("period {} finalized with {} states", period, finalized.len());
            periods.push(finalized);
        }
        periods.reverse();

        info!("backward induction finished");
        Ok(BackwardSolution { periods, terminal })
    }
}

fn validate_table<S, A>(period: usize, table: &TransitionTable<S, A>) -> Result<()>
where
    S: Debug,
    A: Debug,
{
    if table.is_empty() {
        return Err(Error::EmptyStateSpace);
    }
    for (state, actions) in table {
        for (action, successors) in actions {
            for (next, outcome) in successors {
                let p = outcome.probability;
                if !p.is_finite() || p < 0.0 {
                    return Err(Error::InvalidProbability {
                        period,
                        state: format!("{state:?}"),
                        action: format!("{action:?}"),
                        next: format!("{next:?}"),
                        probability: p,
                    });
                }
            }
        }
    }
    Ok(())
}

/// One exact Bellman backup. States are independent of each other within a
/// period, so they are evaluated in parallel against the immutable `later`
/// table.
fn bellman_backup<S, A>(
    period: usize,
    table: &TransitionTable<S, A>,
    later: &ValuePolicyTable<S, A>,
    gamma: f64,
) -> Result<ValuePolicyTable<S, A>>
where
    S: Ord + Copy + Debug + Send + Sync,
    A: Ord + Copy + Debug + Send + Sync,
{
    table
        .par_iter()
        .map(|(&state, actions)| {
            let mut best: Option<Decision<A>> = None;
            for (&action, successors) in actions {
                let q = compute_q_value(period, state, action, successors, later, gamma)?;
                if best.map_or(true, |b| q > b.value) {
                    best = Some(Decision {
                        value: q,
                        action: Some(action),
                    });
                }
            }
            best.map(|decision| (state, decision))
                .ok_or_else(|| Error::NoFeasibleAction {
                    period,
                    state: format!("{state:?}"),
                })
        })
        .collect()
}

/// Compute Q(s, a) = sum_{s'} P(s'|s,a) [ R(s,a,s') + gamma * V(s') ].
fn compute_q_value<S, A>(
    period: usize,
    state: S,
    action: A,
    successors: &SuccessorTable<S>,
    later: &ValuePolicyTable<S, A>,
    gamma: f64,
) -> Result<f64>
where
    S: Ord + Debug,
    A: Debug,
{
    successors.iter().try_fold(0.0, |q, (next, outcome)| {
        let later_value = later
            .get(next)
            .map(|d| d.value)
            .ok_or_else(|| Error::MissingSuccessor {
                period,
                state: format!("{state:?}"),
                action: format!("{action:?}"),
                next: format!("{next:?}"),
            })?;
        Ok(q + outcome.probability * (outcome.reward + gamma * later_value))
    })
}

/// Value/policy tables of every period plus the terminal table.
#[derive(Debug, Clone, PartialEq)]
pub struct BackwardSolution<S, A> {
    periods: Vec<ValuePolicyTable<S, A>>,
    terminal: ValuePolicyTable<S, A>,
}

impl<S: Ord, A> BackwardSolution<S, A> {
    pub fn horizon(&self) -> usize {
        self.periods.len()
    }

    /// Tables of periods `0..horizon`, earliest first.
    pub fn periods(&self) -> &[ValuePolicyTable<S, A>] {
        &self.periods
    }

    pub fn terminal(&self) -> &ValuePolicyTable<S, A> {
        &self.terminal
    }

    /// Table of `period`; `period == horizon` yields the terminal table.
    pub fn period(&self, period: usize) -> Option<&ValuePolicyTable<S, A>> {
        match period.cmp(&self.periods.len()) {
            std::cmp::Ordering::Less => self.periods.get(period),
            std::cmp::Ordering::Equal => Some(&self.terminal),
            std::cmp::Ordering::Greater => None,
        }
    }

    pub fn decision(&self, period: usize, state: &S) -> Option<&Decision<A>> {
        self.period(period).and_then(|table| table.get(state))
    }

    pub fn into_periods(self) -> Vec<ValuePolicyTable<S, A>> {
        self.periods
    }
}
