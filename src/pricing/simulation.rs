//! Monte-Carlo evaluation of a solved pricing policy.
//!
//! Each trace starts at full stock and full price, follows the policy for
//! every period, draws Poisson demand at the chosen tier and sells
//! `min(stock, demand)` units. Revenue, salvage (stock left at the end) and
//! a-markdown (`1 - revenue - salvage`) are reported as fractions of the
//! initial stock's full-price value.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Poisson};
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::pricing::policy::ClearancePolicy;
use crate::pricing::problem::{ClearanceProblem, State};

/// One simulated selling season.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    /// Stock left after each period.
    pub remaining: Vec<usize>,
    /// Price charged in each period.
    pub prices: Vec<f64>,
    /// Discount charged in each period.
    pub discounts: Vec<f64>,
    /// Total revenue collected.
    pub revenue: f64,
}

/// Summary statistics over many traces. Standard deviations are population
/// deviations.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceSummary {
    /// Policy value at the initial state, period 0.
    pub optimal_value: f64,
    pub mean_revenue: f64,
    pub stdev_revenue: f64,
    pub mean_salvage: f64,
    pub stdev_salvage: f64,
    pub mean_markdown: f64,
    pub stdev_markdown: f64,
    /// Mean remaining stock per period, as a fraction of initial stock.
    pub mean_remaining: Vec<f64>,
    pub stdev_remaining: Vec<f64>,
    /// Mean discount per period.
    pub mean_discount: Vec<f64>,
    pub stdev_discount: Vec<f64>,
}

fn samplers(problem: &ClearanceProblem) -> Result<Vec<Poisson<f64>>> {
    problem
        .grid()
        .tiers()
        .iter()
        .map(|tier| Poisson::new(tier.rate).map_err(|_| Error::InvalidRate(tier.rate)))
        .collect()
}

/// Simulates one trace of `problem.horizon()` periods.
///
/// # Errors
/// Returns [`Error::InvalidInput`] if the policy has no action for a state it
/// reaches, or picks a tier outside the grid.
pub fn simulate_trace<P, R>(problem: &ClearanceProblem, policy: &P, rng: &mut R) -> Result<Trace>
where
    P: ClearancePolicy + ?Sized,
    R: Rng + ?Sized,
{
    let samplers = samplers(problem)?;
    run_trace(problem, policy, &samplers, rng)
}

fn run_trace<P, R>(
    problem: &ClearanceProblem,
    policy: &P,
    samplers: &[Poisson<f64>],
    rng: &mut R,
) -> Result<Trace>
where
    P: ClearancePolicy + ?Sized,
    R: Rng + ?Sized,
{
    let horizon = problem.horizon();
    let mut trace = Trace {
        remaining: Vec::with_capacity(horizon),
        prices: Vec::with_capacity(horizon),
        discounts: Vec::with_capacity(horizon),
        revenue: 0.0,
    };
    let mut state = problem.initial_state();
    for period in 0..horizon {
        let action = policy.action(period, state).ok_or_else(|| {
            Error::invalid_input(format!("policy has no action for {state} in period {period}"))
        })?;
        let (tier, sampler) = problem
            .grid()
            .tier(action)
            .zip(samplers.get(action))
            .ok_or_else(|| Error::invalid_input(format!("policy chose unknown tier {action}")))?;

        let demand = sampler.sample(rng) as usize;
        let sold = demand.min(state.inventory);
        trace.revenue += sold as f64 * tier.price();
        state = State::new(state.inventory - sold, action);

        trace.remaining.push(state.inventory);
        trace.prices.push(tier.price());
        trace.discounts.push(tier.discount);
    }
    Ok(trace)
}

fn mean_stdev(values: impl Iterator<Item = f64> + Clone) -> (f64, f64) {
    let n = values.clone().count();
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = values.clone().sum::<f64>() / n as f64;
    let variance = values.map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
    (mean, variance.sqrt())
}

/// Simulates `traces` seasons under `policy` and summarises them.
///
/// Trace `i` draws from its own ChaCha stream seeded with `seed + i`, so the
/// result depends only on `seed`, not on thread scheduling.
///
/// # Errors
/// Needs at least one trace and a positive initial inventory.
pub fn evaluate_policy<P>(
    problem: &ClearanceProblem,
    policy: &P,
    traces: usize,
    seed: u64,
) -> Result<PerformanceSummary>
where
    P: ClearancePolicy + Sync + ?Sized,
{
    if traces == 0 {
        return Err(Error::invalid_input("need at least one trace"));
    }
    let stock = problem.initial_inventory();
    if stock == 0 {
        return Err(Error::invalid_input(
            "initial inventory must be positive to normalise results",
        ));
    }
    let optimal_value = policy
        .value(0, problem.initial_state())
        .ok_or_else(|| Error::invalid_input("policy has no value at the initial state"))?;

    let samplers = samplers(problem)?;
    let runs: Vec<Trace> = (0..traces)
        .into_par_iter()
        .map(|i| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(i as u64));
            run_trace(problem, policy, &samplers, &mut rng)
        })
        .collect::<Result<_>>()?;

    let stock = stock as f64;
    let (mean_revenue, stdev_revenue) = mean_stdev(runs.iter().map(|t| t.revenue / stock));
    let salvage = |t: &Trace| t.remaining.last().map_or(stock, |&r| r as f64) / stock;
    let (mean_salvage, stdev_salvage) = mean_stdev(runs.iter().map(salvage));

    let horizon = problem.horizon();
    let mut mean_remaining = Vec::with_capacity(horizon);
    let mut stdev_remaining = Vec::with_capacity(horizon);
    let mut mean_discount = Vec::with_capacity(horizon);
    let mut stdev_discount = Vec::with_capacity(horizon);
    for period in 0..horizon {
        let (m, s) = mean_stdev(runs.iter().map(|t| t.remaining[period] as f64 / stock));
        mean_remaining.push(m);
        stdev_remaining.push(s);
        let (m, s) = mean_stdev(runs.iter().map(|t| t.discounts[period]));
        mean_discount.push(m);
        stdev_discount.push(s);
    }

    Ok(PerformanceSummary {
        optimal_value,
        mean_revenue,
        stdev_revenue,
        mean_salvage,
        stdev_salvage,
        mean_markdown: 1.0 - mean_salvage - mean_revenue,
        stdev_markdown: (stdev_salvage.powi(2) + stdev_revenue.powi(2)).sqrt(),
        mean_remaining,
        stdev_remaining,
        mean_discount,
        stdev_discount,
    })
}
