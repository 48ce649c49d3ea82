use ndarray::Array2;
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::pricing::config::ClearanceConfig;
use crate::pricing::problem::{ClearanceProblem, State};
use crate::pricing::vectorized::VectorizedBackwardDP;

/// Recommended opening price for every season length and starting stock.
///
/// Entry `[inventory - 1, horizon - 1]` is the price charged at period 0 from
/// `(inventory, 0)` when `horizon` periods remain, for `inventory` in
/// `1..=config.initial_inventory` and `horizon` in `1..=config.horizon`.
///
/// Dynamics are stationary, so period `t` of a `T`-period solution is period 0
/// of a `T - t`-period one; each inventory level needs a single solve.
pub fn opening_price_surface(config: &ClearanceConfig) -> Result<Array2<f64>> {
    config.validate()?;
    let grid = config.price_grid()?;
    let horizon = config.horizon;

    let rows: Vec<Vec<f64>> = (1..=config.initial_inventory)
        .into_par_iter()
        .map(|inventory| -> Result<Vec<f64>> {
            let problem = ClearanceProblem::from_grid(
                horizon,
                inventory,
                grid.clone(),
                config.gamma,
                config.tail,
            )?;
            let solution = VectorizedBackwardDP::from_problem(&problem).solve()?;
            (1..=horizon)
                .map(|remaining| -> Result<f64> {
                    let state = State::new(inventory, 0);
                    let tier = solution
                        .action(horizon - remaining, state)
                        .and_then(|a| grid.tier(a))
                        .ok_or_else(|| {
                            Error::dimension_mismatch(format!(
                                "no decision for {state} with {remaining} periods left"
                            ))
                        })?;
                    Ok(tier.price())
                })
                .collect()
        })
        .collect::<Result<Vec<_>>>()?;

    let mut surface = Array2::<f64>::zeros((config.initial_inventory, horizon));
    for (i, row) in rows.iter().enumerate() {
        for (t, &price) in row.iter().enumerate() {
            surface[[i, t]] = price;
        }
    }
    Ok(surface)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::policy::ClearancePolicy;
    use approx::assert_relative_eq;

    fn config() -> ClearanceConfig {
        ClearanceConfig {
            horizon: 5,
            initial_inventory: 6,
            price_levels: 10,
            ..Default::default()
        }
    }

    #[test]
    fn test_surface_matches_direct_solves() {
        let config = config();
        let surface = opening_price_surface(&config).unwrap();
        assert_eq!(surface.dim(), (6, 5));

        for (inventory, horizon) in [(1, 1), (3, 4), (6, 5), (6, 2)] {
            let direct = ClearanceConfig {
                horizon,
                initial_inventory: inventory,
                ..config.clone()
            };
            let problem = ClearanceProblem::new(&direct).unwrap();
            let solution = VectorizedBackwardDP::from_problem(&problem).solve().unwrap();
            let (_, tier) = solution.opening_decision(problem.initial_state()).unwrap();
            let price = problem.grid().tier(tier).unwrap().price();
            assert_relative_eq!(surface[[inventory - 1, horizon - 1]], price);
        }
    }

    #[test]
    fn test_prices_within_grid() {
        let surface = opening_price_surface(&config()).unwrap();
        assert!(surface.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn test_empty_surface() {
        let config = ClearanceConfig {
            horizon: 0,
            initial_inventory: 3,
            ..config()
        };
        assert_eq!(opening_price_surface(&config).unwrap().dim(), (3, 0));
    }
}
