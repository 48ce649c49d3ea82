use std::process::ExitCode;
use std::time::Instant;

use clearance_dp::pricing::{
    ClearanceConfig, ClearancePolicy, ClearanceProblem, VectorizedBackwardDP,
};
use clearance_dp::Result;

fn report<P: ClearancePolicy>(
    name: &str,
    problem: &ClearanceProblem,
    policy: &P,
    seconds: f64,
) -> Result<()> {
    let start = problem.initial_state();
    let (value, tier) = policy.opening_decision(start).ok_or_else(|| {
        clearance_dp::Error::invalid_input(format!("{name}: no decision at {start}"))
    })?;
    let price = problem
        .grid()
        .tier(tier)
        .map(|t| t.price())
        .ok_or_else(|| clearance_dp::Error::invalid_input(format!("{name}: unknown tier {tier}")))?;
    println!("{name}:");
    println!("  optimal value:  {value:.6}");
    println!("  opening price:  {price:.4} (tier {tier})");
    println!("  elapsed:        {seconds:.4}s");
    Ok(())
}

fn run() -> Result<()> {
    let config = ClearanceConfig::default();
    println!(
        "horizon {}, inventory {}, {} price levels",
        config.horizon, config.initial_inventory, config.price_levels
    );

    let timer = Instant::now();
    let problem = ClearanceProblem::new(&config)?;
    let table = problem.backward_dp()?.solve()?;
    let table_seconds = timer.elapsed().as_secs_f64();
    report("table-driven", &problem, &table, table_seconds)?;

    let timer = Instant::now();
    let problem = ClearanceProblem::new(&config)?;
    let dense = VectorizedBackwardDP::from_problem(&problem).solve()?;
    let dense_seconds = timer.elapsed().as_secs_f64();
    report("vectorized", &problem, &dense, dense_seconds)?;

    if dense_seconds > 0.0 {
        println!("speedup: {:.1}x", table_seconds / dense_seconds);
    }
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
