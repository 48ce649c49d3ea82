//! Clearance (markdown) pricing: choose a price tier each period to maximise
//! expected revenue from a fixed stock under Poisson demand.
//!
//! [`problem::ClearanceProblem`] builds both formulations of the same MDP: an
//! explicit transition table for the generic
//! [`BackwardDP`](crate::cs::dynamic::backward_induction::BackwardDP) solver
//! and dense per-tier tensors for [`vectorized::VectorizedBackwardDP`].

pub mod config;
pub mod elasticity;
pub mod policy;
pub mod problem;
pub mod sensitivity;
pub mod simulation;
pub mod tensor;
pub mod vectorized;


pub use config::ClearanceConfig;
pub use elasticity::{ElasticityCurve, PriceGrid, PriceTier};
pub use policy::ClearancePolicy;
pub use problem::{ClearanceProblem, State};
pub use sensitivity::opening_price_surface;
pub use simulation::{evaluate_policy, simulate_trace, PerformanceSummary, Trace};
pub use tensor::PricingTensors;
pub use vectorized::{PeriodMatrices, VectorizedBackwardDP, VectorizedSolution};
