pub mod poisson;

pub use poisson::{PoissonDemand, TailApproximation, DEFAULT_TAIL_WINDOW};
