use thiserror::Error;

/// Errors raised while building or solving a finite-horizon decision problem.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A construction parameter is out of range.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Poisson demand needs a positive, finite arrival rate.
    #[error("demand rate must be positive and finite, got {0}")]
    InvalidRate(f64),

    /// The discount factor must lie in (0, 1].
    #[error("discount factor must lie in (0, 1], got {0}")]
    InvalidDiscount(f64),

    /// A transition carries a negative or non-finite probability.
    #[error("period {period}: transition {state} -> {next} under action {action} has invalid probability {probability}")]
    InvalidProbability {
        period: usize,
        state: String,
        action: String,
        next: String,
        probability: f64,
    },

    /// A period (or the terminal table) enumerates no states.
    #[error("state space is empty")]
    EmptyStateSpace,

    /// A state offers no action, so its optimal value is undefined.
    #[error("period {period}: state {state} has no feasible action")]
    NoFeasibleAction { period: usize, state: String },

    /// A transition points at a state the later period never valued.
    #[error("period {period}: transition {state} -> {next} under action {action} references a state with no finalized value")]
    MissingSuccessor {
        period: usize,
        state: String,
        action: String,
        next: String,
    },

    /// Dense matrices disagree in shape.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),
}

impl Error {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    pub fn dimension_mismatch(msg: impl Into<String>) -> Self {
        Error::DimensionMismatch(msg.into())
    }
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
