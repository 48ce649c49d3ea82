pub mod backward_induction;

// Re-export the table-driven solver with descriptive names
pub use backward_induction::{
    BackwardDP, BackwardSolution, Decision, Outcome, SuccessorTable, TransitionTable,
    ValuePolicyTable,
};
