pub mod cs;
pub mod error;
pub mod math;
pub mod pricing;

pub use cs::dynamic;
pub use error::{Error, Result};
