mod error;
mod pool;
mod task;
#[cfg(test)]
pub(crate) mod test_support;
mod types;

pub use error::{ConcurrencyError, TaskError};
pub use pool::compute_all;
pub use task::PairVisibilityTask;
pub use types::{default_workers, SatResult, Satellite, SimulationContext};
