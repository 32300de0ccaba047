use thiserror::Error;

use crate::orbit::PropagationError;

/// Failure of a single pair; siblings keep running.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TaskError {
    #[error(transparent)]
    Propagation(#[from] PropagationError),
    #[error("worker panicked: {0}")]
    Panicked(String),
    #[error("abandoned after the deadline expired")]
    Abandoned,
}

/// Failure of the run as a whole.
#[derive(Debug, Error)]
pub enum ConcurrencyError {
    #[error("failed to start worker pool: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("wait for workers interrupted: {0}")]
    Interrupted(String),
}
