use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("invalid {field} = {value}: {reason}")]
    InvalidElement {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },
    #[error("malformed entry: {0}")]
    Malformed(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PropagationError {
    #[error("Kepler's equation did not converge at {time} (M = {mean_anomaly} rad, e = {eccentricity}) after {iterations} iterations")]
    KeplerDidNotConverge {
        time: chrono::DateTime<chrono::Utc>,
        mean_anomaly: f64,
        eccentricity: f64,
        iterations: usize,
    },
    #[error("unsupported eccentricity {0} (two-body propagation requires 0 <= e < 1)")]
    UnsupportedEccentricity(f64),
    #[error("requested time {requested} is outside the ephemeris interval [{start}, {end}]")]
    OutsideEphemeris {
        requested: chrono::DateTime<chrono::Utc>,
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
    },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EphemerisError {
    #[error("ephemeris step must be positive, got {0} s")]
    InvalidStep(f64),
    #[error(transparent)]
    Propagation(#[from] PropagationError),
}
