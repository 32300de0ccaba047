mod elements;
mod ephemeris;
mod error;
mod propagation;
mod types;

pub use elements::KeplerianElements;
pub use ephemeris::Ephemeris;
pub use error::{ConfigurationError, EphemerisError, PropagationError};
pub use propagation::{solve_kepler, KeplerianOrbit, Propagator};
pub use types::{distance, dot, norm, sub, Frame, StateVector};

/// WGS84 earth gravitational parameter (m³/s²).
pub const MU_EARTH_M3_S2: f64 = 3.986_004_418e14;
