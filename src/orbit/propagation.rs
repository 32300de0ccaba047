use std::f64::consts::TAU;

use chrono::{DateTime, Utc};

use crate::orbit::elements::KeplerianElements;
use crate::orbit::error::PropagationError;
use crate::orbit::types::{Frame, StateVector};
use crate::orbit::MU_EARTH_M3_S2;
use crate::time::seconds_between;

const KEPLER_TOLERANCE_RAD: f64 = 1e-12;
const KEPLER_MAX_ITERATIONS: usize = 50;

/// Anything that can produce an inertial state at an absolute time.
///
/// Implementations must be pure functions of `t` so they can be shared
/// read-only between worker threads.
pub trait Propagator: Send + Sync {
    fn state_at(&self, t: DateTime<Utc>) -> Result<StateVector, PropagationError>;
}

/// Unperturbed two-body orbit. Angles are stored in radians.
#[derive(Debug, Clone)]
pub struct KeplerianOrbit {
    elements: KeplerianElements,
    inclination: f64,
    raan: f64,
    arg_perigee: f64,
    mean_anomaly_at_epoch: f64,
    mean_motion: f64,
}

impl KeplerianOrbit {
    /// Builds the orbit from already-validated elements.
    pub fn new(elements: KeplerianElements) -> Result<Self, PropagationError> {
        let e = elements.eccentricity;
        if !(0.0..1.0).contains(&e) {
            return Err(PropagationError::UnsupportedEccentricity(e));
        }
        let nu0 = elements.true_anomaly_deg.to_radians();
        let mean_anomaly_at_epoch = true_to_mean_anomaly(nu0, e);
        let a = elements.semi_major_axis_m;

        Ok(Self {
            elements,
            inclination: elements.inclination_deg.to_radians(),
            raan: elements.raan_deg.to_radians(),
            arg_perigee: elements.arg_perigee_deg.to_radians(),
            mean_anomaly_at_epoch,
            mean_motion: (MU_EARTH_M3_S2 / (a * a * a)).sqrt(),
        })
    }

    pub fn period_s(&self) -> f64 {
        TAU / self.mean_motion
    }

    fn perifocal_to_inertial(&self, v: [f64; 3]) -> [f64; 3] {
        let (sin_o, cos_o) = self.raan.sin_cos();
        let (sin_w, cos_w) = self.arg_perigee.sin_cos();
        let (sin_i, cos_i) = self.inclination.sin_cos();

        let rot = [
            [
                cos_o * cos_w - sin_o * sin_w * cos_i,
                -cos_o * sin_w - sin_o * cos_w * cos_i,
                sin_o * sin_i,
            ],
            [
                sin_o * cos_w + cos_o * sin_w * cos_i,
                -sin_o * sin_w + cos_o * cos_w * cos_i,
                -cos_o * sin_i,
            ],
            [sin_w * sin_i, cos_w * sin_i, cos_i],
        ];

        let mut out = [0.0; 3];
        for (row, value) in rot.iter().zip(out.iter_mut()) {
            *value = row[0] * v[0] + row[1] * v[1] + row[2] * v[2];
        }
        out
    }
}

impl Propagator for KeplerianOrbit {
    fn state_at(&self, t: DateTime<Utc>) -> Result<StateVector, PropagationError> {
        let e = self.elements.eccentricity;
        let a = self.elements.semi_major_axis_m;
        let dt = seconds_between(self.elements.epoch, t);

        let mean_anomaly = (self.mean_anomaly_at_epoch + self.mean_motion * dt).rem_euclid(TAU);
        let ecc_anomaly = solve_kepler(mean_anomaly, e, t)?;
        let nu = eccentric_to_true_anomaly(ecc_anomaly, e);

        let p = a * (1.0 - e * e);
        let (sin_nu, cos_nu) = nu.sin_cos();
        let r = p / (1.0 + e * cos_nu);
        let v_factor = (MU_EARTH_M3_S2 / p).sqrt();

        let r_pqw = [r * cos_nu, r * sin_nu, 0.0];
        let v_pqw = [-v_factor * sin_nu, v_factor * (e + cos_nu), 0.0];

        Ok(StateVector {
            frame: Frame::Inertial,
            epoch: t,
            position_m: self.perifocal_to_inertial(r_pqw),
            velocity_m_s: self.perifocal_to_inertial(v_pqw),
        })
    }
}

/// Solves M = E - e sin(E) for E by Newton-Raphson. `at` is the instant
/// being propagated and is reported if the iteration fails.
pub fn solve_kepler(
    mean_anomaly: f64,
    e: f64,
    at: DateTime<Utc>,
) -> Result<f64, PropagationError> {
    if !(0.0..1.0).contains(&e) {
        return Err(PropagationError::UnsupportedEccentricity(e));
    }

    let mut ea = if e < 0.8 {
        mean_anomaly
    } else {
        std::f64::consts::PI
    };

    for _ in 0..KEPLER_MAX_ITERATIONS {
        let f = ea - e * ea.sin() - mean_anomaly;
        let fp = 1.0 - e * ea.cos();
        let delta = f / fp;
        ea -= delta;
        if delta.abs() < KEPLER_TOLERANCE_RAD {
            return Ok(ea);
        }
    }

    Err(PropagationError::KeplerDidNotConverge {
        time: at,
        mean_anomaly,
        eccentricity: e,
        iterations: KEPLER_MAX_ITERATIONS,
    })
}

fn eccentric_to_true_anomaly(ea: f64, e: f64) -> f64 {
    2.0 * ((1.0 + e).sqrt() * (ea / 2.0).sin()).atan2((1.0 - e).sqrt() * (ea / 2.0).cos())
}

fn true_to_mean_anomaly(nu: f64, e: f64) -> f64 {
    let ea = 2.0 * ((1.0 - e).sqrt() * (nu / 2.0).sin()).atan2((1.0 + e).sqrt() * (nu / 2.0).cos());
    (ea - e * ea.sin()).rem_euclid(TAU)
}
