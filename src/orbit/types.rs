use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
pub enum Frame {
    /// Mean-equator inertial frame the Keplerian elements are expressed in.
    Inertial,
    /// Earth-centred, earth-fixed frame.
    EarthFixed,
}

/// Position and velocity valid at `epoch`, expressed in `frame`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StateVector {
    pub frame: Frame,
    pub epoch: DateTime<Utc>,
    pub position_m: [f64; 3],
    pub velocity_m_s: [f64; 3],
}

impl StateVector {
    pub fn radius_m(&self) -> f64 {
        norm(self.position_m)
    }

    pub fn speed_m_s(&self) -> f64 {
        norm(self.velocity_m_s)
    }
}

pub fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub fn norm(a: [f64; 3]) -> f64 {
    dot(a, a).sqrt()
}

pub fn distance(a: [f64; 3], b: [f64; 3]) -> f64 {
    norm(sub(a, b))
}
