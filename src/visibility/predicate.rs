//! Signed visibility conditions ("g-functions").
//!
//! A predicate holds at `t` when `g(t) >= 0`. Composition never rescales:
//! `and` is the minimum of both sides and `!` flips the sign, so a zero of a
//! composite is always a zero of exactly one of its leaves.

use std::ops::Not;

use chrono::{DateTime, Utc};

use crate::frames::{to_earth_fixed, GroundStation};
use crate::orbit::{distance, dot, norm, sub, PropagationError, Propagator};
use crate::visibility::inter_satellite::segment_intersects_ellipsoid;

/// Separations below this are treated as a single point with a clear line of sight.
pub const COINCIDENT_DISTANCE_M: f64 = 1e-6;

pub type GFn<'a> = dyn Fn(DateTime<Utc>) -> Result<f64, PropagationError> + Send + Sync + 'a;

pub enum Predicate<'a> {
    /// Elevation above the station's horizon minus the mask.
    Elevation {
        orbit: &'a dyn Propagator,
        station: &'a GroundStation,
        min_elevation_rad: f64,
    },
    /// Holds while the satellite is inside the cone of `half_angle_rad`
    /// around the station's local up vector: `cos(angle) - cos(half_angle)`.
    FieldOfView {
        orbit: &'a dyn Propagator,
        station: &'a GroundStation,
        half_angle_rad: f64,
    },
    /// +1 while the segment between both satellites clears the ellipsoid, -1 otherwise.
    LineOfSight {
        primary: &'a dyn Propagator,
        secondary: &'a dyn Propagator,
    },
    /// Maximum separation minus the current separation.
    MaxRange {
        primary: &'a dyn Propagator,
        secondary: &'a dyn Propagator,
        max_distance_m: f64,
    },
    Function(Box<GFn<'a>>),
    And(Box<Predicate<'a>>, Box<Predicate<'a>>),
    Not(Box<Predicate<'a>>),
}

impl<'a> Predicate<'a> {
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(DateTime<Utc>) -> Result<f64, PropagationError> + Send + Sync + 'a,
    {
        Predicate::Function(Box::new(f))
    }

    pub fn and(self, other: Predicate<'a>) -> Self {
        Predicate::And(Box::new(self), Box::new(other))
    }

    pub fn g(&self, t: DateTime<Utc>) -> Result<f64, PropagationError> {
        match self {
            Predicate::Elevation {
                orbit,
                station,
                min_elevation_rad,
            } => {
                let state = to_earth_fixed(&orbit.state_at(t)?);
                Ok(station.elevation_rad(state.position_m) - min_elevation_rad)
            }
            Predicate::FieldOfView {
                orbit,
                station,
                half_angle_rad,
            } => {
                let state = to_earth_fixed(&orbit.state_at(t)?);
                let los = sub(state.position_m, station.position_ecef_m());
                let range = norm(los);
                let cos_angle = if range > 0.0 {
                    dot(station.up_vector(), los) / range
                } else {
                    1.0
                };
                Ok(cos_angle - half_angle_rad.cos())
            }
            Predicate::LineOfSight { primary, secondary } => {
                let p1 = to_earth_fixed(&primary.state_at(t)?).position_m;
                let p2 = to_earth_fixed(&secondary.state_at(t)?).position_m;
                if distance(p1, p2) < COINCIDENT_DISTANCE_M {
                    return Ok(1.0);
                }
                Ok(if segment_intersects_ellipsoid(p1, p2) {
                    -1.0
                } else {
                    1.0
                })
            }
            Predicate::MaxRange {
                primary,
                secondary,
                max_distance_m,
            } => {
                let p1 = primary.state_at(t)?.position_m;
                let p2 = secondary.state_at(t)?.position_m;
                Ok(max_distance_m - distance(p1, p2))
            }
            Predicate::Function(f) => f(t),
            Predicate::And(lhs, rhs) => Ok(lhs.g(t)?.min(rhs.g(t)?)),
            Predicate::Not(inner) => Ok(-inner.g(t)?),
        }
    }

    pub fn holds(&self, t: DateTime<Utc>) -> Result<bool, PropagationError> {
        Ok(self.g(t)? >= 0.0)
    }
}

impl<'a> Not for Predicate<'a> {
    type Output = Predicate<'a>;

    fn not(self) -> Self::Output {
        Predicate::Not(Box::new(self))
    }
}
