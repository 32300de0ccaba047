//! Geodetic position and ground-track rates of every satellite at one instant.

use std::f64::consts::{PI, TAU};

use chrono::{DateTime, Utc};
use log::warn;
use serde::Serialize;

use crate::frames::{to_earth_fixed, to_geodetic, GeodeticPoint};
use crate::orbit::PropagationError;
use crate::scheduler::Satellite;
use crate::time::shifted_by;

/// Finite-difference step for the rates.
const RATE_STEP_S: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SatelliteSnapshot {
    pub sat_index: usize,
    pub name: String,
    pub time: DateTime<Utc>,
    pub position: GeodeticPoint,
    pub latitude_rate_deg_s: f64,
    pub longitude_rate_deg_s: f64,
    pub altitude_rate_m_s: f64,
}

pub fn snapshot(
    satellite: &Satellite,
    t: DateTime<Utc>,
) -> Result<SatelliteSnapshot, PropagationError> {
    let position = geodetic_at(satellite, t)?;

    // Bounded ephemerides cannot look past their end; difference backwards there.
    let (next, dt) = match geodetic_at(satellite, shifted_by(t, RATE_STEP_S)) {
        Ok(next) => (next, RATE_STEP_S),
        Err(PropagationError::OutsideEphemeris { .. }) => {
            (geodetic_at(satellite, shifted_by(t, -RATE_STEP_S))?, -RATE_STEP_S)
        }
        Err(err) => return Err(err),
    };

    Ok(SatelliteSnapshot {
        sat_index: satellite.index,
        name: satellite.name.clone(),
        time: t,
        position,
        latitude_rate_deg_s: (next.latitude_rad - position.latitude_rad).to_degrees() / dt,
        longitude_rate_deg_s: wrap_pi(next.longitude_rad - position.longitude_rad).to_degrees()
            / dt,
        altitude_rate_m_s: (next.altitude_m - position.altitude_m) / dt,
    })
}

/// Snapshots every satellite; failures are logged and skipped.
pub fn snapshot_all(satellites: &[Satellite], t: DateTime<Utc>) -> Vec<SatelliteSnapshot> {
    satellites
        .iter()
        .filter_map(|satellite| match snapshot(satellite, t) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                warn!(
                    "No state for satellite #{} ({}) at {}: {}",
                    satellite.index, satellite.name, t, err
                );
                None
            }
        })
        .collect()
}

fn geodetic_at(
    satellite: &Satellite,
    t: DateTime<Utc>,
) -> Result<GeodeticPoint, PropagationError> {
    let state = to_earth_fixed(&satellite.orbit.state_at(t)?);
    Ok(to_geodetic(state.position_m))
}

/// Wraps an angle difference into (-pi, pi].
fn wrap_pi(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped == -PI {
        PI
    } else {
        wrapped
    }
}
