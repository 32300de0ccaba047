//! Inertial to earth-fixed rotation and WGS84 geodetic conversions.
//!
//! The earth-fixed frame is obtained from the inertial frame by a single
//! rotation about z through the Greenwich mean sidereal angle; precession,
//! nutation and polar motion are not modelled. Geodetic latitude is solved
//! by fixed-point iteration until the update drops below
//! [`GEODETIC_TOLERANCE_RAD`], which keeps geodetic/ECEF round trips well
//! inside 1e-9 rad.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::frames::{EARTH_ROTATION_RAD_S, WGS84_A_M, WGS84_B_M, WGS84_E2};
use crate::orbit::{Frame, StateVector};

pub const GEODETIC_TOLERANCE_RAD: f64 = 1e-12;
const GEODETIC_MAX_ITERATIONS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeodeticPoint {
    pub latitude_rad: f64,
    pub longitude_rad: f64,
    pub altitude_m: f64,
}

impl GeodeticPoint {
    pub fn latitude_deg(&self) -> f64 {
        self.latitude_rad.to_degrees()
    }

    pub fn longitude_deg(&self) -> f64 {
        self.longitude_rad.to_degrees()
    }
}

pub fn gmst_rad(t: DateTime<Utc>) -> f64 {
    sgp4::iau_epoch_to_sidereal_time(sgp4::julian_years_since_j2000(&t.naive_utc()))
}

/// Expresses `state` in the earth-fixed frame at its own epoch.
pub fn to_earth_fixed(state: &StateVector) -> StateVector {
    if state.frame == Frame::EarthFixed {
        return *state;
    }
    let gmst = gmst_rad(state.epoch);
    let position_m = rotate_z(state.position_m, gmst);
    let rotated = rotate_z(state.velocity_m_s, gmst);
    let velocity_m_s = [
        rotated[0] + EARTH_ROTATION_RAD_S * position_m[1],
        rotated[1] - EARTH_ROTATION_RAD_S * position_m[0],
        rotated[2],
    ];

    StateVector {
        frame: Frame::EarthFixed,
        epoch: state.epoch,
        position_m,
        velocity_m_s,
    }
}

fn rotate_z(v: [f64; 3], angle: f64) -> [f64; 3] {
    let (sin_a, cos_a) = angle.sin_cos();
    [
        v[0] * cos_a + v[1] * sin_a,
        -v[0] * sin_a + v[1] * cos_a,
        v[2],
    ]
}

pub fn to_geodetic(position_m: [f64; 3]) -> GeodeticPoint {
    let [x, y, z] = position_m;
    let p = x.hypot(y);
    let longitude_rad = y.atan2(x);

    if p < 1e-9 {
        let latitude_rad = if z >= 0.0 {
            std::f64::consts::FRAC_PI_2
        } else {
            -std::f64::consts::FRAC_PI_2
        };
        return GeodeticPoint {
            latitude_rad,
            longitude_rad: 0.0,
            altitude_m: z.abs() - WGS84_B_M,
        };
    }

    let mut lat = z.atan2(p * (1.0 - WGS84_E2));
    for _ in 0..GEODETIC_MAX_ITERATIONS {
        let sin_lat = lat.sin();
        let n = WGS84_A_M / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
        let next = (z + WGS84_E2 * n * sin_lat).atan2(p);
        let delta = (next - lat).abs();
        lat = next;
        if delta < GEODETIC_TOLERANCE_RAD {
            break;
        }
    }

    let (sin_lat, cos_lat) = lat.sin_cos();
    let altitude_m =
        p * cos_lat + z * sin_lat - WGS84_A_M * (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();

    GeodeticPoint {
        latitude_rad: lat,
        longitude_rad,
        altitude_m,
    }
}

pub fn geodetic_to_ecef(point: &GeodeticPoint) -> [f64; 3] {
    let (sin_lat, cos_lat) = point.latitude_rad.sin_cos();
    let (sin_lon, cos_lon) = point.longitude_rad.sin_cos();
    let n = WGS84_A_M / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
    let h = point.altitude_m;
    [
        (n + h) * cos_lat * cos_lon,
        (n + h) * cos_lat * sin_lon,
        (n * (1.0 - WGS84_E2) + h) * sin_lat,
    ]
}

pub fn ecef_to_enu(dr: [f64; 3], lat_rad: f64, lon_rad: f64) -> (f64, f64, f64) {
    let sin_lat = lat_rad.sin();
    let cos_lat = lat_rad.cos();
    let sin_lon = lon_rad.sin();
    let cos_lon = lon_rad.cos();

    let east = -sin_lon * dr[0] + cos_lon * dr[1];
    let north = -sin_lat * cos_lon * dr[0] - sin_lat * sin_lon * dr[1] + cos_lat * dr[2];
    let up = cos_lat * cos_lon * dr[0] + cos_lat * sin_lon * dr[1] + sin_lat * dr[2];
    (east, north, up)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orbit::norm;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn state(position_m: [f64; 3], velocity_m_s: [f64; 3]) -> StateVector {
        StateVector {
            frame: Frame::Inertial,
            epoch: Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap(),
            position_m,
            velocity_m_s,
        }
    }

    #[test]
    fn rotation_preserves_radius_and_z() {
        let s = state([7.0e6, -1.2e6, 3.0e5], [100.0, 7500.0, 10.0]);
        let fixed = to_earth_fixed(&s);
        assert_eq!(fixed.frame, Frame::EarthFixed);
        assert_relative_eq!(norm(fixed.position_m), norm(s.position_m), max_relative = 1e-14);
        assert_eq!(fixed.position_m[2], s.position_m[2]);
    }

    #[test]
    fn rotation_angle_matches_gmst() {
        let s = state([7.0e6, 0.0, 0.0], [0.0, 0.0, 0.0]);
        let fixed = to_earth_fixed(&s);
        let gmst = gmst_rad(s.epoch);
        let angle = (-fixed.position_m[1]).atan2(fixed.position_m[0]);
        let tau = std::f64::consts::TAU;
        assert_abs_diff_eq!(angle.rem_euclid(tau), gmst.rem_euclid(tau), epsilon = 1e-12);
    }

    #[test]
    fn geostationary_state_is_fixed_on_the_ground() {
        // an equatorial orbit co-rotating with the earth has zero earth-fixed velocity
        let r = 42_164_000.0;
        let s = state([r, 0.0, 0.0], [0.0, EARTH_ROTATION_RAD_S * r, 0.0]);
        let fixed = to_earth_fixed(&s);
        assert!(norm(fixed.velocity_m_s) < 1e-6);
    }

    #[test]
    fn earth_fixed_input_is_returned_unchanged() {
        let mut s = state([7.0e6, 1.0, 2.0], [3.0, 4.0, 5.0]);
        s.frame = Frame::EarthFixed;
        assert_eq!(to_earth_fixed(&s), s);
    }

    #[test]
    fn equator_and_poles() {
        let equator = to_geodetic([WGS84_A_M + 1000.0, 0.0, 0.0]);
        assert_abs_diff_eq!(equator.latitude_rad, 0.0, epsilon = 1e-15);
        assert_abs_diff_eq!(equator.altitude_m, 1000.0, epsilon = 1e-6);

        let north = to_geodetic([0.0, 0.0, WGS84_B_M + 500.0]);
        assert_abs_diff_eq!(north.latitude_rad, std::f64::consts::FRAC_PI_2);
        assert_abs_diff_eq!(north.altitude_m, 500.0, epsilon = 1e-6);

        let south = to_geodetic([0.0, 0.0, -WGS84_B_M]);
        assert_abs_diff_eq!(south.latitude_rad, -std::f64::consts::FRAC_PI_2);
        assert_abs_diff_eq!(south.altitude_m, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn enu_of_zenith_offset_is_pure_up() {
        let point = GeodeticPoint {
            latitude_rad: 0.7,
            longitude_rad: -1.9,
            altitude_m: 0.0,
        };
        let base = geodetic_to_ecef(&point);
        let raised = geodetic_to_ecef(&GeodeticPoint {
            altitude_m: 1000.0,
            ..point
        });
        let dr = [raised[0] - base[0], raised[1] - base[1], raised[2] - base[2]];
        let (e, n, u) = ecef_to_enu(dr, point.latitude_rad, point.longitude_rad);
        assert_abs_diff_eq!(e, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(n, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(u, 1000.0, epsilon = 1e-9);
    }

    proptest! {
        #[test]
        fn geodetic_round_trip(
            lat in -89.9_f64..89.9,
            lon in -179.9_f64..179.9,
            alt in -1_000.0_f64..40_000_000.0,
        ) {
            let point = GeodeticPoint {
                latitude_rad: lat.to_radians(),
                longitude_rad: lon.to_radians(),
                altitude_m: alt,
            };
            let back = to_geodetic(geodetic_to_ecef(&point));
            prop_assert!((back.latitude_rad - point.latitude_rad).abs() < 1e-9);
            prop_assert!((back.longitude_rad - point.longitude_rad).abs() < 1e-9);
            prop_assert!((back.altitude_m - point.altitude_m).abs() < 1e-6);
        }
    }
}
