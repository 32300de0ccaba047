mod ground_station;
mod transform;

pub use ground_station::GroundStation;
pub use transform::{
    ecef_to_enu, geodetic_to_ecef, gmst_rad, to_earth_fixed, to_geodetic, GeodeticPoint,
};

/// WGS84 semi-major axis (m).
pub const WGS84_A_M: f64 = 6_378_137.0;
/// WGS84 flattening.
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// WGS84 semi-minor axis (m).
pub const WGS84_B_M: f64 = WGS84_A_M * (1.0 - WGS84_F);
/// WGS84 first eccentricity squared.
pub const WGS84_E2: f64 = WGS84_F * (2.0 - WGS84_F);

pub const EARTH_ROTATION_RAD_S: f64 = 7.292_115e-5;
