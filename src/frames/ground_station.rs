use serde::Serialize;

use crate::frames::transform::{ecef_to_enu, geodetic_to_ecef, GeodeticPoint};
use crate::orbit::sub;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroundStation {
    pub id: String,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
}

impl GroundStation {
    pub fn new(
        id: impl Into<String>,
        latitude_deg: f64,
        longitude_deg: f64,
        altitude_m: f64,
    ) -> Self {
        Self {
            id: id.into(),
            latitude_deg,
            longitude_deg,
            altitude_m,
        }
    }

    pub fn lat_rad(&self) -> f64 {
        self.latitude_deg.to_radians()
    }

    pub fn lon_rad(&self) -> f64 {
        self.longitude_deg.to_radians()
    }

    pub fn geodetic(&self) -> GeodeticPoint {
        GeodeticPoint {
            latitude_rad: self.lat_rad(),
            longitude_rad: self.lon_rad(),
            altitude_m: self.altitude_m,
        }
    }

    pub fn position_ecef_m(&self) -> [f64; 3] {
        geodetic_to_ecef(&self.geodetic())
    }

    /// Unit normal to the ellipsoid at the station (local up).
    pub fn up_vector(&self) -> [f64; 3] {
        let (sin_lat, cos_lat) = self.lat_rad().sin_cos();
        let (sin_lon, cos_lon) = self.lon_rad().sin_cos();
        [cos_lat * cos_lon, cos_lat * sin_lon, sin_lat]
    }

    /// East/north/up components of the line of sight to an earth-fixed target.
    pub fn look_enu(&self, target_ecef_m: [f64; 3]) -> (f64, f64, f64) {
        let dr = sub(target_ecef_m, self.position_ecef_m());
        ecef_to_enu(dr, self.lat_rad(), self.lon_rad())
    }

    /// Elevation of an earth-fixed target above the local horizontal plane.
    pub fn elevation_rad(&self, target_ecef_m: [f64; 3]) -> f64 {
        let (e, n, u) = self.look_enu(target_ecef_m);
        let range = (e * e + n * n + u * u).sqrt();
        if range > 0.0 {
            (u / range).clamp(-1.0, 1.0).asin()
        } else {
            std::f64::consts::FRAC_PI_2
        }
    }
}
