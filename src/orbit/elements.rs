use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::frames::WGS84_A_M;
use crate::orbit::error::ConfigurationError;

/// Osculating two-body elements at `epoch`. Angles are in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeplerianElements {
    pub semi_major_axis_m: f64,
    pub eccentricity: f64,
    pub inclination_deg: f64,
    pub raan_deg: f64,
    pub arg_perigee_deg: f64,
    pub true_anomaly_deg: f64,
    pub epoch: DateTime<Utc>,
}

impl KeplerianElements {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let fields = [
            ("semi_major_axis_m", self.semi_major_axis_m),
            ("eccentricity", self.eccentricity),
            ("inclination_deg", self.inclination_deg),
            ("raan_deg", self.raan_deg),
            ("arg_perigee_deg", self.arg_perigee_deg),
            ("true_anomaly_deg", self.true_anomaly_deg),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(invalid(field, value, "must be finite"));
            }
        }

        if self.semi_major_axis_m <= WGS84_A_M {
            return Err(invalid(
                "semi_major_axis_m",
                self.semi_major_axis_m,
                "must exceed the earth's equatorial radius",
            ));
        }
        if !(0.0..1.0).contains(&self.eccentricity) {
            return Err(invalid(
                "eccentricity",
                self.eccentricity,
                "bound orbits require 0 <= e < 1",
            ));
        }
        if !(0.0..=180.0).contains(&self.inclination_deg) {
            return Err(invalid(
                "inclination_deg",
                self.inclination_deg,
                "must lie in [0, 180]",
            ));
        }
        if !(-180.0..=360.0).contains(&self.raan_deg) {
            return Err(invalid("raan_deg", self.raan_deg, "must lie in [-180, 360]"));
        }
        Ok(())
    }

    pub fn perigee_radius_m(&self) -> f64 {
        self.semi_major_axis_m * (1.0 - self.eccentricity)
    }
}

fn invalid(field: &'static str, value: f64, reason: &'static str) -> ConfigurationError {
    ConfigurationError::InvalidElement {
        field,
        value,
        reason,
    }
}
