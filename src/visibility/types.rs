use serde::{Deserialize, Serialize};

/// How the ground sensor cone combines with the elevation mask.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FovPolicy {
    /// Visible only outside the cone around local up.
    #[default]
    Exclusion,
    /// Visible only inside the cone around local up.
    Coverage,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroundVisibility {
    pub min_elevation_deg: f64,
    /// Values of 90 or more disable the cone.
    pub fov_half_angle_deg: f64,
    pub fov_policy: FovPolicy,
}

impl Default for GroundVisibility {
    fn default() -> Self {
        Self {
            min_elevation_deg: 0.0,
            fov_half_angle_deg: 45.0,
            fov_policy: FovPolicy::Exclusion,
        }
    }
}

impl GroundVisibility {
    pub fn fov_enabled(&self) -> bool {
        self.fov_half_angle_deg < 90.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterSatelliteVisibility {
    pub max_range_m: f64,
}

impl Default for InterSatelliteVisibility {
    fn default() -> Self {
        Self {
            max_range_m: 5_000_000.0,
        }
    }
}
