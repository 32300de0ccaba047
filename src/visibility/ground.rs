use crate::frames::GroundStation;
use crate::orbit::Propagator;
use crate::visibility::predicate::Predicate;
use crate::visibility::types::{FovPolicy, GroundVisibility};

/// Elevation mask combined with the station's sensor cone according to `params.fov_policy`.
pub fn ground_visibility<'a>(
    orbit: &'a dyn Propagator,
    station: &'a GroundStation,
    params: &GroundVisibility,
) -> Predicate<'a> {
    let elevation = Predicate::Elevation {
        orbit,
        station,
        min_elevation_rad: params.min_elevation_deg.to_radians(),
    };
    if !params.fov_enabled() {
        return elevation;
    }

    let fov = Predicate::FieldOfView {
        orbit,
        station,
        half_angle_rad: params.fov_half_angle_deg.to_radians(),
    };
    match params.fov_policy {
        FovPolicy::Exclusion => elevation.and(!fov),
        FovPolicy::Coverage => elevation.and(fov),
    }
}
