use crate::frames::{WGS84_A_M, WGS84_B_M};
use crate::orbit::{dot, norm, Propagator};
use crate::visibility::predicate::Predicate;
use crate::visibility::types::InterSatelliteVisibility;

/// Line of sight within range: `AND(line_of_sight, max_range)`.
pub fn inter_satellite_visibility<'a>(
    primary: &'a dyn Propagator,
    secondary: &'a dyn Propagator,
    params: &InterSatelliteVisibility,
) -> Predicate<'a> {
    Predicate::LineOfSight { primary, secondary }.and(Predicate::MaxRange {
        primary,
        secondary,
        max_distance_m: params.max_range_m,
    })
}

/// Whether the closed segment `p1..p2` (earth-fixed, metres) touches the
/// interior of the WGS84 ellipsoid. The z axis is stretched by `a/b` so the
/// ellipsoid becomes a sphere of radius `a`.
pub fn segment_intersects_ellipsoid(p1: [f64; 3], p2: [f64; 3]) -> bool {
    let stretch = WGS84_A_M / WGS84_B_M;
    let a = [p1[0], p1[1], p1[2] * stretch];
    let b = [p2[0], p2[1], p2[2] * stretch];
    let d = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];

    let len2 = dot(d, d);
    let s = if len2 > 0.0 {
        (-dot(a, d) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let closest = [a[0] + s * d[0], a[1] + s * d[1], a[2] + s * d[2]];
    norm(closest) < WGS84_A_M
}
