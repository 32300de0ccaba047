mod ground;
mod inter_satellite;
mod predicate;
mod types;

pub use ground::ground_visibility;
pub use inter_satellite::{inter_satellite_visibility, segment_intersects_ellipsoid};
pub use predicate::{GFn, Predicate, COINCIDENT_DISTANCE_M};
pub use types::{FovPolicy, GroundVisibility, InterSatelliteVisibility};
