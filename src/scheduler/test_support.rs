use chrono::{DateTime, TimeZone, Utc};

use crate::orbit::{KeplerianElements, KeplerianOrbit};
use crate::scheduler::types::Satellite;

pub(crate) fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
}

pub(crate) fn circular(
    index: usize,
    radius_m: f64,
    inclination_deg: f64,
    raan_deg: f64,
    true_anomaly_deg: f64,
) -> Satellite {
    let orbit = KeplerianOrbit::new(KeplerianElements {
        semi_major_axis_m: radius_m,
        eccentricity: 0.0,
        inclination_deg,
        raan_deg,
        arg_perigee_deg: 0.0,
        true_anomaly_deg,
        epoch: t0(),
    })
    .unwrap();
    Satellite::keplerian(index, format!("sat-{index}"), orbit)
}
