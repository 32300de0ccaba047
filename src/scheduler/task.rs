use log::debug;

use crate::events::{assemble_windows, DetectorSettings, EventDetector, VisibilityWindow};
use crate::frames::GroundStation;
use crate::orbit::PropagationError;
use crate::scheduler::types::{Satellite, SimulationContext};
use crate::visibility::{ground_visibility, inter_satellite_visibility, Predicate};

/// One independent unit of work. Indices are positions in the slices handed
/// to [`PairVisibilityTask::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairVisibilityTask {
    Ground { satellite: usize, station: usize },
    /// Always `primary < secondary`.
    InterSatellite { primary: usize, secondary: usize },
}

impl PairVisibilityTask {
    /// Every satellite/station pair, then every satellite pair `i < j`.
    pub fn enumerate(satellite_count: usize, station_count: usize) -> Vec<Self> {
        let ground = (0..satellite_count).flat_map(|satellite| {
            (0..station_count).map(move |station| Self::Ground { satellite, station })
        });
        let inter = (0..satellite_count).flat_map(|primary| {
            (primary + 1..satellite_count).map(move |secondary| Self::InterSatellite {
                primary,
                secondary,
            })
        });
        ground.chain(inter).collect()
    }

    /// The satellite whose result this pair is filed under.
    pub fn owner(&self) -> usize {
        match *self {
            Self::Ground { satellite, .. } => satellite,
            Self::InterSatellite { primary, .. } => primary,
        }
    }

    pub fn describe(&self, satellites: &[Satellite], stations: &[GroundStation]) -> String {
        match *self {
            Self::Ground { satellite, station } => format!(
                "satellite #{} ({}) / ground station {}",
                satellites[satellite].index, satellites[satellite].name, stations[station].id
            ),
            Self::InterSatellite { primary, secondary } => format!(
                "satellite #{} ({}) / satellite #{} ({})",
                satellites[primary].index,
                satellites[primary].name,
                satellites[secondary].index,
                satellites[secondary].name
            ),
        }
    }

    /// The composite predicate whose windows this pair reports.
    pub fn predicate<'a>(
        &self,
        satellites: &'a [Satellite],
        stations: &'a [GroundStation],
        ctx: &'a SimulationContext,
    ) -> Predicate<'a> {
        match *self {
            Self::Ground { satellite, station } => ground_visibility(
                satellites[satellite].orbit.as_ref(),
                &stations[station],
                &ctx.ground,
            ),
            Self::InterSatellite { primary, secondary } => inter_satellite_visibility(
                satellites[primary].orbit.as_ref(),
                satellites[secondary].orbit.as_ref(),
                &ctx.inter_satellite,
            ),
        }
    }

    pub fn detector_settings(&self, ctx: &SimulationContext) -> DetectorSettings {
        match self {
            Self::Ground { .. } => ctx.ground_detector,
            Self::InterSatellite { .. } => ctx.inter_satellite_detector,
        }
    }

    pub fn run(
        &self,
        satellites: &[Satellite],
        stations: &[GroundStation],
        ctx: &SimulationContext,
    ) -> Result<Vec<VisibilityWindow>, PropagationError> {
        let predicate = self.predicate(satellites, stations, ctx);
        let detection = EventDetector::new(self.detector_settings(ctx)).detect(
            &predicate,
            ctx.start,
            ctx.end,
        )?;

        let windows = assemble_windows(&detection, ctx.start, ctx.end, ctx.discard_tolerance_s);
        debug!(
            "{}: {} crossing(s), {} window(s)",
            self.describe(satellites, stations),
            detection.events.len(),
            windows.len()
        );
        Ok(windows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::gmst_rad;
    use crate::orbit::MU_EARTH_M3_S2;
    use crate::scheduler::test_support::{circular, t0};
    use crate::time::{seconds_between, shifted_by};
    use crate::visibility::FovPolicy;
    use approx::assert_abs_diff_eq;
    use chrono::{DateTime, Utc};

    fn hour() -> SimulationContext {
        SimulationContext::new(t0(), shifted_by(t0(), 3600.0))
    }

    fn total(windows: &[VisibilityWindow]) -> f64 {
        windows.iter().map(|w| w.duration_s).sum()
    }

    #[test]
    fn enumerates_cross_product_and_upper_triangle() {
        let tasks = PairVisibilityTask::enumerate(3, 2);
        assert_eq!(tasks.len(), 3 * 2 + 3);
        let inter: Vec<_> = tasks
            .iter()
            .filter_map(|t| match *t {
                PairVisibilityTask::InterSatellite { primary, secondary } => {
                    Some((primary, secondary))
                }
                _ => None,
            })
            .collect();
        assert_eq!(inter, [(0, 1), (0, 2), (1, 2)]);
        assert!(tasks.iter().all(|t| t.owner() < 3));
    }

    #[test]
    fn coplanar_neighbours_stay_visible_for_the_whole_run() {
        let sats = [
            circular(0, 7_000_000.0, 0.0, 0.0, 0.0),
            circular(1, 7_000_000.0, 0.0, 0.0, 10.0),
        ];
        let ctx = hour();
        let task = PairVisibilityTask::InterSatellite {
            primary: 0,
            secondary: 1,
        };
        let windows = task.run(&sats, &[], &ctx).unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].start, ctx.start);
        assert!(windows[0].is_open());
        assert_abs_diff_eq!(windows[0].duration_s, 3600.0, epsilon = 1e-9);
    }

    #[test]
    fn coplanar_satellites_behind_the_earth_never_see_each_other() {
        let sats = [
            circular(0, 7_000_000.0, 0.0, 0.0, 0.0),
            circular(1, 7_000_000.0, 0.0, 0.0, 60.0),
        ];
        let task = PairVisibilityTask::InterSatellite {
            primary: 0,
            secondary: 1,
        };
        assert!(task.run(&sats, &[], &hour()).unwrap().is_empty());
    }

    #[test]
    fn inter_satellite_windows_do_not_depend_on_which_satellite_drives() {
        // Equatorial and polar orbits sharing a node: line of sight comes and goes.
        let forward = [
            circular(0, 7_000_000.0, 0.0, 0.0, 0.0),
            circular(1, 7_000_000.0, 90.0, 0.0, 0.0),
        ];
        let reversed = [forward[1].clone(), forward[0].clone()];
        let ctx = hour();
        let task = PairVisibilityTask::InterSatellite {
            primary: 0,
            secondary: 1,
        };
        let a = task.run(&forward, &[], &ctx).unwrap();
        let b = task.run(&reversed, &[], &ctx).unwrap();

        assert!(a.len() >= 2, "{a:?}");
        assert_eq!(a.len(), b.len());
        assert_abs_diff_eq!(total(&a), total(&b), epsilon = 1e-5);
        for (x, y) in a.iter().zip(&b) {
            assert_abs_diff_eq!(seconds_between(x.start, y.start), 0.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn range_windows_match_closed_form_separation() {
        // Equal circular orbits through a common node, 45 degrees apart in
        // inclination: separation 2 r sin(phi / 2), cos(phi) = cos²u + sin²u cos(i).
        let r = 7_000_000.0;
        let inclination = 45f64.to_radians();
        let max_range = 5_000_000.0;
        let sats = [circular(0, r, 0.0, 0.0, 0.0), circular(1, r, 45.0, 0.0, 0.0)];
        let mut ctx = hour();
        ctx.inter_satellite.max_range_m = max_range;

        let n = (MU_EARTH_M3_S2 / r.powi(3)).sqrt();
        let half = max_range / (2.0 * r);
        let sin2_u = 2.0 * half * half / (1.0 - inclination.cos());
        let u_out = sin2_u.sqrt().asin();
        let leaves = u_out / n;
        let returns = (std::f64::consts::PI - u_out) / n;

        let task = PairVisibilityTask::InterSatellite {
            primary: 0,
            secondary: 1,
        };
        let windows = task.run(&sats, &[], &ctx).unwrap();
        assert_eq!(windows.len(), 2, "{windows:?}");
        assert_eq!(windows[0].start, ctx.start);
        let end = windows[0].end.unwrap();
        assert_abs_diff_eq!(seconds_between(ctx.start, end), leaves, epsilon = 1e-3);
        assert_abs_diff_eq!(
            seconds_between(ctx.start, windows[1].start),
            returns,
            epsilon = 1e-3
        );
        assert!(windows[1].is_open());
    }

    /// Polar orbit whose plane contains the station's meridian at `t0`,
    /// starting 40 degrees south of it so it rises and passes nearly overhead.
    fn overhead_pass() -> (Satellite, GroundStation) {
        let raan = gmst_rad(t0()).to_degrees().rem_euclid(360.0);
        let sat = circular(0, 6_878_137.0, 90.0, raan, 320.0);
        (sat, GroundStation::new("equator", 0.0, 0.0, 0.0))
    }

    fn ground_windows(policy: FovPolicy, half_angle_deg: f64) -> Vec<VisibilityWindow> {
        let (sat, gs) = overhead_pass();
        let mut ctx = hour();
        ctx.ground.fov_policy = policy;
        ctx.ground.fov_half_angle_deg = half_angle_deg;
        PairVisibilityTask::Ground {
            satellite: 0,
            station: 0,
        }
        .run(&[sat], &[gs], &ctx)
        .unwrap()
    }

    #[test]
    fn polar_orbit_makes_a_single_elevation_pass() {
        let windows = ground_windows(FovPolicy::Exclusion, 90.0);
        assert_eq!(windows.len(), 1, "{windows:?}");
        assert!(windows[0].start > t0());
        assert!(!windows[0].is_open());
        // A 500 km orbit stays above the horizon for roughly ten minutes.
        assert!(windows[0].duration_s > 400.0 && windows[0].duration_s < 900.0);
    }

    #[test]
    fn exclusion_cone_splits_the_pass() {
        let pass = ground_windows(FovPolicy::Exclusion, 90.0).remove(0);
        let excluded = ground_windows(FovPolicy::Exclusion, 45.0);
        let covered = ground_windows(FovPolicy::Coverage, 45.0);

        assert_eq!(excluded.len(), 2, "{excluded:?}");
        assert_eq!(covered.len(), 1, "{covered:?}");
        assert_eq!(excluded[0].start, pass.start);
        assert_eq!(excluded[1].end, pass.end);
        // Adjacent windows meet at the cone crossings, each side refined independently.
        let gap_in = seconds_between(excluded[0].end.unwrap(), covered[0].start);
        let gap_out = seconds_between(covered[0].end.unwrap(), excluded[1].start);
        assert_abs_diff_eq!(gap_in, 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(gap_out, 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(
            total(&excluded) + total(&covered),
            pass.duration_s,
            epsilon = 1e-4
        );
    }

    #[test]
    fn resampled_predicate_agrees_with_windows() {
        let sats = [
            circular(0, 6_878_137.0, 53.0, 0.0, 0.0),
            circular(1, 7_178_137.0, 97.5, 40.0, 120.0),
        ];
        let stations = [
            GroundStation::new("equator", 0.0, 0.0, 0.0),
            GroundStation::new("north", 45.0, 10.0, 200.0),
        ];
        let mut ctx = SimulationContext::new(t0(), shifted_by(t0(), 6.0 * 3600.0));
        ctx.ground.fov_half_angle_deg = 30.0;
        let step_s = 0.5;
        let samples = (ctx.duration_s() / step_s) as usize;

        let mut window_count = 0;
        for task in PairVisibilityTask::enumerate(sats.len(), stations.len()) {
            let windows = task.run(&sats, &stations, &ctx).unwrap();
            window_count += windows.len();
            let predicate = task.predicate(&sats, &stations, &ctx);
            let settings = task.detector_settings(&ctx);
            let near_edge = |t: DateTime<Utc>| {
                windows.iter().any(|w| {
                    let end = w.end.unwrap_or(ctx.end);
                    seconds_between(w.start, t).abs() <= settings.threshold_s
                        || seconds_between(end, t).abs() <= settings.threshold_s
                })
            };

            // Disagreements may only come from pulses shorter than the check interval.
            let mut run_start: Option<f64> = None;
            for k in 0..=samples {
                let offset = k as f64 * step_s;
                let t = shifted_by(ctx.start, offset);
                if near_edge(t) {
                    continue;
                }
                let inside = windows
                    .iter()
                    .any(|w| w.start <= t && t <= w.end.unwrap_or(ctx.end));
                let mismatch = predicate.holds(t).unwrap() != inside;
                match (mismatch, run_start) {
                    (true, None) => run_start = Some(offset),
                    (false, Some(first)) => {
                        assert!(
                            offset - first <= settings.max_check_s,
                            "{} disagrees from {first} s to {offset} s",
                            task.describe(&sats, &stations)
                        );
                        run_start = None;
                    }
                    _ => {}
                }
            }
            if let Some(first) = run_start {
                assert!(ctx.duration_s() - first <= settings.max_check_s);
            }
        }
        assert!(window_count > 0);
    }
}
