use chrono::{DateTime, Utc};
use log::{debug, trace, warn};
use serde::Serialize;

use crate::events::types::{Detection, Direction, Event};
use crate::orbit::PropagationError;
use crate::time::{seconds_between, shifted_by};
use crate::visibility::Predicate;

/// Sampling and refinement parameters for one predicate.
///
/// `max_check_s` bounds how far apart consecutive samples of `g` are. A
/// visibility pulse shorter than this can fall between two samples of the
/// same sign and go undetected; see [`DetectorSettings::validate_for_period`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DetectorSettings {
    pub max_check_s: f64,
    pub threshold_s: f64,
    pub max_iterations: usize,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            max_check_s: 10.0,
            threshold_s: 1e-6,
            max_iterations: 100,
        }
    }
}

impl DetectorSettings {
    /// Largest check interval considered safe for an orbit of `period_s`
    /// (10 degrees of mean motion).
    pub fn max_safe_check_s(period_s: f64) -> f64 {
        period_s / 36.0
    }

    /// Returns `false` and logs a warning when the check interval is coarser
    /// than [`Self::max_safe_check_s`] for the given orbital period.
    pub fn validate_for_period(&self, period_s: f64) -> bool {
        let limit = Self::max_safe_check_s(period_s);
        if self.max_check_s > limit {
            warn!(
                "Check interval {:.1}s exceeds {:.1}s for a {:.0}s orbit; short visibility pulses may be missed",
                self.max_check_s, limit, period_s
            );
            return false;
        }
        true
    }
}

/// Stateless forward sweep locating the zero crossings of a predicate.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventDetector {
    settings: DetectorSettings,
}

impl EventDetector {
    pub fn new(settings: DetectorSettings) -> Self {
        Self { settings }
    }

    pub fn detect(
        &self,
        predicate: &Predicate<'_>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Detection, PropagationError> {
        let span = seconds_between(start, end).max(0.0);
        let eval = |offset: f64| predicate.g(shifted_by(start, offset));

        let g_start = eval(0.0)?;
        let initial_holds = g_start >= 0.0;
        let mut events = Vec::new();

        let step = self.settings.max_check_s;
        let mut t_prev = 0.0;
        let mut g_prev = g_start;
        while t_prev < span {
            let t_next = (t_prev + step).min(span);
            let g_next = eval(t_next)?;

            if holds(g_prev) != holds(g_next) {
                let direction = if holds(g_next) {
                    Direction::Increasing
                } else {
                    Direction::Decreasing
                };
                let offset = self.refine(&eval, t_prev, g_prev, t_next, g_next)?;
                trace!(
                    "{} crossing in [{:.3}, {:.3}]s refined to {:.6}s",
                    direction,
                    t_prev,
                    t_next,
                    offset
                );
                events.push(Event {
                    time: shifted_by(start, offset),
                    direction,
                });
            }

            t_prev = t_next;
            g_prev = g_next;
        }

        debug!(
            "Sweep over {:.0}s: initially {}, {} crossing(s)",
            span,
            if initial_holds { "holding" } else { "not holding" },
            events.len()
        );

        Ok(Detection {
            initial_holds,
            events,
        })
    }

    /// Brent's method on a bracket whose ends disagree on `g >= 0`.
    ///
    /// Returns the bracket end lying on the same side as `g(hi)`, no further
    /// than `threshold_s` from the crossing, or an exact zero of `g` if one is hit.
    fn refine<F>(
        &self,
        eval: &F,
        lo: f64,
        g_lo: f64,
        hi: f64,
        g_hi: f64,
    ) -> Result<f64, PropagationError>
    where
        F: Fn(f64) -> Result<f64, PropagationError>,
    {
        let target_side = holds(g_hi);
        let tol = self.settings.threshold_s;

        let (mut a, mut fa) = (lo, g_lo);
        let (mut b, mut fb) = (hi, g_hi);
        let (mut c, mut fc) = (b, fb);
        let mut d = b - a;
        let mut e = d;

        for _ in 0..self.settings.max_iterations {
            // Keep the root between b and c.
            if holds(fb) == holds(fc) {
                c = a;
                fc = fa;
                d = b - a;
                e = d;
            }
            if fc.abs() < fb.abs() {
                a = b;
                b = c;
                c = a;
                fa = fb;
                fb = fc;
                fc = fa;
            }

            let tol1 = 2.0 * f64::EPSILON * b.abs() + 0.5 * tol;
            let xm = 0.5 * (c - b);
            if fb == 0.0 {
                return Ok(b);
            }
            if xm.abs() <= tol1 {
                return Ok(if holds(fb) == target_side { b } else { c });
            }

            if e.abs() >= tol1 && fa.abs() > fb.abs() {
                // Inverse quadratic interpolation, or secant when only two points are distinct.
                let s = fb / fa;
                let (mut p, mut q);
                if a == c {
                    p = 2.0 * xm * s;
                    q = 1.0 - s;
                } else {
                    let qa = fa / fc;
                    let r = fb / fc;
                    p = s * (2.0 * xm * qa * (qa - r) - (b - a) * (r - 1.0));
                    q = (qa - 1.0) * (r - 1.0) * (s - 1.0);
                }
                if p > 0.0 {
                    q = -q;
                }
                p = p.abs();
                let min1 = 3.0 * xm * q - (tol1 * q).abs();
                let min2 = (e * q).abs();
                if 2.0 * p < min1.min(min2) {
                    e = d;
                    d = p / q;
                } else {
                    d = xm;
                    e = d;
                }
            } else {
                d = xm;
                e = d;
            }

            a = b;
            fa = fb;
            b += if d.abs() > tol1 { d } else { tol1.copysign(xm) };
            fb = eval(b)?;
        }

        warn!(
            "Crossing refinement stopped after {} iterations with bracket width {:.3e}s",
            self.settings.max_iterations,
            (c - b).abs()
        );
        Ok(if holds(fb) == target_side { b } else { c })
    }
}

fn holds(g: f64) -> bool {
    g >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    }

    fn offsets(detection: &Detection) -> Vec<f64> {
        detection
            .events
            .iter()
            .map(|e| seconds_between(t0(), e.time))
            .collect()
    }

    fn sine(period_s: f64, bias: f64) -> Predicate<'static> {
        Predicate::function(move |t| {
            let x = seconds_between(t0(), t);
            Ok((2.0 * std::f64::consts::PI * x / period_s).sin() + bias)
        })
    }

    #[test]
    fn finds_sine_crossings_to_threshold() {
        let detector = EventDetector::new(DetectorSettings {
            max_check_s: 7.0,
            ..DetectorSettings::default()
        });
        let end = shifted_by(t0(), 240.0);
        let detection = detector.detect(&sine(100.0, 0.0), t0(), end).unwrap();

        // sin(0) = 0 counts as holding.
        assert!(detection.initial_holds);
        let times = offsets(&detection);
        assert_eq!(times.len(), 4);
        for (found, expected) in times.iter().zip([50.0, 100.0, 150.0, 200.0]) {
            assert_abs_diff_eq!(*found, expected, epsilon = 2e-6);
        }
        let directions: Vec<_> = detection.events.iter().map(|e| e.direction).collect();
        assert_eq!(
            directions,
            [
                Direction::Decreasing,
                Direction::Increasing,
                Direction::Decreasing,
                Direction::Increasing
            ]
        );
    }

    #[test]
    fn event_instant_is_on_the_new_side() {
        let detector = EventDetector::default();
        let predicate = sine(100.0, 0.3);
        let detection = detector
            .detect(&predicate, t0(), shifted_by(t0(), 100.0))
            .unwrap();
        assert_eq!(detection.events.len(), 2);
        for event in &detection.events {
            let holds_now = predicate.holds(event.time).unwrap();
            assert_eq!(holds_now, event.direction == Direction::Increasing);
        }
    }

    #[test]
    fn step_predicate_is_refined_by_bisection_fallback() {
        let jump = 37.123_456;
        let predicate = Predicate::function(move |t| {
            Ok(if seconds_between(t0(), t) < jump { -1.0 } else { 1.0 })
        });
        let detection = EventDetector::default()
            .detect(&predicate, t0(), shifted_by(t0(), 120.0))
            .unwrap();
        assert!(!detection.initial_holds);
        let times = offsets(&detection);
        assert_eq!(times.len(), 1);
        assert_abs_diff_eq!(times[0], jump, epsilon = 2e-6);
        assert_eq!(detection.events[0].direction, Direction::Increasing);
    }

    #[test]
    fn last_step_is_clipped_to_the_end() {
        // Crossing at 95 s, end at 97 s, check interval 10 s.
        let predicate = Predicate::function(|t| Ok(95.0 - seconds_between(t0(), t)));
        let detection = EventDetector::default()
            .detect(&predicate, t0(), shifted_by(t0(), 97.0))
            .unwrap();
        let times = offsets(&detection);
        assert_eq!(times.len(), 1);
        assert_abs_diff_eq!(times[0], 95.0, epsilon = 2e-6);
    }

    #[test]
    fn empty_interval_reports_only_the_initial_sign() {
        let detection = EventDetector::default()
            .detect(&sine(100.0, -2.0), t0(), t0())
            .unwrap();
        assert!(!detection.initial_holds);
        assert!(detection.events.is_empty());
    }

    #[test]
    fn pulse_shorter_than_check_interval_can_be_missed() {
        // Visible only in [12, 14] s.
        let pulse = || {
            Predicate::function(|t| {
                let x = seconds_between(t0(), t);
                Ok(1.0 - (x - 13.0).abs())
            })
        };
        let end = shifted_by(t0(), 60.0);

        let coarse = EventDetector::new(DetectorSettings {
            max_check_s: 10.0,
            ..DetectorSettings::default()
        });
        assert!(coarse.detect(&pulse(), t0(), end).unwrap().events.is_empty());

        let fine = EventDetector::new(DetectorSettings {
            max_check_s: 1.0,
            ..DetectorSettings::default()
        });
        let times = offsets(&fine.detect(&pulse(), t0(), end).unwrap());
        assert_eq!(times.len(), 2);
        assert_abs_diff_eq!(times[0], 12.0, epsilon = 2e-6);
        assert_abs_diff_eq!(times[1], 14.0, epsilon = 2e-6);
    }

    #[test]
    fn period_check_flags_coarse_intervals() {
        let settings = DetectorSettings {
            max_check_s: 300.0,
            ..DetectorSettings::default()
        };
        assert!(!settings.validate_for_period(5_700.0));
        assert!(DetectorSettings::default().validate_for_period(5_700.0));
    }

    #[test]
    fn evaluation_errors_abort_the_sweep() {
        let predicate = Predicate::function(|t| {
            if seconds_between(t0(), t) > 30.0 {
                Err(PropagationError::UnsupportedEccentricity(1.5))
            } else {
                Ok(1.0)
            }
        });
        let result = EventDetector::default().detect(&predicate, t0(), shifted_by(t0(), 60.0));
        assert_eq!(result, Err(PropagationError::UnsupportedEccentricity(1.5)));
    }
}
