use chrono::{DateTime, Utc};

use crate::orbit::error::{EphemerisError, PropagationError};
use crate::orbit::propagation::Propagator;
use crate::orbit::types::{Frame, StateVector};
use crate::time::{seconds_between, shifted_by};

/// Orbit pre-sampled over a closed interval and interpolated in between.
///
/// Nodes sit on a uniform grid from `start` with the final node pinned to
/// `end`. Between nodes the position is a cubic Hermite spline built from
/// the sampled positions and velocities; the velocity is its derivative.
#[derive(Debug, Clone)]
pub struct Ephemeris {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    step_s: f64,
    offsets: Vec<f64>,
    nodes: Vec<StateVector>,
}

impl Ephemeris {
    pub fn generate(
        source: &dyn Propagator,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step_s: f64,
    ) -> Result<Self, EphemerisError> {
        if !(step_s.is_finite() && step_s > 0.0) {
            return Err(EphemerisError::InvalidStep(step_s));
        }

        let span = seconds_between(start, end).max(0.0);
        let mut offsets = Vec::new();
        let mut nodes = Vec::new();

        let mut k = 0usize;
        loop {
            let offset = k as f64 * step_s;
            if offset >= span {
                break;
            }
            offsets.push(offset);
            nodes.push(source.state_at(shifted_by(start, offset))?);
            k += 1;
        }
        offsets.push(span);
        nodes.push(source.state_at(end)?);

        log::debug!(
            "generated ephemeris with {} nodes over {:.0} s",
            nodes.len(),
            span
        );

        Ok(Self {
            start,
            end,
            step_s,
            offsets,
            nodes,
        })
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn segment(&self, offset: f64) -> usize {
        let last = self.nodes.len().saturating_sub(2);
        ((offset / self.step_s).floor() as usize).min(last)
    }
}

impl Propagator for Ephemeris {
    fn state_at(&self, t: DateTime<Utc>) -> Result<StateVector, PropagationError> {
        if t < self.start || t > self.end {
            return Err(PropagationError::OutsideEphemeris {
                requested: t,
                start: self.start,
                end: self.end,
            });
        }
        if self.nodes.len() == 1 {
            return Ok(StateVector { epoch: t, ..self.nodes[0] });
        }

        let offset = seconds_between(self.start, t);
        let k = self.segment(offset);
        let (t0, t1) = (self.offsets[k], self.offsets[k + 1]);
        let (a, b) = (&self.nodes[k], &self.nodes[k + 1]);
        let h = t1 - t0;
        let s = ((offset - t0) / h).clamp(0.0, 1.0);

        let s2 = s * s;
        let s3 = s2 * s;
        let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
        let h10 = s3 - 2.0 * s2 + s;
        let h01 = -2.0 * s3 + 3.0 * s2;
        let h11 = s3 - s2;
        let d00 = 6.0 * s2 - 6.0 * s;
        let d10 = 3.0 * s2 - 4.0 * s + 1.0;
        let d01 = -6.0 * s2 + 6.0 * s;
        let d11 = 3.0 * s2 - 2.0 * s;

        let mut position_m = [0.0; 3];
        let mut velocity_m_s = [0.0; 3];
        for i in 0..3 {
            let (p0, p1) = (a.position_m[i], b.position_m[i]);
            let (v0, v1) = (a.velocity_m_s[i], b.velocity_m_s[i]);
            position_m[i] = h00 * p0 + h10 * h * v0 + h01 * p1 + h11 * h * v1;
            velocity_m_s[i] = (d00 * p0 + d01 * p1) / h + d10 * v0 + d11 * v1;
        }

        Ok(StateVector {
            frame: Frame::Inertial,
            epoch: t,
            position_m,
            velocity_m_s,
        })
    }
}
