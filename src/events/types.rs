use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
    /// g went from negative to non-negative: visibility begins.
    Increasing,
    /// g went from non-negative to negative: visibility ends.
    Decreasing,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Event {
    pub time: DateTime<Utc>,
    pub direction: Direction,
}

/// Outcome of one forward sweep over an interval.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Whether `g(start) >= 0`.
    pub initial_holds: bool,
    /// Crossings in nondecreasing time order.
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisibilityWindow {
    pub start: DateTime<Utc>,
    /// `None` while the window is still open at the end of the interval.
    pub end: Option<DateTime<Utc>>,
    pub duration_s: f64,
}

impl VisibilityWindow {
    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }
}
