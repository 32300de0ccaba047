use chrono::{DateTime, Utc};
use log::trace;

use crate::events::types::{Detection, Direction, Event, VisibilityWindow};
use crate::time::seconds_between;

/// Windows no longer than this are dropped.
pub const DEFAULT_DISCARD_TOLERANCE_S: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    NoOpenWindow,
    WindowOpen(DateTime<Utc>),
}

/// Turns an ordered stream of crossings into visibility windows for one pair.
#[derive(Debug)]
pub struct WindowAssembler {
    end: DateTime<Utc>,
    discard_tolerance_s: f64,
    state: State,
    windows: Vec<VisibilityWindow>,
}

impl WindowAssembler {
    /// `initially_visible` opens a window at `start`, mirroring `g(start) >= 0`.
    pub fn new(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        initially_visible: bool,
        discard_tolerance_s: f64,
    ) -> Self {
        let state = if initially_visible {
            State::WindowOpen(start)
        } else {
            State::NoOpenWindow
        };
        Self {
            end,
            discard_tolerance_s,
            state,
            windows: Vec::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, State::WindowOpen(_))
    }

    pub fn push(&mut self, event: &Event) {
        match (self.state, event.direction) {
            (State::NoOpenWindow, Direction::Increasing) => {
                self.state = State::WindowOpen(event.time);
            }
            (State::WindowOpen(start), Direction::Decreasing) => {
                self.emit(start, Some(event.time), event.time);
                self.state = State::NoOpenWindow;
            }
            (state, direction) => {
                trace!(
                    "Ignoring {} event at {} in state {:?}",
                    direction,
                    event.time,
                    state
                );
            }
        }
    }

    /// Closes the interval, emitting an open-ended window if one is still running.
    pub fn finish(mut self) -> Vec<VisibilityWindow> {
        if let State::WindowOpen(start) = self.state {
            if start <= self.end {
                let end = self.end;
                self.emit(start, None, end);
            }
        }
        self.windows
    }

    fn emit(&mut self, start: DateTime<Utc>, end: Option<DateTime<Utc>>, until: DateTime<Utc>) {
        let duration_s = seconds_between(start, until);
        if duration_s > self.discard_tolerance_s {
            self.windows.push(VisibilityWindow {
                start,
                end,
                duration_s,
            });
        } else {
            trace!("Discarding {:.3e}s window at {}", duration_s, start);
        }
    }
}

/// Feeds a whole [`Detection`] through a fresh [`WindowAssembler`].
pub fn assemble_windows(
    detection: &Detection,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    discard_tolerance_s: f64,
) -> Vec<VisibilityWindow> {
    let mut assembler = WindowAssembler::new(
        start,
        end,
        detection.initial_holds,
        discard_tolerance_s,
    );
    for event in &detection.events {
        assembler.push(event);
    }
    assembler.finish()
}
