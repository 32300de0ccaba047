//! Visibility windows between Keplerian satellites, ground stations and each other.

pub mod config;
pub mod events;
pub mod frames;
pub mod orbit;
pub mod report;
pub mod scheduler;
pub mod snapshot;
pub mod time;
pub mod visibility;
