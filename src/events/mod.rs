mod assembler;
mod detector;
mod types;

pub use assembler::{assemble_windows, WindowAssembler, DEFAULT_DISCARD_TOLERANCE_S};
pub use detector::{DetectorSettings, EventDetector};
pub use types::{Detection, Direction, Event, VisibilityWindow};
