//! Utility modules for lockstep.

mod duration;

pub use duration::{DurationError, parse_duration};
