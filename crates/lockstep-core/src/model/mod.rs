//! Per-tick sample records.
//!
//! Every record here lives for exactly one tick: it is assembled, rendered
//! and dropped before the sampler sleeps again.

mod process;
mod sensor;

pub use process::{GpuCounters, IoCounters, NetworkCounters, ProcessSample};
pub use sensor::{SensorClass, SensorReading};
