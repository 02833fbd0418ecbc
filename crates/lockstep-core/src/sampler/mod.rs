//! Sampling loop, workload supervision and run setup.

mod scheduler;
mod setup;
mod signals;
mod supervisor;

pub use scheduler::{LoopState, Sampler, StopReason, TickError};
pub use setup::{SetupError, build, serializers};
pub use signals::{STOP_SIGNALS, register_stop_signals};
pub use supervisor::{ExitOutcome, Supervisor, SupervisorError};
