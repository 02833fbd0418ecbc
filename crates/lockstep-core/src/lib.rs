//! lockstep-core: schema-driven telemetry sampler.
//!
//! Provides:
//! - `model`: process samples and sensor readings
//! - `field`: field registry and the `|`-delimited serializer
//! - `collector`: `/proc` and `/sys` readers, accelerator accounting, sample assembler
//! - `output`: sinks and the output multiplexer with its low-rate channel
//! - `sampler`: tick loop, workload supervisor, run setup
//! - `config`: configuration file and layered settings
//! - `util`: interval parsing

pub mod collector;
pub mod config;
pub mod field;
pub mod model;
pub mod output;
pub mod sampler;
pub mod util;
