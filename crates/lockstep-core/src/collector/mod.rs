//! Source readers and the sample assembler.
//!
//! Every reader goes through the [`FileSystem`] trait so that it can run
//! against the live `/proc` and `/sys` trees or against [`mock::MockFs`].
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                      Collector                       │
//! │  ┌────────────────┐ ┌───────────────┐ ┌───────────┐  │
//! │  │ ProcessReader  │ │ SensorReader  │ │ Accounting│  │
//! │  │ /proc/[pid]/*  │ │ /sys/class/*  │ │  (NVML)   │  │
//! │  └───────┬────────┘ └───────┬───────┘ └───────────┘  │
//! │          └────────┬─────────┘                        │
//! │            ┌──────▼──────┐                           │
//! │            │  FileSystem │ (trait)                   │
//! │            └──────┬──────┘                           │
//! └───────────────────┼──────────────────────────────────┘
//!              ┌──────┴──────┐
//!       ┌──────▼──────┐ ┌────▼────────┐
//!       │   RealFs    │ │   MockFs    │
//!       └─────────────┘ └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use lockstep_core::collector::{Collector, RealFs};
//!
//! let collector = Collector::new(RealFs, "/proc", "/sys").with_min_uid(1000);
//! let samples = collector.collect_processes(chrono::Utc::now().timestamp())?;
//! ```

#[allow(clippy::module_inception)]
mod collector;
pub mod gpu;
pub mod mock;
pub mod procfs;
pub mod sensors;
pub mod traits;

pub use collector::{Collector, DEFAULT_MIN_UID, clock_ticks_per_second};
#[cfg(feature = "nvml")]
pub use gpu::NvmlAccounting;
pub use gpu::{AccountingSource, GpuError};
pub use procfs::{CollectError, ProcessReader};
pub use sensors::SensorReader;
pub use traits::{EntryMeta, FileSystem, RealFs};
