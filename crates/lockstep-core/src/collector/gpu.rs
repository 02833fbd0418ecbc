//! Per-process accelerator accounting.
//!
//! The sampler sums accounting statistics over every device on which a
//! process has an entry. A device without an entry for the process
//! contributes nothing; any other failure is fatal to the run.

use crate::model::GpuCounters;

/// Error type for accelerator accounting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpuError {
    /// The management library could not be loaded or enumerated.
    Init(String),
    /// Accounting mode could not be enabled for lack of privileges.
    NoPermission(u32),
    /// A per-process query failed for a reason other than "no entry".
    Query { device: u32, pid: u32, message: String },
}

impl std::fmt::Display for GpuError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GpuError::Init(msg) => write!(f, "accelerator initialisation failed: {}", msg),
            GpuError::NoPermission(device) => write!(
                f,
                "cannot enable accounting on device {}: permission denied (run as root)",
                device
            ),
            GpuError::Query {
                device,
                pid,
                message,
            } => write!(
                f,
                "accounting query for pid {} on device {} failed: {}",
                pid, device, message
            ),
        }
    }
}

impl std::error::Error for GpuError {}

/// Source of per-device, per-process accounting statistics.
pub trait AccountingSource {
    /// Number of devices queried for every process.
    fn device_count(&self) -> u32;

    /// Counters of `pid` on `device`, or `None` if the device holds no
    /// accounting entry for it.
    fn query(&self, device: u32, pid: u32) -> Result<Option<GpuCounters>, GpuError>;
}

/// Sums the counters of `pid` across all devices of `source`.
pub fn collect_gpu<S: AccountingSource + ?Sized>(
    source: &S,
    pid: u32,
) -> Result<GpuCounters, GpuError> {
    let mut total = GpuCounters::default();
    for device in 0..source.device_count() {
        if let Some(counters) = source.query(device, pid)? {
            total.accumulate(&counters);
        }
    }
    Ok(total)
}

#[cfg(feature = "nvml")]
pub use nvidia::NvmlAccounting;

#[cfg(feature = "nvml")]
mod nvidia {
    use nvml_wrapper::Nvml;
    use nvml_wrapper::error::NvmlError;
    use tracing::{debug, info};

    use super::{AccountingSource, GpuError};
    use crate::model::GpuCounters;

    /// NVML-backed accounting source.
    pub struct NvmlAccounting {
        nvml: Nvml,
        device_count: u32,
    }

    impl NvmlAccounting {
        /// Loads NVML and turns accounting mode on for every device where
        /// it is off.
        pub fn init() -> Result<Self, GpuError> {
            let nvml = Nvml::init().map_err(|e| GpuError::Init(e.to_string()))?;
            let device_count = nvml
                .device_count()
                .map_err(|e| GpuError::Init(e.to_string()))?;

            for index in 0..device_count {
                let mut device = nvml
                    .device_by_index(index)
                    .map_err(|e| GpuError::Init(e.to_string()))?;
                let enabled = device
                    .is_accounting_enabled()
                    .map_err(|e| GpuError::Init(e.to_string()))?;
                if enabled {
                    debug!("accounting already enabled on device {}", index);
                    continue;
                }
                match device.set_accounting(true) {
                    Ok(()) => info!("enabled accounting on device {}", index),
                    Err(NvmlError::NoPermission) => return Err(GpuError::NoPermission(index)),
                    Err(e) => return Err(GpuError::Init(e.to_string())),
                }
            }

            Ok(Self { nvml, device_count })
        }
    }

    impl AccountingSource for NvmlAccounting {
        fn device_count(&self) -> u32 {
            self.device_count
        }

        fn query(&self, device: u32, pid: u32) -> Result<Option<GpuCounters>, GpuError> {
            let query_error = |e: NvmlError| GpuError::Query {
                device,
                pid,
                message: e.to_string(),
            };
            let handle = self.nvml.device_by_index(device).map_err(query_error)?;
            match handle.accounting_stats_for(pid) {
                Ok(stats) => Ok(Some(GpuCounters {
                    gpu_utilisation: stats.gpu_utilization.unwrap_or(0),
                    memory_utilisation: stats.memory_utilization.unwrap_or(0),
                    max_memory_usage: stats.max_memory_usage.unwrap_or(0),
                    time_ms: stats.time,
                })),
                Err(NvmlError::NotFound) => Ok(None),
                Err(e) => Err(query_error(e)),
            }
        }
    }
}
