//! Sample assembler.
//!
//! Combines the per-resource readers into complete samples. A process
//! sample exists only if every mandatory reader succeeded for it in this
//! tick; the caller never sees a partially filled record.

use std::path::PathBuf;

use tracing::{debug, trace, warn};

use crate::collector::gpu::{AccountingSource, GpuError, collect_gpu};
use crate::collector::procfs::{CollectError, ProcessReader};
use crate::collector::sensors::SensorReader;
use crate::collector::traits::FileSystem;
use crate::model::{ProcessSample, SensorClass, SensorReading};

/// Fallback when `sysconf(_SC_CLK_TCK)` is unavailable.
const DEFAULT_TICKS_PER_SECOND: i64 = 100;

/// Default ownership threshold: regular users on most distributions.
pub const DEFAULT_MIN_UID: u32 = 1000;

/// Kernel clock ticks per second, as used by the time fields of `stat`.
pub fn clock_ticks_per_second() -> i64 {
    // SAFETY: sysconf has no memory-safety preconditions.
    let ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if ticks > 0 {
        ticks as i64
    } else {
        warn!(
            "sysconf(_SC_CLK_TCK) failed, assuming {} ticks per second",
            DEFAULT_TICKS_PER_SECOND
        );
        DEFAULT_TICKS_PER_SECOND
    }
}

/// Assembles process samples and sensor readings for one tick.
pub struct Collector<F: FileSystem + Clone> {
    processes: ProcessReader<F>,
    sensors: SensorReader<F>,
    gpu: Option<Box<dyn AccountingSource>>,
    min_uid: u32,
    self_pid: u32,
    ticks_per_second: i64,
}

impl<F: FileSystem + Clone> Collector<F> {
    /// Creates a collector over the given procfs and sysfs roots.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    /// * `sys_path` - Base path to sysfs (usually "/sys")
    pub fn new(fs: F, proc_path: impl Into<PathBuf>, sys_path: impl Into<PathBuf>) -> Self {
        Self {
            processes: ProcessReader::new(fs.clone(), proc_path),
            sensors: SensorReader::new(fs, sys_path),
            gpu: None,
            min_uid: DEFAULT_MIN_UID,
            self_pid: std::process::id(),
            ticks_per_second: DEFAULT_TICKS_PER_SECOND,
        }
    }

    /// Excludes processes owned by a uid below `min_uid`.
    pub fn with_min_uid(mut self, min_uid: u32) -> Self {
        self.min_uid = min_uid;
        self
    }

    /// Overrides the pid that is always admitted regardless of owner.
    pub fn with_self_pid(mut self, pid: u32) -> Self {
        self.self_pid = pid;
        self
    }

    pub fn with_ticks_per_second(mut self, ticks: i64) -> Self {
        self.ticks_per_second = ticks;
        self
    }

    /// Appends accelerator accounting to every process chain.
    pub fn with_gpu(mut self, source: Box<dyn AccountingSource>) -> Self {
        self.gpu = Some(source);
        self
    }

    pub fn gpu_enabled(&self) -> bool {
        self.gpu.is_some()
    }

    /// Returns the ids of `/proc` entries that pass the admission rules,
    /// together with their owner.
    fn admitted(&self) -> Vec<(u32, u32, u32)> {
        let proc_path = self.processes.proc_path();
        let entries = match self.processes.fs().read_dir(proc_path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("unable to list {}: {}", proc_path.display(), e);
                return Vec::new();
            }
        };

        let mut admitted = Vec::new();
        for entry in entries {
            let Some(pid) = entry
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.parse::<u32>().ok())
            else {
                continue;
            };
            if pid == 0 {
                continue;
            }
            let meta = match self.processes.entry_meta(pid) {
                Ok(meta) => meta,
                Err(e) => {
                    debug!("skipping pid {}: {}", pid, e);
                    continue;
                }
            };
            if !meta.is_dir {
                continue;
            }
            if meta.uid < self.min_uid && pid != self.self_pid {
                trace!("skipping pid {} owned by uid {}", pid, meta.uid);
                continue;
            }
            admitted.push((pid, meta.uid, meta.gid));
        }
        admitted
    }

    /// Runs the mandatory readers in their fixed order.
    fn read_chain(&self, pid: u32) -> Result<ProcessSample, CollectError> {
        let mut sample = self.processes.read_stat(pid)?;
        sample.io = self.processes.read_io(pid)?;
        sample.network = self.processes.read_network(pid)?;
        Ok(sample)
    }

    /// Collects one sample per admitted process.
    ///
    /// Processes whose chain fails are left out and logged. An accounting
    /// failure aborts the whole collection.
    pub fn collect_processes(&self, timestamp: i64) -> Result<Vec<ProcessSample>, GpuError> {
        let (uptime, idle_time) = match self.processes.read_uptime() {
            Ok(values) => values,
            Err(e) => {
                warn!("{}", e);
                (0.0, 0.0)
            }
        };

        let mut samples = Vec::new();
        for (pid, uid, gid) in self.admitted() {
            let mut sample = match self.read_chain(pid) {
                Ok(sample) => sample,
                Err(CollectError::ProcessGone(_)) => {
                    debug!("process {} disappeared during collection", pid);
                    continue;
                }
                Err(e) => {
                    warn!("failed to collect process {}: {}", pid, e);
                    continue;
                }
            };
            if let Some(gpu) = &self.gpu {
                sample.gpu = collect_gpu(gpu.as_ref(), pid)?;
            }
            sample.uid = uid;
            sample.gid = gid;
            sample.uptime = uptime;
            sample.idle_time = idle_time;
            sample.timestamp = timestamp;
            sample.ticks_per_second = self.ticks_per_second;
            samples.push(sample);
        }
        Ok(samples)
    }

    /// Collects every reading of one hardware class.
    pub fn collect_sensors(&self, class: SensorClass, timestamp: i64) -> Vec<SensorReading> {
        self.sensors.collect(class, timestamp)
    }
}
