//! Process sample: one record per admitted process per tick.

/// Block I/O counters from `/proc/[pid]/io`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IoCounters {
    pub read_bytes: u64,
    pub write_bytes: u64,
    pub cancelled_write_bytes: u64,
}

/// IP octet counters from `/proc/[pid]/net/netstat` (`IpExt`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkCounters {
    pub in_octets: u64,
    pub out_octets: u64,
}

/// Accelerator accounting counters, summed over every device the process
/// has accounting entries on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GpuCounters {
    pub gpu_utilisation: u32,
    pub memory_utilisation: u32,
    pub max_memory_usage: u64,
    pub time_ms: u64,
}

impl GpuCounters {
    /// Adds another device's contribution.
    pub fn accumulate(&mut self, other: &GpuCounters) {
        self.gpu_utilisation = self.gpu_utilisation.saturating_add(other.gpu_utilisation);
        self.memory_utilisation = self
            .memory_utilisation
            .saturating_add(other.memory_utilisation);
        self.max_memory_usage = self.max_memory_usage.saturating_add(other.max_memory_usage);
        self.time_ms = self.time_ms.saturating_add(other.time_ms);
    }
}

/// Everything known about one process at one tick.
///
/// Fields from `stat` keep the kernel's own widths so that rendering is
/// lossless. Sub-records (`io`, `network`, `gpu`) stay nested; the field
/// registry addresses them by path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessSample {
    pub pid: i32,
    pub state: char,
    pub ppid: i32,
    pub pgrp: i32,
    pub session: i32,
    pub tty_nr: i32,
    pub tpgid: i32,
    pub flags: u32,
    pub minflt: u64,
    pub cminflt: u64,
    pub majflt: u64,
    pub cmajflt: u64,
    pub utime: u64,
    pub stime: u64,
    pub cutime: i64,
    pub cstime: i64,
    pub priority: i64,
    pub nice: i64,
    pub num_threads: i64,
    pub itrealvalue: i64,
    pub starttime: u64,
    pub vsize: u64,
    pub rss: i64,
    pub rsslim: u64,
    pub startcode: u64,
    pub endcode: u64,
    pub startstack: u64,
    pub kstkesp: u64,
    pub kstkeip: u64,
    pub signal: u64,
    pub blocked: u64,
    pub sigignore: u64,
    pub sigcatch: u64,
    pub wchan: u64,
    pub nswap: u64,
    pub cnswap: u64,
    pub exit_signal: i32,
    pub processor: i32,
    pub rt_priority: u32,
    pub policy: u32,
    pub delayacct_blkio_ticks: u64,
    pub guest_time: u64,
    pub cguest_time: i64,
    pub start_data: u64,
    pub end_data: u64,
    pub start_brk: u64,
    pub arg_start: u64,
    pub arg_end: u64,
    pub env_start: u64,
    pub env_end: u64,
    pub exit_code: i32,
    /// Owner of `/proc/[pid]`.
    pub uid: u32,
    pub gid: u32,
    /// Host uptime and idle time in seconds, shared by the whole tick.
    pub uptime: f64,
    pub idle_time: f64,
    pub ticks_per_second: i64,
    /// Seconds since the epoch, shared by the whole tick.
    pub timestamp: i64,
    pub command: String,
    pub executable: String,
    pub io: IoCounters,
    pub network: NetworkCounters,
    pub gpu: GpuCounters,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gpu_accumulate_sums_every_counter() {
        let mut total = GpuCounters::default();
        total.accumulate(&GpuCounters {
            gpu_utilisation: 10,
            memory_utilisation: 5,
            max_memory_usage: 1 << 20,
            time_ms: 300,
        });
        total.accumulate(&GpuCounters {
            gpu_utilisation: 7,
            memory_utilisation: 1,
            max_memory_usage: 1 << 20,
            time_ms: 200,
        });
        assert_eq!(total.gpu_utilisation, 17);
        assert_eq!(total.memory_utilisation, 6);
        assert_eq!(total.max_memory_usage, 2 << 20);
        assert_eq!(total.time_ms, 500);
    }
}
