//! Field tables for process and sensor records.

use super::{Field, Getter};
use crate::model::{ProcessSample, SensorReading};

/// Declares one field whose getter is a plain function over the record.
macro_rules! field {
    ($rec:ty, $name:literal, $variant:ident -> $ty:ty, |$r:ident| $body:expr) => {
        Field::new(
            $name,
            Getter::$variant({
                fn get($r: &$rec) -> $ty {
                    $body
                }
                get
            }),
        )
    };
}

/// Process fields in output order. Names are the column headers that
/// downstream tooling parses.
pub const PROCESS_FIELDS: &[Field<ProcessSample>] = &[
    field!(ProcessSample, "pid", Int -> i32, |s| s.pid),
    field!(ProcessSample, "state", Char -> char, |s| s.state),
    field!(ProcessSample, "ppid", Int -> i32, |s| s.ppid),
    field!(ProcessSample, "pgrp", Int -> i32, |s| s.pgrp),
    field!(ProcessSample, "session", Int -> i32, |s| s.session),
    field!(ProcessSample, "tty_number", Int -> i32, |s| s.tty_nr),
    field!(ProcessSample, "tty_process_group_id", Int -> i32, |s| s.tpgid),
    field!(ProcessSample, "flags", UInt -> u32, |s| s.flags),
    field!(ProcessSample, "minor_faults", ULong -> u64, |s| s.minflt),
    field!(ProcessSample, "child_minor_faults", ULong -> u64, |s| s.cminflt),
    field!(ProcessSample, "major_faults", ULong -> u64, |s| s.majflt),
    field!(ProcessSample, "child_major_faults", ULong -> u64, |s| s.cmajflt),
    field!(ProcessSample, "userspace_time", ULong -> u64, |s| s.utime),
    field!(ProcessSample, "kernel_time", ULong -> u64, |s| s.stime),
    field!(ProcessSample, "child_userspace_time", Long -> i64, |s| s.cutime),
    field!(ProcessSample, "child_kernel_time", Long -> i64, |s| s.cstime),
    field!(ProcessSample, "priority", Long -> i64, |s| s.priority),
    field!(ProcessSample, "nice", Long -> i64, |s| s.nice),
    field!(ProcessSample, "num_threads", Long -> i64, |s| s.num_threads),
    field!(ProcessSample, "itrealvalue", Long -> i64, |s| s.itrealvalue),
    field!(ProcessSample, "start_time", ULong -> u64, |s| s.starttime),
    field!(ProcessSample, "virtual_memory_size", ULong -> u64, |s| s.vsize),
    field!(ProcessSample, "resident_set_size", Long -> i64, |s| s.rss),
    field!(ProcessSample, "resident_set_limit", ULong -> u64, |s| s.rsslim),
    field!(ProcessSample, "code_segment_start", ULong -> u64, |s| s.startcode),
    field!(ProcessSample, "code_segment_end", ULong -> u64, |s| s.endcode),
    field!(ProcessSample, "stack_start", ULong -> u64, |s| s.startstack),
    field!(ProcessSample, "stack_pointer", ULong -> u64, |s| s.kstkesp),
    field!(ProcessSample, "instruction_pointer", ULong -> u64, |s| s.kstkeip),
    field!(ProcessSample, "signals", ULong -> u64, |s| s.signal),
    field!(ProcessSample, "blocked_signals", ULong -> u64, |s| s.blocked),
    field!(ProcessSample, "ignored_signal", ULong -> u64, |s| s.sigignore),
    field!(ProcessSample, "caught_signal", ULong -> u64, |s| s.sigcatch),
    field!(ProcessSample, "wait_channel", ULong -> u64, |s| s.wchan),
    field!(ProcessSample, "num_swapped_pages", ULong -> u64, |s| s.nswap),
    field!(ProcessSample, "children_num_swapped_pages", ULong -> u64, |s| s.cnswap),
    field!(ProcessSample, "exit_signal", Int -> i32, |s| s.exit_signal),
    field!(ProcessSample, "processor", Int -> i32, |s| s.processor),
    field!(ProcessSample, "realtime_priority", UInt -> u32, |s| s.rt_priority),
    field!(ProcessSample, "policy", UInt -> u32, |s| s.policy),
    field!(
        ProcessSample,
        "cumulative_block_input_output_delay",
        ULong -> u64,
        |s| s.delayacct_blkio_ticks
    ),
    field!(ProcessSample, "guest_time", ULong -> u64, |s| s.guest_time),
    field!(ProcessSample, "child_guest_time", Long -> i64, |s| s.cguest_time),
    field!(ProcessSample, "data_start", ULong -> u64, |s| s.start_data),
    field!(ProcessSample, "data_end", ULong -> u64, |s| s.end_data),
    field!(ProcessSample, "brk_start", ULong -> u64, |s| s.start_brk),
    field!(ProcessSample, "arg_start", ULong -> u64, |s| s.arg_start),
    field!(ProcessSample, "arg_end", ULong -> u64, |s| s.arg_end),
    field!(ProcessSample, "env_start", ULong -> u64, |s| s.env_start),
    field!(ProcessSample, "env_end", ULong -> u64, |s| s.env_end),
    field!(ProcessSample, "exit_code", Int -> i32, |s| s.exit_code),
    field!(ProcessSample, "user", UInt -> u32, |s| s.uid),
    field!(ProcessSample, "group", UInt -> u32, |s| s.gid),
    field!(ProcessSample, "uptime", Double -> f64, |s| s.uptime),
    field!(ProcessSample, "idle_time", Double -> f64, |s| s.idle_time),
    field!(ProcessSample, "timestamp", Long -> i64, |s| s.timestamp),
    field!(ProcessSample, "ticks_per_second", Long -> i64, |s| s.ticks_per_second),
    field!(ProcessSample, "command", Str -> &str, |s| &s.command),
    field!(ProcessSample, "executable", Str -> &str, |s| &s.executable),
    // Nested sub-records: addressed through the parent, never flattened.
    field!(ProcessSample, "read_bytes", ULong -> u64, |s| s.io.read_bytes),
    field!(ProcessSample, "write_bytes", ULong -> u64, |s| s.io.write_bytes),
    field!(ProcessSample, "cancelled_write_bytes", ULong -> u64, |s| s.io.cancelled_write_bytes),
    field!(ProcessSample, "in_octets", ULong -> u64, |s| s.network.in_octets),
    field!(ProcessSample, "out_octets", ULong -> u64, |s| s.network.out_octets),
];

/// Accelerator accounting fields, appended only when accounting is enabled.
pub const GPU_FIELDS: &[Field<ProcessSample>] = &[
    field!(ProcessSample, "gpu_utilisation", UInt -> u32, |s| s.gpu.gpu_utilisation),
    field!(ProcessSample, "gpu_memory_utilisation", UInt -> u32, |s| s.gpu.memory_utilisation),
    field!(ProcessSample, "gpu_max_memory_usage", ULong -> u64, |s| s.gpu.max_memory_usage),
    field!(ProcessSample, "gpu_time_ms", ULong -> u64, |s| s.gpu.time_ms),
];

pub const SENSOR_FIELDS: &[Field<SensorReading>] = &[
    field!(SensorReading, "timestamp", Long -> i64, |r| r.timestamp),
    field!(SensorReading, "class", Str -> &str, |r| r.class_name()),
    field!(SensorReading, "path", Str -> &str, |r| &r.path),
    field!(SensorReading, "value", Long -> i64, |r| r.value),
    field!(SensorReading, "label", Str -> &str, |r| &r.label),
    field!(SensorReading, "name", Str -> &str, |r| &r.name),
];
