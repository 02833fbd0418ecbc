//! Pre-built mock filesystem scenarios for testing.
//!
//! These scenarios provide realistic `/proc` and `/sys` states for testing
//! the readers and the sample assembler.

use super::filesystem::MockFs;

const NETSTAT: &str = "\
TcpExt: SyncookiesSent SyncookiesRecv SyncookiesFailed EmbryonicRsts
TcpExt: 0 0 0 0
IpExt: InNoRoutes InTruncatedPkts InMcastPkts OutMcastPkts InBcastPkts OutBcastPkts InOctets OutOctets InMcastOctets OutMcastOctets InBcastOctets OutBcastOctets InCsumErrors InNoECTPkts InECT1Pkts InECT0Pkts InCEPkts ReasmOverlaps
IpExt: 0 0 1000 500 5000 100 10000000000 5000000000 100000 50000 500000 10000 0 1000000 0 0 0 0
";

impl MockFs {
    /// Builds a well-formed `/proc/[pid]/stat` line.
    pub fn stat_line(pid: u32, comm: &str, ppid: u32) -> String {
        format!(
            "{pid} ({comm}) S {ppid} {pid} {pid} 0 -1 4194304 100 0 0 0 5 2 0 0 20 0 1 0 100100 5000000 500 18446744073709551615 \
             1 1 0 0 0 0 0 0 0 0 0 0 17 1 0 0 0 0 0 0 0 0 0 0 0 0 0"
        )
    }

    /// Builds a `/proc/[pid]/io` body with the given byte counters.
    pub fn io_content(read_bytes: u64, write_bytes: u64) -> String {
        format!(
            "rchar: 0\nwchar: 0\nsyscr: 0\nsyscw: 0\nread_bytes: {read_bytes}\nwrite_bytes: {write_bytes}\ncancelled_write_bytes: 0\n"
        )
    }

    /// Adds a complete, readable process.
    pub fn add_simple_process(&mut self, pid: u32, uid: u32, comm: &str, exe: &str) {
        self.add_process(
            pid,
            uid,
            &Self::stat_line(pid, comm, 1),
            &Self::io_content(4096, 4096),
            NETSTAT,
            exe,
        );
    }

    /// Creates a typical system with a few processes.
    ///
    /// Includes: init (PID 1, root), a bash shell and its child owned by
    /// uid 1000, plus the usual non-process entries in `/proc`.
    pub fn typical_system() -> Self {
        let mut fs = Self::new();

        // System-wide files
        fs.add_file("/proc/uptime", "12345.67 98765.43\n");
        fs.add_file("/proc/loadavg", "0.15 0.10 0.05 1/150 1234\n");
        fs.add_dir("/proc/sys");

        // PID 1 - init/systemd
        fs.add_process(
            1,
            0,
            "1 (systemd) S 0 1 1 0 -1 4194560 50000 1000000 100 500 1000 500 2000 1000 20 0 1 0 1 170000000 3000 18446744073709551615 1 1 0 0 0 0 0 0 1073745152 0 0 0 17 0 0 0 0 0 0 0 0 0 0 0 0 0 0",
            "rchar: 100000000\nwchar: 50000000\nsyscr: 50000\nsyscw: 25000\nread_bytes: 10000000\nwrite_bytes: 5000000\ncancelled_write_bytes: 0\n",
            NETSTAT,
            "/usr/lib/systemd/systemd",
        );

        // PID 1000 - bash shell
        fs.add_process(
            1000,
            1000,
            "1000 (bash) S 999 1000 1000 34816 1001 4194304 5000 50000 0 0 100 50 200 100 20 0 1 0 100000 25000000 2000 18446744073709551615 1 1 0 0 0 0 65536 3670020 1266777851 0 0 0 17 2 0 0 0 0 0 0 0 0 0 0 0 0 0",
            "rchar: 1000000\nwchar: 500000\nsyscr: 5000\nsyscw: 2500\nread_bytes: 100000\nwrite_bytes: 50000\ncancelled_write_bytes: 0\n",
            NETSTAT,
            "/usr/bin/bash",
        );

        // PID 1001 - cat command (child of bash)
        fs.add_process(
            1001,
            1000,
            "1001 (cat) R 1000 1000 1000 34816 1001 4194304 100 0 0 0 5 2 0 0 20 0 1 0 100100 5000000 500 18446744073709551615 1 1 0 0 0 0 0 0 0 0 0 0 17 1 0 0 0 0 0 0 0 0 0 0 0 0 0",
            "rchar: 10000\nwchar: 10000\nsyscr: 100\nsyscw: 100\nread_bytes: 4096\nwrite_bytes: 4096\ncancelled_write_bytes: 0\n",
            NETSTAT,
            "/usr/bin/cat",
        );

        fs
    }

    /// Creates a `/sys/class` tree with hwmon, thermal and DRM devices.
    ///
    /// `hwmon1` has no `name` file and `fan1` has no label, to exercise
    /// decoration fallbacks; `temp3_input` is unreadable garbage.
    pub fn sensor_tree() -> Self {
        let mut fs = Self::new();

        // hwmon0 - CPU package temperatures
        fs.add_file("/sys/class/hwmon/hwmon0/name", "coretemp\n");
        fs.add_file("/sys/class/hwmon/hwmon0/temp1_input", "45000\n");
        fs.add_file("/sys/class/hwmon/hwmon0/temp1_label", "Package id 0\n");
        fs.add_file("/sys/class/hwmon/hwmon0/temp1_max", "100000\n");
        fs.add_file("/sys/class/hwmon/hwmon0/temp2_input", "43000\n");
        fs.add_file("/sys/class/hwmon/hwmon0/temp2_label", "Core 0\n");
        fs.add_file("/sys/class/hwmon/hwmon0/temp3_input", "N/A\n");

        // hwmon1 - fan controller without a name
        fs.add_file("/sys/class/hwmon/hwmon1/fan1_input", "1200\n");

        // Thermal zones
        fs.add_file("/sys/class/thermal/thermal_zone0/temp", "38000\n");
        fs.add_file("/sys/class/thermal/thermal_zone0/type", "acpitz\n");
        fs.add_file("/sys/class/thermal/cooling_device0/cur_state", "0\n");

        // DRM card with VRAM counters, plus a connector and a render node
        fs.add_file("/sys/class/drm/card0/device/mem_info_vram_used", "268435456\n");
        fs.add_file("/sys/class/drm/card0/device/mem_info_vram_total", "8589934592\n");
        fs.add_file("/sys/class/drm/card0/device/product_name", "Radeon RX 6600\n");
        fs.add_file("/sys/class/drm/card0/device/vendor", "0x1002\n");
        fs.add_file("/sys/class/drm/card0-DP-1/status", "connected\n");
        fs.add_dir("/sys/class/drm/renderD128");

        fs
    }
}
