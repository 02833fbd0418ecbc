//! Parsers for `/proc` filesystem files.
//!
//! These are pure functions that parse the content of various `/proc` files
//! into structured data. They are designed to be easily testable with string inputs.

use std::str::FromStr;

use crate::model::{IoCounters, NetworkCounters, ProcessSample};

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// Number of whitespace-separated fields after the command, `state` through
/// `exit_code`.
const STAT_FIELDS: usize = 50;

fn parse_at<T: FromStr>(fields: &[&str], idx: usize, name: &str) -> Result<T, ParseError> {
    fields
        .get(idx)
        .ok_or_else(|| ParseError::new(format!("missing field {}", name)))?
        .parse()
        .map_err(|_| ParseError::new(format!("invalid {}", name)))
}

/// Parses `/proc/[pid]/stat` content into the stat portion of a sample.
///
/// The format is tricky because the comm field can contain spaces and parentheses.
/// Format: pid (comm) state ppid pgrp session tty_nr ...
///
/// Fields outside `stat` (owner, I/O, network, ...) are left at their defaults.
pub fn parse_proc_stat(content: &str) -> Result<ProcessSample, ParseError> {
    let content = content.trim();

    // Find the comm field boundaries (enclosed in parentheses)
    let open_paren = content
        .find('(')
        .ok_or_else(|| ParseError::new("missing '(' in stat"))?;
    let close_paren = content
        .rfind(')')
        .ok_or_else(|| ParseError::new("missing ')' in stat"))?;

    if close_paren <= open_paren {
        return Err(ParseError::new("invalid parentheses in stat"));
    }

    let pid: i32 = content[..open_paren]
        .trim()
        .parse()
        .map_err(|_| ParseError::new("invalid pid"))?;

    let command = content[open_paren + 1..close_paren].to_string();

    let fields: Vec<&str> = content[close_paren + 1..].split_whitespace().collect();
    if fields.len() < STAT_FIELDS {
        return Err(ParseError::new(format!(
            "not enough fields in stat: expected {}+, got {}",
            STAT_FIELDS,
            fields.len()
        )));
    }

    let f = fields.as_slice();
    Ok(ProcessSample {
        pid,
        command,
        state: f[0]
            .chars()
            .next()
            .ok_or_else(|| ParseError::new("invalid state"))?,
        ppid: parse_at(f, 1, "ppid")?,
        pgrp: parse_at(f, 2, "pgrp")?,
        session: parse_at(f, 3, "session")?,
        tty_nr: parse_at(f, 4, "tty_nr")?,
        tpgid: parse_at(f, 5, "tpgid")?,
        flags: parse_at(f, 6, "flags")?,
        minflt: parse_at(f, 7, "minflt")?,
        cminflt: parse_at(f, 8, "cminflt")?,
        majflt: parse_at(f, 9, "majflt")?,
        cmajflt: parse_at(f, 10, "cmajflt")?,
        utime: parse_at(f, 11, "utime")?,
        stime: parse_at(f, 12, "stime")?,
        cutime: parse_at(f, 13, "cutime")?,
        cstime: parse_at(f, 14, "cstime")?,
        priority: parse_at(f, 15, "priority")?,
        nice: parse_at(f, 16, "nice")?,
        num_threads: parse_at(f, 17, "num_threads")?,
        itrealvalue: parse_at(f, 18, "itrealvalue")?,
        starttime: parse_at(f, 19, "starttime")?,
        vsize: parse_at(f, 20, "vsize")?,
        rss: parse_at(f, 21, "rss")?,
        rsslim: parse_at(f, 22, "rsslim")?,
        startcode: parse_at(f, 23, "startcode")?,
        endcode: parse_at(f, 24, "endcode")?,
        startstack: parse_at(f, 25, "startstack")?,
        kstkesp: parse_at(f, 26, "kstkesp")?,
        kstkeip: parse_at(f, 27, "kstkeip")?,
        signal: parse_at(f, 28, "signal")?,
        blocked: parse_at(f, 29, "blocked")?,
        sigignore: parse_at(f, 30, "sigignore")?,
        sigcatch: parse_at(f, 31, "sigcatch")?,
        wchan: parse_at(f, 32, "wchan")?,
        nswap: parse_at(f, 33, "nswap")?,
        cnswap: parse_at(f, 34, "cnswap")?,
        exit_signal: parse_at(f, 35, "exit_signal")?,
        processor: parse_at(f, 36, "processor")?,
        rt_priority: parse_at(f, 37, "rt_priority")?,
        policy: parse_at(f, 38, "policy")?,
        delayacct_blkio_ticks: parse_at(f, 39, "delayacct_blkio_ticks")?,
        guest_time: parse_at(f, 40, "guest_time")?,
        cguest_time: parse_at(f, 41, "cguest_time")?,
        start_data: parse_at(f, 42, "start_data")?,
        end_data: parse_at(f, 43, "end_data")?,
        start_brk: parse_at(f, 44, "start_brk")?,
        arg_start: parse_at(f, 45, "arg_start")?,
        arg_end: parse_at(f, 46, "arg_end")?,
        env_start: parse_at(f, 47, "env_start")?,
        env_end: parse_at(f, 48, "env_end")?,
        exit_code: parse_at(f, 49, "exit_code")?,
        ..ProcessSample::default()
    })
}

/// Parses `/proc/[pid]/io` content.
///
/// Format is key: value pairs, one per line. The three byte counters are
/// required; the character and syscall counters are ignored.
pub fn parse_proc_io(content: &str) -> Result<IoCounters, ParseError> {
    let mut read_bytes = None;
    let mut write_bytes = None;
    let mut cancelled_write_bytes = None;

    for line in content.lines() {
        if let Some((key, value)) = line.split_once(':') {
            let slot = match key.trim() {
                "read_bytes" => &mut read_bytes,
                "write_bytes" => &mut write_bytes,
                "cancelled_write_bytes" => &mut cancelled_write_bytes,
                _ => continue,
            };
            let value: u64 = value
                .trim()
                .parse()
                .map_err(|_| ParseError::new(format!("invalid {} in io", key.trim())))?;
            *slot = Some(value);
        }
    }

    let require = |v: Option<u64>, name: &str| {
        v.ok_or_else(|| ParseError::new(format!("missing {} in io", name)))
    };

    Ok(IoCounters {
        read_bytes: require(read_bytes, "read_bytes")?,
        write_bytes: require(write_bytes, "write_bytes")?,
        cancelled_write_bytes: require(cancelled_write_bytes, "cancelled_write_bytes")?,
    })
}

/// Parses the `IpExt` section of `/proc/[pid]/net/netstat`.
///
/// The section is a header line of names followed by a line of values, both
/// prefixed with `IpExt:`. Values are matched to names, not positions.
pub fn parse_netstat_ipext(content: &str) -> Result<NetworkCounters, ParseError> {
    let mut lines = content.lines().filter_map(|l| l.strip_prefix("IpExt:"));
    let header = lines
        .next()
        .ok_or_else(|| ParseError::new("missing IpExt header in netstat"))?;
    let values = lines
        .next()
        .ok_or_else(|| ParseError::new("missing IpExt values in netstat"))?;

    let mut in_octets = None;
    let mut out_octets = None;
    for (name, value) in header.split_whitespace().zip(values.split_whitespace()) {
        let slot = match name {
            "InOctets" => &mut in_octets,
            "OutOctets" => &mut out_octets,
            _ => continue,
        };
        *slot = Some(
            value
                .parse::<u64>()
                .map_err(|_| ParseError::new(format!("invalid {} in netstat", name)))?,
        );
    }

    Ok(NetworkCounters {
        in_octets: in_octets.ok_or_else(|| ParseError::new("missing InOctets in netstat"))?,
        out_octets: out_octets.ok_or_else(|| ParseError::new("missing OutOctets in netstat"))?,
    })
}

/// Parses `/proc/uptime`: uptime and aggregate idle time in seconds.
pub fn parse_uptime(content: &str) -> Result<(f64, f64), ParseError> {
    let mut parts = content.split_whitespace();
    let mut next = |name: &str| -> Result<f64, ParseError> {
        parts
            .next()
            .ok_or_else(|| ParseError::new(format!("missing {} in uptime", name)))?
            .parse()
            .map_err(|_| ParseError::new(format!("invalid {} in uptime", name)))
    };
    let uptime = next("uptime")?;
    let idle = next("idle time")?;
    Ok((uptime, idle))
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAT_BASH: &str = "1000 (bash) S 999 1000 1000 34816 1001 4194304 5000 50000 0 0 100 50 200 100 20 0 1 0 100000 25000000 2000 18446744073709551615 94000000000000 94000000900000 140730000000000 0 0 0 65536 3670020 1266777851 0 0 0 17 2 0 0 7 0 0 94000001000000 94000001100000 94000002000000 140730000001000 140730000001100 140730000001100 140730000002000 0";

    #[test]
    fn test_parse_proc_stat_basic() {
        let s = parse_proc_stat(STAT_BASH).unwrap();
        assert_eq!(s.pid, 1000);
        assert_eq!(s.command, "bash");
        assert_eq!(s.state, 'S');
        assert_eq!(s.ppid, 999);
        assert_eq!(s.tty_nr, 34816);
        assert_eq!(s.flags, 4194304);
        assert_eq!(s.utime, 100);
        assert_eq!(s.cutime, 200);
        assert_eq!(s.starttime, 100000);
        assert_eq!(s.rsslim, u64::MAX);
        assert_eq!(s.blocked, 65536);
        assert_eq!(s.exit_signal, 17);
        assert_eq!(s.processor, 2);
        assert_eq!(s.delayacct_blkio_ticks, 7);
        assert_eq!(s.env_end, 140730000002000);
        assert_eq!(s.exit_code, 0);
    }

    #[test]
    fn test_parse_proc_stat_name_with_spaces_and_parens() {
        let content = STAT_BASH.replace("(bash)", "(Web (Content))");
        let s = parse_proc_stat(&content).unwrap();
        assert_eq!(s.command, "Web (Content)");
        assert_eq!(s.state, 'S');
        assert_eq!(s.ppid, 999);
    }

    #[test]
    fn test_parse_proc_stat_truncated() {
        let err = parse_proc_stat("1 (init) S 0 1 1 0 -1").unwrap_err();
        assert!(err.message.contains("not enough fields"));
    }

    #[test]
    fn test_parse_proc_stat_invalid_number() {
        let content = STAT_BASH.replace(" 999 ", " x ");
        let err = parse_proc_stat(&content).unwrap_err();
        assert_eq!(err.message, "invalid ppid");
    }

    #[test]
    fn test_parse_proc_stat_missing_parens() {
        assert!(parse_proc_stat("1 init S 0").is_err());
        assert!(parse_proc_stat("1 )init( S 0").is_err());
    }

    #[test]
    fn test_parse_proc_io() {
        let io = parse_proc_io(
            "rchar: 1000\nwchar: 500\nsyscr: 100\nsyscw: 50\nread_bytes: 4096\nwrite_bytes: 2048\ncancelled_write_bytes: 512\n",
        )
        .unwrap();
        assert_eq!(io.read_bytes, 4096);
        assert_eq!(io.write_bytes, 2048);
        assert_eq!(io.cancelled_write_bytes, 512);
    }

    #[test]
    fn test_parse_proc_io_missing_counter() {
        let err = parse_proc_io("rchar: 1000\nread_bytes: 1\nwrite_bytes: 2\n").unwrap_err();
        assert!(err.message.contains("cancelled_write_bytes"));
    }

    #[test]
    fn test_parse_netstat_ipext() {
        let content = "\
TcpExt: SyncookiesSent SyncookiesRecv
TcpExt: 0 0
IpExt: InNoRoutes InTruncatedPkts InMcastPkts OutMcastPkts InBcastPkts OutBcastPkts InOctets OutOctets InMcastOctets
IpExt: 0 0 1000 500 5000 100 10000000000 5000000000 100000
";
        let net = parse_netstat_ipext(content).unwrap();
        assert_eq!(net.in_octets, 10_000_000_000);
        assert_eq!(net.out_octets, 5_000_000_000);
    }

    #[test]
    fn test_parse_netstat_without_ipext() {
        assert!(parse_netstat_ipext("TcpExt: A B\nTcpExt: 1 2\n").is_err());
        assert!(parse_netstat_ipext("IpExt: InOctets OutOctets\n").is_err());
    }

    #[test]
    fn test_parse_uptime() {
        assert_eq!(parse_uptime("12345.67 98765.43\n").unwrap(), (12345.67, 98765.43));
        assert!(parse_uptime("12345.67").is_err());
        assert!(parse_uptime("abc def").is_err());
    }
}
