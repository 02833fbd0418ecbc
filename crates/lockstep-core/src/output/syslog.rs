//! System log sink used by the low-rate channel.

use std::ffi::{CStr, CString};
use std::fmt;
use std::io;
use std::str::FromStr;

use super::sink::{Sink, SinkError};

const IDENT: &CStr = c"lockstep";

/// Syslog facility selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Facility {
    #[default]
    User,
    Daemon,
    Local(u8),
}

impl Facility {
    pub fn as_raw(&self) -> libc::c_int {
        match self {
            Facility::User => libc::LOG_USER,
            Facility::Daemon => libc::LOG_DAEMON,
            Facility::Local(0) => libc::LOG_LOCAL0,
            Facility::Local(1) => libc::LOG_LOCAL1,
            Facility::Local(2) => libc::LOG_LOCAL2,
            Facility::Local(3) => libc::LOG_LOCAL3,
            Facility::Local(4) => libc::LOG_LOCAL4,
            Facility::Local(5) => libc::LOG_LOCAL5,
            Facility::Local(6) => libc::LOG_LOCAL6,
            Facility::Local(_) => libc::LOG_LOCAL7,
        }
    }
}

impl FromStr for Facility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Facility::User),
            "daemon" => Ok(Facility::Daemon),
            _ => s
                .strip_prefix("local")
                .and_then(|n| n.parse::<u8>().ok())
                .filter(|n| *n <= 7)
                .map(Facility::Local)
                .ok_or_else(|| format!("unknown syslog facility '{}'", s)),
        }
    }
}

impl fmt::Display for Facility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Facility::User => write!(f, "user"),
            Facility::Daemon => write!(f, "daemon"),
            Facility::Local(n) => write!(f, "local{}", n),
        }
    }
}

/// Syslog severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    Emerg,
    Alert,
    Crit,
    Error,
    Warning,
    Notice,
    #[default]
    Info,
    Debug,
}

impl Priority {
    const NAMES: [(&'static str, Priority); 8] = [
        ("emerg", Priority::Emerg),
        ("alert", Priority::Alert),
        ("crit", Priority::Crit),
        ("err", Priority::Error),
        ("warning", Priority::Warning),
        ("notice", Priority::Notice),
        ("info", Priority::Info),
        ("debug", Priority::Debug),
    ];

    pub fn as_raw(&self) -> libc::c_int {
        match self {
            Priority::Emerg => libc::LOG_EMERG,
            Priority::Alert => libc::LOG_ALERT,
            Priority::Crit => libc::LOG_CRIT,
            Priority::Error => libc::LOG_ERR,
            Priority::Warning => libc::LOG_WARNING,
            Priority::Notice => libc::LOG_NOTICE,
            Priority::Info => libc::LOG_INFO,
            Priority::Debug => libc::LOG_DEBUG,
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::NAMES
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(_, p)| *p)
            .ok_or_else(|| format!("unknown syslog priority '{}'", s))
    }
}

/// Forwards records to the system log.
///
/// `openlog` state is process-wide, so only one instance should exist.
pub struct SyslogSink {
    name: String,
    level: libc::c_int,
}

impl SyslogSink {
    pub fn open(facility: Facility, priority: Priority) -> Self {
        // SAFETY: IDENT is a 'static C string, as openlog requires.
        unsafe { libc::openlog(IDENT.as_ptr(), libc::LOG_PID, facility.as_raw()) };
        Self {
            name: format!("syslog({})", facility),
            level: priority.as_raw() | facility.as_raw(),
        }
    }
}

impl Sink for SyslogSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write_record(&mut self, line: &str) -> Result<(), SinkError> {
        let message = CString::new(line.trim_end_matches('\n')).map_err(|e| {
            SinkError::Write(self.name.clone(), io::Error::new(io::ErrorKind::InvalidData, e))
        })?;
        // SAFETY: both pointers are valid NUL-terminated strings; the
        // record goes through "%s" so it is never read as a format.
        unsafe { libc::syslog(self.level, c"%s".as_ptr(), message.as_ptr()) };
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl Drop for SyslogSink {
    fn drop(&mut self) {
        // SAFETY: closelog has no preconditions.
        unsafe { libc::closelog() };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_facility() {
        assert_eq!("user".parse::<Facility>().unwrap(), Facility::User);
        assert_eq!("daemon".parse::<Facility>().unwrap(), Facility::Daemon);
        assert_eq!("local3".parse::<Facility>().unwrap(), Facility::Local(3));
        assert_eq!("local3".parse::<Facility>().unwrap().as_raw(), libc::LOG_LOCAL3);
        assert!("local8".parse::<Facility>().is_err());
        assert!("kern".parse::<Facility>().is_err());
    }

    #[test]
    fn test_parse_priority() {
        for (name, priority) in Priority::NAMES {
            assert_eq!(name.parse::<Priority>().unwrap(), priority);
        }
        assert_eq!(Priority::default(), Priority::Info);
        assert!("error".parse::<Priority>().is_err());
    }

    #[test]
    fn test_facility_display_round_trips() {
        for facility in [Facility::User, Facility::Daemon, Facility::Local(7)] {
            assert_eq!(facility.to_string().parse::<Facility>().unwrap(), facility);
        }
    }
}
