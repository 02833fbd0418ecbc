//! Per-process readers over `/proc/[pid]/`.
//!
//! Each method opens, reads and releases exactly one resource. None keeps
//! state between calls.

use std::io;
use std::path::{Path, PathBuf};

use crate::collector::procfs::parser::{
    parse_netstat_ipext, parse_proc_io, parse_proc_stat, parse_uptime,
};
use crate::collector::traits::{EntryMeta, FileSystem};
use crate::model::{IoCounters, NetworkCounters, ProcessSample};

/// Error type for a failed read of one process resource.
#[derive(Debug)]
pub enum CollectError {
    /// Process disappeared between enumeration and read.
    ProcessGone(u32),
    /// I/O error reading a present resource.
    Io(PathBuf, io::Error),
    /// Resource was read but its content is malformed.
    Parse(PathBuf, String),
}

impl std::fmt::Display for CollectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectError::ProcessGone(pid) => write!(f, "process {} disappeared", pid),
            CollectError::Io(path, e) => write!(f, "unable to read {}: {}", path.display(), e),
            CollectError::Parse(path, msg) => write!(f, "malformed {}: {}", path.display(), msg),
        }
    }
}

impl std::error::Error for CollectError {}

/// Reads the facets of a process sample from `/proc`.
pub struct ProcessReader<F: FileSystem> {
    fs: F,
    proc_path: PathBuf,
}

impl<F: FileSystem> ProcessReader<F> {
    /// Creates a reader rooted at `proc_path` (usually "/proc").
    pub fn new(fs: F, proc_path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
        }
    }

    pub fn fs(&self) -> &F {
        &self.fs
    }

    pub fn proc_path(&self) -> &Path {
        &self.proc_path
    }

    fn process_dir(&self, pid: u32) -> PathBuf {
        self.proc_path.join(pid.to_string())
    }

    /// Vanished processes surface as `NotFound` (or `ESRCH` on some files).
    fn io_error(pid: u32, path: PathBuf, e: io::Error) -> CollectError {
        if e.kind() == io::ErrorKind::NotFound || e.raw_os_error() == Some(libc::ESRCH) {
            CollectError::ProcessGone(pid)
        } else {
            CollectError::Io(path, e)
        }
    }

    fn read(&self, pid: u32, path: PathBuf) -> Result<(String, PathBuf), CollectError> {
        match self.fs.read_to_string(&path) {
            Ok(content) => Ok((content, path)),
            Err(e) => Err(Self::io_error(pid, path, e)),
        }
    }

    /// Type and owner of `/proc/[pid]`.
    pub fn entry_meta(&self, pid: u32) -> Result<EntryMeta, CollectError> {
        let path = self.process_dir(pid);
        self.fs
            .metadata(&path)
            .map_err(|e| Self::io_error(pid, path, e))
    }

    /// Reads `/proc/[pid]/stat` and resolves `/proc/[pid]/exe`.
    pub fn read_stat(&self, pid: u32) -> Result<ProcessSample, CollectError> {
        let (content, path) = self.read(pid, self.process_dir(pid).join("stat"))?;
        let mut sample =
            parse_proc_stat(&content).map_err(|e| CollectError::Parse(path, e.message))?;
        sample.executable = self.read_executable(pid)?;
        Ok(sample)
    }

    /// Resolves the executable path via the `exe` symlink.
    pub fn read_executable(&self, pid: u32) -> Result<String, CollectError> {
        let path = self.process_dir(pid).join("exe");
        match self.fs.read_link(&path) {
            Ok(target) => Ok(target.to_string_lossy().into_owned()),
            Err(e) => Err(Self::io_error(pid, path, e)),
        }
    }

    /// Reads `/proc/[pid]/io`.
    pub fn read_io(&self, pid: u32) -> Result<IoCounters, CollectError> {
        let (content, path) = self.read(pid, self.process_dir(pid).join("io"))?;
        parse_proc_io(&content).map_err(|e| CollectError::Parse(path, e.message))
    }

    /// Reads `/proc/[pid]/net/netstat`.
    pub fn read_network(&self, pid: u32) -> Result<NetworkCounters, CollectError> {
        let (content, path) = self.read(pid, self.process_dir(pid).join("net/netstat"))?;
        parse_netstat_ipext(&content).map_err(|e| CollectError::Parse(path, e.message))
    }

    /// Reads host uptime and idle time from `/proc/uptime`.
    pub fn read_uptime(&self) -> Result<(f64, f64), CollectError> {
        let path = self.proc_path.join("uptime");
        let content = self
            .fs
            .read_to_string(&path)
            .map_err(|e| CollectError::Io(path.clone(), e))?;
        parse_uptime(&content).map_err(|e| CollectError::Parse(path, e.message))
    }
}
