//! In-memory mock filesystem for testing readers without real `/proc`.

use crate::collector::traits::{EntryMeta, FileSystem};
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

/// In-memory filesystem for testing.
///
/// Stores files, directories, symlinks and ownership in memory, so tests can
/// simulate `/proc` and `/sys` states, including processes that vanish
/// between enumeration and read.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    /// Map from path to file contents.
    files: HashMap<PathBuf, String>,
    /// Set of directories (for read_dir support).
    directories: HashSet<PathBuf>,
    /// Symlink targets.
    links: HashMap<PathBuf, PathBuf>,
    /// (uid, gid) per path; missing entries are owned by root.
    owners: HashMap<PathBuf, (u32, u32)>,
}

impl MockFs {
    /// Creates a new empty mock filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    fn add_parents(&mut self, path: &Path) {
        let mut parent = path.parent();
        while let Some(p) = parent {
            if !p.as_os_str().is_empty() {
                self.directories.insert(p.to_path_buf());
            }
            parent = p.parent();
        }
    }

    /// Adds a file with the given content.
    ///
    /// Parent directories are automatically created.
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.files.insert(path, content.into());
    }

    /// Adds an empty directory.
    pub fn add_dir(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.directories.insert(path);
    }

    /// Adds a symlink pointing at `target`.
    pub fn add_link(&mut self, path: impl AsRef<Path>, target: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.links.insert(path, target.as_ref().to_path_buf());
    }

    /// Sets the owner reported by `metadata` for `path`.
    pub fn set_owner(&mut self, path: impl AsRef<Path>, uid: u32, gid: u32) {
        self.owners.insert(path.as_ref().to_path_buf(), (uid, gid));
    }

    /// Removes a file, simulating a resource that vanished.
    pub fn remove_file(&mut self, path: impl AsRef<Path>) {
        self.files.remove(path.as_ref());
    }

    /// Adds a process with the `/proc/[pid]/` files the readers consume.
    ///
    /// # Arguments
    /// * `pid` - Process ID
    /// * `uid` - Owner of the `/proc/[pid]` directory
    /// * `stat` - Content of `/proc/[pid]/stat`
    /// * `io` - Content of `/proc/[pid]/io` (skipped if empty)
    /// * `netstat` - Content of `/proc/[pid]/net/netstat` (skipped if empty)
    /// * `exe` - Target of `/proc/[pid]/exe` (skipped if empty)
    pub fn add_process(
        &mut self,
        pid: u32,
        uid: u32,
        stat: &str,
        io: &str,
        netstat: &str,
        exe: &str,
    ) {
        let base = PathBuf::from(format!("/proc/{}", pid));
        self.add_dir(&base);
        self.set_owner(&base, uid, uid);
        self.add_file(base.join("stat"), stat);
        if !io.is_empty() {
            self.add_file(base.join("io"), io);
        }
        if !netstat.is_empty() {
            self.add_file(base.join("net/netstat"), netstat);
        }
        if !exe.is_empty() {
            self.add_link(base.join("exe"), exe);
        }
    }

    fn not_found(path: &Path) -> io::Error {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("not found: {:?}", path),
        )
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| Self::not_found(path))
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        if !self.directories.contains(path) {
            return Err(Self::not_found(path));
        }

        let mut entries = HashSet::new();

        // Find all files, links and directories that are direct children
        let children = self
            .files
            .keys()
            .chain(self.links.keys())
            .chain(self.directories.iter());
        for child in children {
            if child != path && child.parent().is_some_and(|parent| parent == path) {
                entries.insert(child.clone());
            }
        }

        let mut entries: Vec<PathBuf> = entries.into_iter().collect();
        entries.sort();
        Ok(entries)
    }

    fn metadata(&self, path: &Path) -> io::Result<EntryMeta> {
        let is_dir = if self.directories.contains(path) {
            true
        } else if self.files.contains_key(path) {
            false
        } else {
            return Err(Self::not_found(path));
        };
        let (uid, gid) = self.owners.get(path).copied().unwrap_or((0, 0));
        Ok(EntryMeta { is_dir, uid, gid })
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        self.links
            .get(path)
            .cloned()
            .ok_or_else(|| Self::not_found(path))
    }
}
