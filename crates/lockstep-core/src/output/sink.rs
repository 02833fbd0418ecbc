//! Record sinks: anything that accepts rendered lines.

use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Error type for sink setup and writes.
#[derive(Debug)]
pub enum SinkError {
    /// Output file could not be opened.
    Open(PathBuf, io::Error),
    /// A record or flush could not be written.
    Write(String, io::Error),
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkError::Open(path, e) => write!(f, "failed to open {}: {}", path.display(), e),
            SinkError::Write(name, e) => write!(f, "failed to write to {}: {}", name, e),
        }
    }
}

impl std::error::Error for SinkError {}

/// Destination for rendered records.
///
/// `line` always ends with a newline. Sinks may buffer; `flush` is called
/// once at the end of every tick.
pub trait Sink {
    /// Human readable destination, for diagnostics.
    fn name(&self) -> &str;

    fn write_record(&mut self, line: &str) -> Result<(), SinkError>;

    fn flush(&mut self) -> Result<(), SinkError>;
}

/// Sink over any `Write` implementation.
pub struct WriterSink {
    name: String,
    writer: Box<dyn Write>,
}

impl WriterSink {
    pub fn new(name: impl Into<String>, writer: Box<dyn Write>) -> Self {
        Self {
            name: name.into(),
            writer,
        }
    }

    /// Standard output. Line buffered by the standard library, so records
    /// from two channels sharing stdout keep their emission order.
    pub fn stdout() -> Self {
        Self::new("stdout", Box::new(io::stdout()))
    }

    /// Opens `path` for appending, creating it with mode 0644.
    pub fn append(path: &Path) -> Result<Self, SinkError> {
        let file: File = OpenOptions::new()
            .create(true)
            .append(true)
            .mode(0o644)
            .open(path)
            .map_err(|e| SinkError::Open(path.to_path_buf(), e))?;
        Ok(Self::new(
            path.display().to_string(),
            Box::new(BufWriter::new(file)),
        ))
    }

    /// Standard output when `path` is `None`, otherwise an append-mode file.
    pub fn open(path: Option<&Path>) -> Result<Self, SinkError> {
        match path {
            Some(path) => Self::append(path),
            None => Ok(Self::stdout()),
        }
    }
}

impl Sink for WriterSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write_record(&mut self, line: &str) -> Result<(), SinkError> {
        self.writer
            .write_all(line.as_bytes())
            .map_err(|e| SinkError::Write(self.name.clone(), e))
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.writer
            .flush()
            .map_err(|e| SinkError::Write(self.name.clone(), e))
    }
}

/// In-memory sink; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Rc<RefCell<Vec<String>>>,
    flushes: Rc<RefCell<usize>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record written so far, newline included.
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    pub fn flush_count(&self) -> usize {
        *self.flushes.borrow()
    }
}

impl Sink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn write_record(&mut self, line: &str) -> Result<(), SinkError> {
        self.lines.borrow_mut().push(line.to_string());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        *self.flushes.borrow_mut() += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn test_append_creates_file_with_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.log");

        let mut sink = WriterSink::append(&path).unwrap();
        sink.write_record("1|bash\n").unwrap();
        sink.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "1|bash\n");
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        // umask can only clear bits
        assert_eq!(mode & !0o644, 0);
    }

    #[test]
    fn test_append_keeps_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.log");
        fs::write(&path, "old\n").unwrap();

        let mut sink = WriterSink::append(&path).unwrap();
        sink.write_record("new\n").unwrap();
        sink.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "old\nnew\n");
    }

    #[test]
    fn test_unopenable_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing/records.log");

        let err = WriterSink::append(&path).err().unwrap();
        assert!(matches!(err, SinkError::Open(ref p, _) if p == &path));
    }

    #[test]
    fn test_memory_sink_shares_buffer() {
        let probe = MemorySink::new();
        let mut sink = probe.clone();
        sink.write_record("a\n").unwrap();
        sink.flush().unwrap();

        assert_eq!(probe.lines(), vec!["a\n".to_string()]);
        assert_eq!(probe.flush_count(), 1);
    }
}
