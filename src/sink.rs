//! Storage destinations for recordings.
//!
//! A sink hands out two capabilities: an append stream used by the capture
//! loop, and a seekable handle used once that stream is closed to patch the
//! header at offset 0.

use crate::lock_or_recover;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Write + Seek handle that can cross into the capture worker.
pub trait SeekWrite: Write + Seek + Send {}

impl<T: Write + Seek + Send> SeekWrite for T {}

pub trait AudioSink: Send + Sync + fmt::Debug {
    /// Start a fresh recording, discarding previous contents.
    fn open_append(&self) -> io::Result<Box<dyn Write + Send>>;

    /// Reopen the finished recording for the header patch.
    fn open_rewrite(&self) -> io::Result<Box<dyn SeekWrite>>;

    /// Bytes currently stored, header included.
    fn stored_len(&self) -> io::Result<u64>;

    /// Human-readable destination for logs and summaries.
    fn location(&self) -> String;
}

/// Path-backed sink.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AudioSink for FileSink {
    fn open_append(&self) -> io::Result<Box<dyn Write + Send>> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(&self.path)?;
        Ok(Box::new(BufWriter::new(file)))
    }

    fn open_rewrite(&self) -> io::Result<Box<dyn SeekWrite>> {
        let file = OpenOptions::new().write(true).open(&self.path)?;
        Ok(Box::new(file))
    }

    fn stored_len(&self) -> io::Result<u64> {
        Ok(fs::metadata(&self.path)?.len())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Provider-backed sink holding the recording in shared memory. Clones share
/// the same buffer, so a caller can keep one to read the result back.
#[derive(Clone, Default)]
pub struct MemorySink {
    label: String,
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            buffer: Arc::default(),
        }
    }

    pub fn contents(&self) -> Vec<u8> {
        lock_or_recover(&self.buffer, "MemorySink::contents").clone()
    }
}

impl fmt::Debug for MemorySink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySink")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl AudioSink for MemorySink {
    fn open_append(&self) -> io::Result<Box<dyn Write + Send>> {
        lock_or_recover(&self.buffer, "MemorySink::open_append").clear();
        Ok(Box::new(MemoryCursor {
            buffer: self.buffer.clone(),
            position: 0,
        }))
    }

    fn open_rewrite(&self) -> io::Result<Box<dyn SeekWrite>> {
        Ok(Box::new(MemoryCursor {
            buffer: self.buffer.clone(),
            position: 0,
        }))
    }

    fn stored_len(&self) -> io::Result<u64> {
        Ok(lock_or_recover(&self.buffer, "MemorySink::stored_len").len() as u64)
    }

    fn location(&self) -> String {
        format!("memory:{}", self.label)
    }
}

/// Overwrites at `position`, growing the buffer as needed.
struct MemoryCursor {
    buffer: Arc<Mutex<Vec<u8>>>,
    position: usize,
}

impl Write for MemoryCursor {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut data = lock_or_recover(&self.buffer, "MemoryCursor::write");
        let end = self.position + buf.len();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[self.position..end].copy_from_slice(buf);
        self.position = end;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for MemoryCursor {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let len = lock_or_recover(&self.buffer, "MemoryCursor::seek").len() as i128;
        let target = match pos {
            SeekFrom::Start(offset) => i128::from(offset),
            SeekFrom::End(offset) => len + i128::from(offset),
            SeekFrom::Current(offset) => self.position as i128 + i128::from(offset),
        };
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of buffer",
            ));
        }
        self.position = usize::try_from(target)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "seek out of range"))?;
        Ok(self.position as u64)
    }
}
