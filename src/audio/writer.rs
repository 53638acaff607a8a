//! Serializes chunks onto the append stream.

use super::chunk::Chunk;
use super::silence::LookBackBuffer;
use std::fmt;
use std::io::{self, Write};

/// Receives every byte sequence exactly as it was appended to the sink.
pub type RawChunkCallback = Box<dyn FnMut(&[u8]) + Send>;

/// Flushes retained and current chunks to the sink as one little-endian run.
///
/// Knows nothing about silence: it writes whatever it is handed.
pub struct StreamWriter<W: Write> {
    sink: W,
    on_raw_chunk: Option<RawChunkCallback>,
    scratch: Vec<u8>,
    bytes_written: u64,
}

impl<W: Write> StreamWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            on_raw_chunk: None,
            scratch: Vec::new(),
            bytes_written: 0,
        }
    }

    pub fn with_raw_chunk_callback(mut self, callback: RawChunkCallback) -> Self {
        self.on_raw_chunk = Some(callback);
        self
    }

    /// Append the look-back chunks (oldest first) followed by `current`, then
    /// clear the look-back buffer. Returns the number of bytes appended.
    pub fn write(&mut self, look_back: &mut LookBackBuffer, current: &Chunk) -> io::Result<usize> {
        self.scratch.clear();
        for retained in look_back.iter() {
            retained.extend_le_bytes(&mut self.scratch);
        }
        current.extend_le_bytes(&mut self.scratch);
        look_back.clear();

        self.sink.write_all(&self.scratch)?;
        self.bytes_written = self.bytes_written.saturating_add(self.scratch.len() as u64);
        if let Some(callback) = self.on_raw_chunk.as_mut() {
            callback(&self.scratch);
        }
        Ok(self.scratch.len())
    }

    /// Payload bytes appended so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }

    /// Flush and hand back the underlying stream.
    pub fn finish(mut self) -> io::Result<W> {
        self.sink.flush()?;
        Ok(self.sink)
    }
}

impl<W: Write> fmt::Debug for StreamWriter<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamWriter")
            .field("bytes_written", &self.bytes_written)
            .field("raw_chunk_callback", &self.on_raw_chunk.is_some())
            .finish()
    }
}
