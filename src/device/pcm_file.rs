use super::{CaptureDevice, ReadStatus};
use crate::audio::{Chunk, SampleFormat};
use crate::error::{RecorderError, Result};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Replays a headerless little-endian PCM file as if it were a live input.
///
/// Used for offline runs and benchmarks where no microphone is available. A
/// trailing partial frame is dropped.
pub struct PcmFileDevice {
    path: PathBuf,
    format: SampleFormat,
    chunk_bytes: usize,
    realtime: bool,
    reader: Option<BufReader<File>>,
    next_deadline: Option<Instant>,
    recording: bool,
    failure: Option<String>,
}

impl PcmFileDevice {
    pub fn new(path: impl AsRef<Path>, format: SampleFormat, chunk_ms: u64) -> Self {
        let chunk_bytes = format.samples_for_millis(chunk_ms) * format.bytes_per_sample();
        Self {
            path: path.as_ref().to_path_buf(),
            format,
            chunk_bytes,
            realtime: false,
            reader: None,
            next_deadline: None,
            recording: false,
            failure: None,
        }
    }

    /// Pace reads at the stream's real rate instead of as fast as possible.
    pub fn realtime(mut self, enabled: bool) -> Self {
        self.realtime = enabled;
        self
    }

    fn pace(&mut self, bytes: usize) {
        if !self.realtime {
            return;
        }
        let chunk = Duration::from_secs_f64(bytes as f64 / self.format.byte_rate() as f64);
        let deadline = self.next_deadline.unwrap_or_else(Instant::now) + chunk;
        if let Some(wait) = deadline.checked_duration_since(Instant::now()) {
            std::thread::sleep(wait);
        }
        self.next_deadline = Some(deadline);
    }

    fn fill(&mut self) -> std::io::Result<Vec<u8>> {
        let mut buf = vec![0u8; self.chunk_bytes];
        let mut filled = 0;
        let Some(reader) = self.reader.as_mut() else {
            return Ok(Vec::new());
        };
        while filled < buf.len() {
            match reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
        let whole_frames = filled - filled % self.format.frame_bytes();
        buf.truncate(whole_frames);
        Ok(buf)
    }
}

impl CaptureDevice for PcmFileDevice {
    fn format(&self) -> SampleFormat {
        self.format
    }

    fn start(&mut self) -> Result<()> {
        let file = File::open(&self.path).map_err(|err| {
            RecorderError::DeviceRead(format!("cannot open {}: {err}", self.path.display()))
        })?;
        self.reader = Some(BufReader::new(file));
        self.next_deadline = None;
        self.recording = true;
        self.failure = None;
        Ok(())
    }

    fn read_chunk(&mut self) -> ReadStatus {
        match self.fill() {
            Ok(bytes) if bytes.is_empty() => {
                self.recording = false;
                ReadStatus::NoData
            }
            Ok(bytes) => {
                self.pace(bytes.len());
                match Chunk::from_le_bytes(&bytes, self.format.encoding()) {
                    Ok(chunk) => ReadStatus::Data(chunk),
                    Err(err) => ReadStatus::InvalidOperation(err.to_string()),
                }
            }
            Err(err) => {
                self.recording = false;
                self.failure = Some(format!("read from {} failed: {err}", self.path.display()));
                ReadStatus::InvalidOperation(err.to_string())
            }
        }
    }

    fn is_recording(&self) -> bool {
        self.recording
    }

    fn stop(&mut self) {
        self.recording = false;
        self.reader = None;
    }

    fn take_error(&mut self) -> Option<RecorderError> {
        self.failure.take().map(RecorderError::DeviceRead)
    }

    fn name(&self) -> String {
        format!("pcm_file:{}", self.path.display())
    }
}
