use super::{CaptureDevice, ReadStatus};
use crate::audio::{Chunk, SampleFormat};
use crate::error::{RecorderError, Result};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_POLL_MS: u64 = 10;

/// In-memory device fed through a [`ScriptedFeed`].
///
/// Stays recording until every feed handle is dropped and the queue drains,
/// which models a device that stops on its own.
pub struct ScriptedDevice {
    format: SampleFormat,
    receiver: Receiver<Scripted>,
    reads: Arc<AtomicUsize>,
    poll: Duration,
    started: bool,
    exhausted: bool,
    failure: Option<String>,
}

enum Scripted {
    Status(ReadStatus),
    Fail(String),
}

/// Producer side of a [`ScriptedDevice`].
#[derive(Clone)]
pub struct ScriptedFeed {
    sender: Sender<Scripted>,
    reads: Arc<AtomicUsize>,
}

impl ScriptedDevice {
    pub fn new(format: SampleFormat) -> (Self, ScriptedFeed) {
        let (sender, receiver) = unbounded();
        let reads = Arc::new(AtomicUsize::new(0));
        let device = Self {
            format,
            receiver,
            reads: reads.clone(),
            poll: Duration::from_millis(DEFAULT_POLL_MS),
            started: false,
            exhausted: false,
            failure: None,
        };
        (device, ScriptedFeed { sender, reads })
    }

    /// Device that delivers `chunks` in order and then stops.
    pub fn from_chunks(format: SampleFormat, chunks: impl IntoIterator<Item = Chunk>) -> Self {
        let (device, feed) = Self::new(format);
        for chunk in chunks {
            feed.push(chunk);
        }
        device
    }

    pub fn with_poll_interval(mut self, poll: Duration) -> Self {
        self.poll = poll;
        self
    }
}

impl ScriptedFeed {
    pub fn push(&self, chunk: Chunk) {
        let _ = self.sender.send(Scripted::Status(ReadStatus::Data(chunk)));
    }

    pub fn push_status(&self, status: ReadStatus) {
        let _ = self.sender.send(Scripted::Status(status));
    }

    /// Make the device fail for good once it reaches this point.
    pub fn fail(&self, reason: impl Into<String>) {
        let _ = self.sender.send(Scripted::Fail(reason.into()));
    }

    /// Statuses the device has handed out so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl CaptureDevice for ScriptedDevice {
    fn format(&self) -> SampleFormat {
        self.format
    }

    fn start(&mut self) -> Result<()> {
        self.started = true;
        Ok(())
    }

    fn read_chunk(&mut self) -> ReadStatus {
        match self.receiver.recv_timeout(self.poll) {
            Ok(Scripted::Status(status)) => {
                self.reads.fetch_add(1, Ordering::SeqCst);
                status
            }
            Ok(Scripted::Fail(reason)) => {
                self.reads.fetch_add(1, Ordering::SeqCst);
                self.exhausted = true;
                self.failure = Some(reason.clone());
                ReadStatus::InvalidOperation(reason)
            }
            Err(RecvTimeoutError::Timeout) => ReadStatus::NoData,
            Err(RecvTimeoutError::Disconnected) => {
                self.exhausted = true;
                ReadStatus::NoData
            }
        }
    }

    fn is_recording(&self) -> bool {
        self.started && !self.exhausted
    }

    fn stop(&mut self) {
        self.started = false;
    }

    fn take_error(&mut self) -> Option<RecorderError> {
        self.failure.take().map(RecorderError::DeviceRead)
    }

    fn name(&self) -> String {
        "scripted".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivers_in_order_then_stops() {
        let mut device = ScriptedDevice::from_chunks(
            SampleFormat::default(),
            vec![Chunk::Pcm16(vec![1]), Chunk::Pcm16(vec![2])],
        );
        assert!(!device.is_recording());
        device.start().unwrap();
        assert_eq!(device.read_chunk(), ReadStatus::Data(Chunk::Pcm16(vec![1])));
        assert_eq!(device.read_chunk(), ReadStatus::Data(Chunk::Pcm16(vec![2])));
        assert!(device.is_recording());
        assert_eq!(device.read_chunk(), ReadStatus::NoData);
        assert!(!device.is_recording());
    }

    #[test]
    fn live_feed_reports_no_data_while_idle() {
        let (device, feed) = ScriptedDevice::new(SampleFormat::default());
        let mut device = device.with_poll_interval(Duration::from_millis(1));
        device.start().unwrap();
        assert_eq!(device.read_chunk(), ReadStatus::NoData);
        assert!(device.is_recording());
        feed.push_status(ReadStatus::InvalidOperation("glitch".into()));
        assert!(matches!(device.read_chunk(), ReadStatus::InvalidOperation(_)));
        assert_eq!(feed.reads(), 1);
    }

    #[test]
    fn failure_stops_delivery_and_is_reported_once() {
        let (device, feed) = ScriptedDevice::new(SampleFormat::default());
        let mut device = device.with_poll_interval(Duration::from_millis(1));
        device.start().unwrap();
        feed.fail("unplugged");
        assert!(matches!(device.read_chunk(), ReadStatus::InvalidOperation(_)));
        assert!(!device.is_recording());
        assert!(matches!(
            device.take_error(),
            Some(RecorderError::DeviceRead(reason)) if reason == "unplugged"
        ));
        assert!(device.take_error().is_none());
    }
}
