//! Audio input boundary.
//!
//! The capture loop needs a format, a way to pull the next chunk, whether the
//! device is still delivering, and why it stopped if it failed. Anything
//! implementing [`CaptureDevice`] can feed a session.

#[cfg(feature = "device-cpal")]
mod cpal_device;
mod pcm_file;
mod scripted;

#[cfg(feature = "device-cpal")]
pub use cpal_device::CpalDevice;
pub use pcm_file::PcmFileDevice;
pub use scripted::{ScriptedDevice, ScriptedFeed};

use crate::audio::{Chunk, SampleFormat};
use crate::error::{RecorderError, Result};

/// Outcome of one read.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadStatus {
    Data(Chunk),
    /// Nothing arrived within the device's wait window.
    NoData,
    /// Transient failure reported by the device; the read is skipped.
    InvalidOperation(String),
}

pub trait CaptureDevice: Send {
    /// Format of every chunk this device produces.
    fn format(&self) -> SampleFormat;

    fn start(&mut self) -> Result<()>;

    /// Block until the next chunk is available or the wait window expires.
    fn read_chunk(&mut self) -> ReadStatus;

    /// False once the device stopped delivering, by request or on its own.
    fn is_recording(&self) -> bool;

    fn stop(&mut self);

    /// Failure that ended delivery, if any. Taken once the device stopped.
    fn take_error(&mut self) -> Option<RecorderError> {
        None
    }

    fn name(&self) -> String {
        "unknown_device".to_string()
    }
}

impl<D: CaptureDevice + ?Sized> CaptureDevice for Box<D> {
    fn format(&self) -> SampleFormat {
        (**self).format()
    }

    fn start(&mut self) -> Result<()> {
        (**self).start()
    }

    fn read_chunk(&mut self) -> ReadStatus {
        (**self).read_chunk()
    }

    fn is_recording(&self) -> bool {
        (**self).is_recording()
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn take_error(&mut self) -> Option<RecorderError> {
        (**self).take_error()
    }

    fn name(&self) -> String {
        (**self).name()
    }
}
