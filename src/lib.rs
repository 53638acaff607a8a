pub mod audio;
pub mod config;
pub mod device;
pub mod error;
mod lock;
pub mod session;
pub mod sink;
pub mod telemetry;

pub(crate) use lock::lock_or_recover;

pub use audio::{Chunk, Encoding, SampleFormat, SilenceDetectionConfig};
pub use device::{CaptureDevice, PcmFileDevice, ReadStatus, ScriptedDevice, ScriptedFeed};
pub use error::{RecorderError, Result};
pub use session::{CaptureSession, RecorderState, RecordingSummary, SessionOptions};
pub use sink::{AudioSink, FileSink, MemorySink};
