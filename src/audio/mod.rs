//! Streaming capture-to-WAV pipeline.
//!
//! Each device chunk is measured ([`amplitude`]), offered to the
//! [`SilenceGate`], and appended by the [`StreamWriter`] when the gate lets it
//! through. Elapsed time is tracked by [`DurationAccumulator`], and the
//! [`wav_header`] codec patches the final lengths onto the file at stop.

mod amplitude;
mod chunk;
mod duration;
mod format;
mod silence;
#[cfg(test)]
mod tests;
pub mod wav_header;
mod writer;

pub use amplitude::{amplitude, LiveAmplitude};
pub use chunk::{Chunk, PCM8_SILENCE};
pub use duration::{chunk_duration_ms, duration_from_size, millis_for_bytes, DurationAccumulator};
pub use format::{Encoding, SampleFormat};
pub use silence::{GateDecision, GateState, LookBackBuffer, SilenceDetectionConfig, SilenceGate};
pub use wav_header::{DecodedHeader, WAV_HEADER_LEN};
pub use writer::{RawChunkCallback, StreamWriter};
