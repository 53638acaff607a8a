//! Owned sample buffers handed over by the device, one per read.

use super::format::{Encoding, SampleFormat};
use crate::error::{RecorderError, Result};

/// Midpoint of unsigned 8-bit PCM, i.e. a zero-signal sample.
pub const PCM8_SILENCE: u8 = 0x80;

/// One device transfer worth of samples, interleaved across channels.
#[derive(Debug, Clone, PartialEq)]
pub enum Chunk {
    Pcm8(Vec<u8>),
    Pcm16(Vec<i16>),
    Pcm32(Vec<i32>),
    Float32(Vec<f32>),
}

impl Chunk {
    pub fn encoding(&self) -> Encoding {
        match self {
            Chunk::Pcm8(_) => Encoding::Pcm8,
            Chunk::Pcm16(_) => Encoding::Pcm16,
            Chunk::Pcm32(_) => Encoding::Pcm32,
            Chunk::Float32(_) => Encoding::Float32,
        }
    }

    /// Number of samples across all channels.
    pub fn sample_len(&self) -> usize {
        match self {
            Chunk::Pcm8(samples) => samples.len(),
            Chunk::Pcm16(samples) => samples.len(),
            Chunk::Pcm32(samples) => samples.len(),
            Chunk::Float32(samples) => samples.len(),
        }
    }

    /// Size of the chunk once serialized.
    pub fn byte_len(&self) -> usize {
        self.sample_len() * self.encoding().bytes_per_sample()
    }

    pub fn is_empty(&self) -> bool {
        self.sample_len() == 0
    }

    /// A zero-signal chunk of `samples` samples in the given encoding.
    pub fn silence(encoding: Encoding, samples: usize) -> Self {
        match encoding {
            Encoding::Pcm8 => Chunk::Pcm8(vec![PCM8_SILENCE; samples]),
            Encoding::Pcm16 => Chunk::Pcm16(vec![0; samples]),
            Encoding::Pcm32 => Chunk::Pcm32(vec![0; samples]),
            Encoding::Float32 => Chunk::Float32(vec![0.0; samples]),
        }
    }

    /// Decode a raw little-endian device buffer. The buffer must hold a whole
    /// number of samples.
    pub fn from_le_bytes(bytes: &[u8], encoding: Encoding) -> Result<Self> {
        let width = encoding.bytes_per_sample();
        if bytes.len() % width != 0 {
            return Err(RecorderError::UnsupportedFormat(format!(
                "{} bytes is not a whole number of {}-byte {} samples",
                bytes.len(),
                width,
                encoding.label()
            )));
        }
        let chunk = match encoding {
            Encoding::Pcm8 => Chunk::Pcm8(bytes.to_vec()),
            Encoding::Pcm16 => Chunk::Pcm16(
                bytes
                    .chunks_exact(2)
                    .map(|b| i16::from_le_bytes([b[0], b[1]]))
                    .collect(),
            ),
            Encoding::Pcm32 => Chunk::Pcm32(
                bytes
                    .chunks_exact(4)
                    .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                    .collect(),
            ),
            Encoding::Float32 => Chunk::Float32(
                bytes
                    .chunks_exact(4)
                    .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                    .collect(),
            ),
        };
        Ok(chunk)
    }

    /// Append the little-endian serialization of every sample to `out`.
    pub fn extend_le_bytes(&self, out: &mut Vec<u8>) {
        out.reserve(self.byte_len());
        match self {
            Chunk::Pcm8(samples) => out.extend_from_slice(samples),
            Chunk::Pcm16(samples) => {
                for sample in samples {
                    out.extend_from_slice(&sample.to_le_bytes());
                }
            }
            Chunk::Pcm32(samples) => {
                for sample in samples {
                    out.extend_from_slice(&sample.to_le_bytes());
                }
            }
            Chunk::Float32(samples) => {
                for sample in samples {
                    out.extend_from_slice(&sample.to_le_bytes());
                }
            }
        }
    }

    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.byte_len());
        self.extend_le_bytes(&mut out);
        out
    }

    /// Fail when the chunk was produced for a different encoding than the session's.
    pub fn ensure_matches(&self, format: &SampleFormat) -> Result<()> {
        if self.encoding() == format.encoding() {
            Ok(())
        } else {
            Err(RecorderError::UnsupportedFormat(format!(
                "{} chunk delivered to a {} session",
                self.encoding().label(),
                format.encoding().label()
            )))
        }
    }
}
