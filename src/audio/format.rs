//! Sample encoding description and the sizes derived from it.

use crate::error::{RecorderError, Result};
use serde::Serialize;
use std::fmt;

/// How each sample is stored on the wire.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// 8-bit PCM as delivered by the device.
    Pcm8,
    /// 16-bit signed little-endian PCM.
    Pcm16,
    /// 32-bit signed little-endian PCM.
    Pcm32,
    /// 32-bit IEEE-754 float in `-1.0..=1.0`.
    Float32,
}

impl Encoding {
    /// Resolve an encoding from bit depth and float flag. Only 32-bit samples
    /// may be floating point.
    pub fn from_bits(bits_per_sample: u16, is_float: bool) -> Result<Self> {
        match (bits_per_sample, is_float) {
            (8, false) => Ok(Encoding::Pcm8),
            (16, false) => Ok(Encoding::Pcm16),
            (32, false) => Ok(Encoding::Pcm32),
            (32, true) => Ok(Encoding::Float32),
            (bits, true) => Err(RecorderError::UnsupportedFormat(format!(
                "{bits}-bit float samples"
            ))),
            (bits, false) => Err(RecorderError::UnsupportedFormat(format!(
                "{bits}-bit integer samples"
            ))),
        }
    }

    pub fn bits_per_sample(self) -> u16 {
        match self {
            Encoding::Pcm8 => 8,
            Encoding::Pcm16 => 16,
            Encoding::Pcm32 | Encoding::Float32 => 32,
        }
    }

    pub fn bytes_per_sample(self) -> usize {
        usize::from(self.bits_per_sample() / 8)
    }

    pub fn is_float(self) -> bool {
        matches!(self, Encoding::Float32)
    }

    pub fn label(self) -> &'static str {
        match self {
            Encoding::Pcm8 => "pcm8",
            Encoding::Pcm16 => "pcm16",
            Encoding::Pcm32 => "pcm32",
            Encoding::Float32 => "float32",
        }
    }
}

/// Immutable description of the captured stream.
///
/// Construct through [`SampleFormat::new`] so zero rates and unsupported
/// channel layouts are rejected before any per-chunk arithmetic runs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SampleFormat {
    sample_rate: u32,
    channels: u16,
    encoding: Encoding,
}

impl SampleFormat {
    pub fn new(sample_rate: u32, channels: u16, encoding: Encoding) -> Result<Self> {
        if sample_rate == 0 {
            return Err(RecorderError::InvalidConfig(
                "sample rate must be greater than zero".to_string(),
            ));
        }
        if !matches!(channels, 1 | 2) {
            return Err(RecorderError::UnsupportedFormat(format!(
                "{channels} channels (only mono and stereo are supported)"
            )));
        }
        Ok(Self {
            sample_rate,
            channels,
            encoding,
        })
    }

    /// Convenience for the `{rate, channels, bits, float}` tuple devices report.
    pub fn from_parts(
        sample_rate: u32,
        channels: u16,
        bits_per_sample: u16,
        is_float: bool,
    ) -> Result<Self> {
        let encoding = Encoding::from_bits(bits_per_sample, is_float)?;
        Self::new(sample_rate, channels, encoding)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.encoding.bits_per_sample()
    }

    pub fn bytes_per_sample(&self) -> usize {
        self.encoding.bytes_per_sample()
    }

    pub fn is_float(&self) -> bool {
        self.encoding.is_float()
    }

    /// Bytes per frame (one sample per channel). Also the WAV block align.
    pub fn frame_bytes(&self) -> usize {
        self.bytes_per_sample() * usize::from(self.channels)
    }

    /// Payload bytes per second of audio.
    pub fn byte_rate(&self) -> u64 {
        self.frame_bytes() as u64 * u64::from(self.sample_rate)
    }

    /// Bytes covering `millis` of audio, rounded down.
    pub fn bytes_for_millis(&self, millis: u64) -> u64 {
        let bytes = u128::from(self.byte_rate()) * u128::from(millis) / 1000;
        u64::try_from(bytes).unwrap_or(u64::MAX)
    }

    /// Samples (across all channels) in a chunk lasting `millis`, at least one frame.
    pub fn samples_for_millis(&self, millis: u64) -> usize {
        let frames = (u64::from(self.sample_rate) * millis / 1000).max(1);
        frames as usize * usize::from(self.channels)
    }
}

impl Default for SampleFormat {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            channels: 1,
            encoding: Encoding::Pcm16,
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let layout = if self.channels == 1 { "mono" } else { "stereo" };
        write!(
            f,
            "{} Hz {} {}",
            self.sample_rate,
            layout,
            self.encoding.label()
        )
    }
}
