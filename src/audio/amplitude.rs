//! Per-chunk loudness, expressed on a 16-bit scale regardless of encoding.

use super::chunk::Chunk;
use super::format::SampleFormat;
use crate::error::Result;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

/// 8-bit PCM spans 0..=255 once rebased; it is stretched onto 0..=32767.
const PCM8_RANGE: f64 = 255.0;
const PCM16_MAX: f64 = 32_767.0;
const FULL_SCALE: f64 = 32_768.0;

/// Loudness of one chunk. Pure; the chunk must match `format`.
///
/// - 8-bit: mean of the device bytes (two's complement) rebased by +128, scaled.
/// - 16-bit: largest absolute sample.
/// - 32-bit: largest sample normalized by `i32::MAX`, scaled.
/// - float: largest sample scaled.
///
/// Empty chunks report 0.
pub fn amplitude(chunk: &Chunk, format: &SampleFormat) -> Result<i32> {
    chunk.ensure_matches(format)?;
    if chunk.is_empty() {
        return Ok(0);
    }
    let value = match chunk {
        Chunk::Pcm8(samples) => {
            let sum: i64 = samples.iter().map(|&b| i64::from(b as i8)).sum();
            let mean = sum as f64 / samples.len() as f64;
            ((mean + 128.0) * PCM16_MAX / PCM8_RANGE) as i32
        }
        Chunk::Pcm16(samples) => samples
            .iter()
            .map(|&s| i32::from(s).abs())
            .max()
            .unwrap_or(0),
        Chunk::Pcm32(samples) => {
            let max = samples.iter().copied().max().unwrap_or(0);
            (f64::from(max) / f64::from(i32::MAX) * FULL_SCALE) as i32
        }
        Chunk::Float32(samples) => {
            let max = samples.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            if max.is_finite() {
                (f64::from(max) * FULL_SCALE) as i32
            } else {
                0
            }
        }
    };
    Ok(value)
}

/// Latest amplitude published by the capture loop, readable from any thread.
#[derive(Clone, Debug, Default)]
pub struct LiveAmplitude {
    level: Arc<AtomicI32>,
}

impl LiveAmplitude {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, amplitude: i32) {
        self.level.store(amplitude, Ordering::Relaxed);
    }

    pub fn get(&self) -> i32 {
        self.level.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::format::Encoding;
    use crate::error::RecorderError;

    fn format(encoding: Encoding) -> SampleFormat {
        SampleFormat::new(16_000, 1, encoding).unwrap()
    }

    #[test]
    fn pcm16_takes_largest_magnitude() {
        let chunk = Chunk::Pcm16(vec![100, -2_000, 1_500]);
        assert_eq!(amplitude(&chunk, &format(Encoding::Pcm16)).unwrap(), 2_000);
    }

    #[test]
    fn pcm16_min_value_does_not_overflow() {
        let chunk = Chunk::Pcm16(vec![i16::MIN]);
        assert_eq!(amplitude(&chunk, &format(Encoding::Pcm16)).unwrap(), 32_768);
    }

    #[test]
    fn pcm32_full_scale_maps_to_16_bit_range() {
        let chunk = Chunk::Pcm32(vec![0, i32::MAX]);
        assert_eq!(amplitude(&chunk, &format(Encoding::Pcm32)).unwrap(), 32_768);
        let half = Chunk::Pcm32(vec![i32::MAX / 2]);
        assert_eq!(amplitude(&half, &format(Encoding::Pcm32)).unwrap(), 16_383);
    }

    #[test]
    fn float_scales_peak() {
        let chunk = Chunk::Float32(vec![-0.9, 0.25, 0.5]);
        assert_eq!(amplitude(&chunk, &format(Encoding::Float32)).unwrap(), 16_384);
    }

    #[test]
    fn pcm8_rebases_mean() {
        // 0x00 reads as 0 and rebases to 128: the midpoint of the 16-bit scale.
        let chunk = Chunk::Pcm8(vec![0x00; 4]);
        assert_eq!(amplitude(&chunk, &format(Encoding::Pcm8)).unwrap(), 16_447);
        let loud = Chunk::Pcm8(vec![0x7f; 4]);
        assert_eq!(amplitude(&loud, &format(Encoding::Pcm8)).unwrap(), 32_767);
    }

    #[test]
    fn empty_chunk_is_zero() {
        assert_eq!(
            amplitude(&Chunk::Float32(Vec::new()), &format(Encoding::Float32)).unwrap(),
            0
        );
    }

    #[test]
    fn mismatched_chunk_is_rejected() {
        let err = amplitude(&Chunk::Pcm8(vec![1]), &format(Encoding::Pcm16)).unwrap_err();
        assert!(matches!(err, RecorderError::UnsupportedFormat(_)));
    }

    #[test]
    fn live_amplitude_shares_level() {
        let meter = LiveAmplitude::new();
        let reader = meter.clone();
        meter.set(1_234);
        assert_eq!(reader.get(), 1_234);
    }
}
