//! Elapsed-time bookkeeping.
//!
//! Time is tracked as an exact byte count and only converted to milliseconds
//! when read, so long recordings never accumulate rounding drift.

use super::format::SampleFormat;

/// Milliseconds covered by `bytes` of payload, as a fractional value.
pub fn chunk_duration_ms(bytes: u64, format: &SampleFormat) -> f64 {
    bytes as f64 * 1000.0 / format.byte_rate() as f64
}

/// Whole milliseconds covered by `bytes`, rounded down.
pub fn millis_for_bytes(bytes: u64, format: &SampleFormat) -> u64 {
    let millis = u128::from(bytes) * 1000 / u128::from(format.byte_rate());
    u64::try_from(millis).unwrap_or(u64::MAX)
}

/// Duration of a finished payload derived from its size alone.
///
/// Partial frames are ignored, matching what a player would decode.
pub fn duration_from_size(payload_bytes: u64, format: &SampleFormat) -> u64 {
    let total_samples =
        payload_bytes / format.bytes_per_sample() as u64 / u64::from(format.channels());
    total_samples * 1000 / u64::from(format.sample_rate())
}

/// Running total of written audio.
#[derive(Debug, Clone)]
pub struct DurationAccumulator {
    format: SampleFormat,
    total_bytes: u64,
}

impl DurationAccumulator {
    pub fn new(format: SampleFormat) -> Self {
        Self {
            format,
            total_bytes: 0,
        }
    }

    pub fn add_bytes(&mut self, bytes: usize) {
        self.total_bytes = self.total_bytes.saturating_add(bytes as u64);
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Elapsed whole milliseconds.
    pub fn millis(&self) -> u64 {
        millis_for_bytes(self.total_bytes, &self.format)
    }

    pub fn millis_f64(&self) -> f64 {
        chunk_duration_ms(self.total_bytes, &self.format)
    }

    pub fn reset(&mut self) {
        self.total_bytes = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::format::Encoding;

    #[test]
    fn one_chunk_of_pcm16_mono() {
        let format = SampleFormat::default();
        assert!((chunk_duration_ms(3_200, &format) - 100.0).abs() < f64::EPSILON);
        assert_eq!(millis_for_bytes(3_200, &format), 100);
    }

    #[test]
    fn accumulates_without_drift() {
        // 441 stereo float frames at 44.1 kHz is exactly 10 ms, a value that
        // repeated floating additions would smear.
        let format = SampleFormat::new(44_100, 2, Encoding::Float32).unwrap();
        let mut acc = DurationAccumulator::new(format);
        for _ in 0..360_000 {
            acc.add_bytes(441 * 8);
        }
        assert_eq!(acc.millis(), 3_600_000);
    }

    #[test]
    fn from_size_drops_partial_frames() {
        let format = SampleFormat::new(8_000, 2, Encoding::Pcm16).unwrap();
        assert_eq!(duration_from_size(32_000, &format), 1_000);
        assert_eq!(duration_from_size(32_003, &format), 1_000);
    }
}
