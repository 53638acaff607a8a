use super::defaults::{
    MAX_CHUNK_MS, MAX_EVENT_CHANNEL_CAPACITY, MAX_PRE_SILENCE_MS, MAX_RECORD_SECONDS,
    MAX_SAMPLE_RATE, MAX_SILENCE_BUFFER_MS, MAX_SILENCE_THRESHOLD, MIN_CHUNK_MS,
    MIN_EVENT_CHANNEL_CAPACITY, MIN_SAMPLE_RATE,
};
use super::AppConfig;
use crate::audio::{Encoding, SampleFormat, SilenceDetectionConfig};
use crate::session::SessionOptions;
use anyhow::{bail, Context, Result};
use clap::Parser;

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values before any device or file is touched.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.sample_rate) {
            bail!(
                "--sample-rate must be between {MIN_SAMPLE_RATE} and {MAX_SAMPLE_RATE} Hz, got {}",
                self.sample_rate
            );
        }
        if !matches!(self.channels, 1 | 2) {
            bail!("--channels must be 1 or 2, got {}", self.channels);
        }
        if !matches!(self.bits, 8 | 16 | 32) {
            bail!("--bits must be 8, 16 or 32, got {}", self.bits);
        }
        if self.float && self.bits != 32 {
            bail!("--float requires --bits 32, got {}", self.bits);
        }
        if !(MIN_CHUNK_MS..=MAX_CHUNK_MS).contains(&self.chunk_ms) {
            bail!(
                "--chunk-ms must be between {MIN_CHUNK_MS} and {MAX_CHUNK_MS}, got {}",
                self.chunk_ms
            );
        }
        if !(0..=MAX_SILENCE_THRESHOLD).contains(&self.silence_threshold) {
            bail!(
                "--silence-threshold must be between 0 and {MAX_SILENCE_THRESHOLD}, got {}",
                self.silence_threshold
            );
        }
        if self.pre_silence_ms > MAX_PRE_SILENCE_MS {
            bail!(
                "--pre-silence-ms must be at most {MAX_PRE_SILENCE_MS}, got {}",
                self.pre_silence_ms
            );
        }
        if self.silence_buffer_ms > MAX_SILENCE_BUFFER_MS {
            bail!(
                "--silence-buffer-ms must be at most {MAX_SILENCE_BUFFER_MS}, got {}",
                self.silence_buffer_ms
            );
        }
        if !(MIN_EVENT_CHANNEL_CAPACITY..=MAX_EVENT_CHANNEL_CAPACITY)
            .contains(&self.event_channel_capacity)
        {
            bail!(
                "--event-channel-capacity must be between {MIN_EVENT_CHANNEL_CAPACITY} and {MAX_EVENT_CHANNEL_CAPACITY}, got {}",
                self.event_channel_capacity
            );
        }
        if let Some(seconds) = self.seconds {
            if !(1..=MAX_RECORD_SECONDS).contains(&seconds) {
                bail!("--seconds must be between 1 and {MAX_RECORD_SECONDS}, got {seconds}");
            }
        }
        if self.from_pcm.is_none() && self.seconds.is_none() && !self.list_input_devices {
            bail!("--seconds is required when recording from a microphone");
        }
        if self.output.as_os_str().is_empty() {
            bail!("--output must not be empty");
        }
        Ok(())
    }

    /// Format of `--from-pcm` input.
    pub fn sample_format(&self) -> Result<SampleFormat> {
        let encoding = Encoding::from_bits(self.bits, self.float)
            .with_context(|| format!("--bits {} --float {}", self.bits, self.float))?;
        SampleFormat::new(self.sample_rate, self.channels, encoding)
            .context("invalid --sample-rate/--channels combination")
    }
}

impl From<&AppConfig> for SilenceDetectionConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            enabled: config.silence_detection,
            min_amplitude_threshold: config.silence_threshold,
            pre_silence_duration_ms: config.pre_silence_ms,
            buffer_duration_ms: config.silence_buffer_ms,
        }
    }
}

impl From<&AppConfig> for SessionOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            event_capacity: config.event_channel_capacity,
        }
    }
}
