//! Command-line parsing and validation helpers.

mod defaults;
#[cfg(test)]
mod tests;
mod validation;

use clap::{ArgAction, Parser};
use std::path::PathBuf;

pub use defaults::{
    DEFAULT_BITS_PER_SAMPLE, DEFAULT_CHANNELS, DEFAULT_CHUNK_MS, DEFAULT_EVENT_CHANNEL_CAPACITY,
    DEFAULT_OUTPUT_PATH, DEFAULT_PRE_SILENCE_MS, DEFAULT_SAMPLE_RATE, DEFAULT_SILENCE_BUFFER_MS,
    DEFAULT_SILENCE_THRESHOLD,
};

/// CLI options for wavrec. Validated values are safe to hand to the library.
#[derive(Debug, Parser, Clone)]
#[command(about = "Stream PCM audio to a WAV file with optional silence skipping", author, version)]
pub struct AppConfig {
    /// WAV file to write
    #[arg(short, long, env = "WAVREC_OUTPUT", default_value = DEFAULT_OUTPUT_PATH)]
    pub output: PathBuf,

    /// Record from a headerless little-endian PCM file instead of a microphone
    #[arg(long = "from-pcm", value_name = "PATH")]
    pub from_pcm: Option<PathBuf>,

    /// Stop after this many seconds (required for microphone capture)
    #[arg(long)]
    pub seconds: Option<u64>,

    /// Replay --from-pcm input at its real rate instead of as fast as possible
    #[arg(long, default_value_t = false)]
    pub realtime: bool,

    /// Preferred audio input device name
    #[arg(long)]
    pub input_device: Option<String>,

    /// Print detected audio input devices and exit
    #[arg(long = "list-input-devices", default_value_t = false)]
    pub list_input_devices: bool,

    /// Sample rate of --from-pcm input (Hz)
    #[arg(long = "sample-rate", default_value_t = DEFAULT_SAMPLE_RATE)]
    pub sample_rate: u32,

    /// Channel count of --from-pcm input (1 or 2)
    #[arg(long, default_value_t = DEFAULT_CHANNELS)]
    pub channels: u16,

    /// Bits per sample of --from-pcm input (8, 16 or 32)
    #[arg(long, default_value_t = DEFAULT_BITS_PER_SAMPLE)]
    pub bits: u16,

    /// Treat 32-bit --from-pcm input as IEEE float
    #[arg(long, default_value_t = false)]
    pub float: bool,

    /// Device transfer size (milliseconds of audio per chunk)
    #[arg(long = "chunk-ms", default_value_t = DEFAULT_CHUNK_MS)]
    pub chunk_ms: u64,

    /// Skip near-silent spans
    #[arg(long = "silence-detection", env = "WAVREC_SILENCE_DETECTION", default_value_t = false)]
    pub silence_detection: bool,

    /// Chunks quieter than this amplitude count as silence
    #[arg(long = "silence-threshold", default_value_t = DEFAULT_SILENCE_THRESHOLD)]
    pub silence_threshold: i32,

    /// Quiet audio kept before skipping starts (milliseconds)
    #[arg(long = "pre-silence-ms", default_value_t = DEFAULT_PRE_SILENCE_MS)]
    pub pre_silence_ms: u64,

    /// Skipped audio retained for replay when sound returns (milliseconds)
    #[arg(long = "silence-buffer-ms", default_value_t = DEFAULT_SILENCE_BUFFER_MS)]
    pub silence_buffer_ms: u64,

    /// Listener events queued between the capture and dispatch threads
    #[arg(long = "event-channel-capacity", default_value_t = DEFAULT_EVENT_CHANNEL_CAPACITY)]
    pub event_channel_capacity: usize,

    /// Print the recording summary as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Enable JSON trace logging to a file (see WAVREC_TRACE_LOG)
    #[arg(long = "logs", env = "WAVREC_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all logging (overrides --logs and --verbose)
    #[arg(long = "no-logs", env = "WAVREC_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Log to stderr; repeat for more detail
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}
