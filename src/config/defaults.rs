pub const DEFAULT_OUTPUT_PATH: &str = "recording.wav";
pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;
pub const DEFAULT_CHANNELS: u16 = 1;
pub const DEFAULT_BITS_PER_SAMPLE: u16 = 16;
pub const DEFAULT_CHUNK_MS: u64 = 100;

pub const DEFAULT_SILENCE_THRESHOLD: i32 = 1_500;
pub const DEFAULT_PRE_SILENCE_MS: u64 = 2_000;
pub const DEFAULT_SILENCE_BUFFER_MS: u64 = 2_000;

pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = crate::session::DEFAULT_EVENT_CAPACITY;

pub(super) const MIN_SAMPLE_RATE: u32 = 4_000;
pub(super) const MAX_SAMPLE_RATE: u32 = 192_000;
pub(super) const MIN_CHUNK_MS: u64 = 5;
pub(super) const MAX_CHUNK_MS: u64 = 1_000;
pub(super) const MAX_SILENCE_BUFFER_MS: u64 = 60_000;
pub(super) const MAX_PRE_SILENCE_MS: u64 = 600_000;
pub(super) const MAX_SILENCE_THRESHOLD: i32 = 32_768;
pub(super) const MIN_EVENT_CHANNEL_CAPACITY: usize = 8;
pub(super) const MAX_EVENT_CHANNEL_CAPACITY: usize = 4_096;
pub(super) const MAX_RECORD_SECONDS: u64 = 86_400;
