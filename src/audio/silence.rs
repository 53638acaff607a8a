//! Online silence skipping with a bounded look-back buffer.
//!
//! Quiet chunks are tolerated for a grace period, then dropped. The most recent
//! dropped chunks are retained so that when sound returns a short pre-roll is
//! written ahead of it instead of a hard cut.

use super::chunk::Chunk;
use super::format::SampleFormat;
use serde::Serialize;
use std::collections::VecDeque;

/// Tuning for the silence gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SilenceDetectionConfig {
    pub enabled: bool,
    /// Chunks whose amplitude falls below this are quiet.
    pub min_amplitude_threshold: i32,
    /// Quiet audio tolerated before skipping starts.
    pub pre_silence_duration_ms: u64,
    /// Budget of skipped audio kept for replay.
    pub buffer_duration_ms: u64,
}

impl Default for SilenceDetectionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_amplitude_threshold: 1_500,
            pre_silence_duration_ms: 2_000,
            buffer_duration_ms: 2_000,
        }
    }
}

/// FIFO of retained chunks, bounded by a byte budget.
#[derive(Debug, Default)]
pub struct LookBackBuffer {
    chunks: VecDeque<Chunk>,
    total_bytes: usize,
    budget_bytes: usize,
}

impl LookBackBuffer {
    pub fn with_budget(budget_bytes: usize) -> Self {
        Self {
            chunks: VecDeque::new(),
            total_bytes: 0,
            budget_bytes,
        }
    }

    /// Retain `chunk`, evicting the oldest entries until the budget holds.
    pub fn push(&mut self, chunk: Chunk) {
        self.total_bytes = self.total_bytes.saturating_add(chunk.byte_len());
        self.chunks.push_back(chunk);
        while self.total_bytes > self.budget_bytes {
            match self.chunks.pop_front() {
                Some(evicted) => {
                    self.total_bytes = self.total_bytes.saturating_sub(evicted.byte_len());
                }
                None => break,
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    pub fn budget_bytes(&self) -> usize {
        self.budget_bytes
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
        self.total_bytes = 0;
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GateState {
    Loud,
    Skipping,
}

/// What the caller should do with the chunk it just offered.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Write it, after replaying whatever the look-back buffer holds.
    Write,
    /// Drop it. `entered` is set on the chunk that started the skip.
    Skip { entered: bool },
}

/// Per-chunk silence state machine.
#[derive(Debug)]
pub struct SilenceGate {
    config: SilenceDetectionConfig,
    format: SampleFormat,
    state: GateState,
    silent_bytes: u64,
    look_back: LookBackBuffer,
}

impl SilenceGate {
    pub fn new(config: SilenceDetectionConfig, format: SampleFormat) -> Self {
        let budget = format.bytes_for_millis(config.buffer_duration_ms);
        Self {
            config,
            format,
            state: GateState::Loud,
            silent_bytes: 0,
            look_back: LookBackBuffer::with_budget(usize::try_from(budget).unwrap_or(usize::MAX)),
        }
    }

    pub fn config(&self) -> &SilenceDetectionConfig {
        &self.config
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    /// Whole milliseconds of consecutive quiet audio seen so far.
    pub fn silence_ms(&self) -> u64 {
        super::duration::millis_for_bytes(self.silent_bytes, &self.format)
    }

    /// Classify `chunk`. A quiet chunk that arrives after the grace period is
    /// retained in the look-back buffer and must not be written by the caller.
    pub fn observe(&mut self, amplitude: i32, chunk: &Chunk) -> GateDecision {
        if !self.config.enabled {
            return GateDecision::Write;
        }
        if amplitude >= self.config.min_amplitude_threshold {
            self.silent_bytes = 0;
            self.state = GateState::Loud;
            return GateDecision::Write;
        }

        self.silent_bytes = self.silent_bytes.saturating_add(chunk.byte_len() as u64);
        if !self.grace_period_elapsed() {
            return GateDecision::Write;
        }
        let entered = self.state != GateState::Skipping;
        if entered {
            tracing::debug!(silence_ms = self.silence_ms(), "entering silence skip");
        }
        self.state = GateState::Skipping;
        self.look_back.push(chunk.clone());
        GateDecision::Skip { entered }
    }

    /// Compared in bytes so a zero grace period needs no special case.
    fn grace_period_elapsed(&self) -> bool {
        u128::from(self.silent_bytes) * 1000
            >= u128::from(self.config.pre_silence_duration_ms) * u128::from(self.format.byte_rate())
    }

    pub fn look_back(&self) -> &LookBackBuffer {
        &self.look_back
    }

    /// Buffer handed to the writer for replay; the writer clears it.
    pub fn look_back_mut(&mut self) -> &mut LookBackBuffer {
        &mut self.look_back
    }

    /// Forget the current quiet streak. Retained chunks stay queued for replay.
    pub fn reset(&mut self) {
        self.silent_bytes = 0;
        self.state = GateState::Loud;
    }
}
