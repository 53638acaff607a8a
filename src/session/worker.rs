use super::events::{EventSender, RecorderEvent};
use super::{RecorderState, RecordingSummary, SessionFlags, CONTROL_EVENT_BUDGET};
use crate::audio::{
    amplitude, duration_from_size, wav_header, Chunk, DurationAccumulator, GateDecision,
    LiveAmplitude, SampleFormat, SilenceDetectionConfig, SilenceGate, StreamWriter,
    WAV_HEADER_LEN,
};
use crate::device::{CaptureDevice, ReadStatus};
use crate::error::{RecorderError, Result};
use crate::sink::AudioSink;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

type SinkStream = Box<dyn Write + Send>;

/// Everything the capture thread owns while a recording runs.
pub(super) struct CaptureWorker {
    device: Box<dyn CaptureDevice>,
    sink: Arc<dyn AudioSink>,
    format: SampleFormat,
    gate: SilenceGate,
    elapsed: DurationAccumulator,
    flags: Arc<SessionFlags>,
    events: EventSender,
    meter: LiveAmplitude,
    chunk_budget: Duration,
    chunks_written: u64,
    chunks_skipped: u64,
}

impl CaptureWorker {
    pub(super) fn new(
        device: Box<dyn CaptureDevice>,
        sink: Arc<dyn AudioSink>,
        format: SampleFormat,
        silence: SilenceDetectionConfig,
        flags: Arc<SessionFlags>,
        events: EventSender,
        meter: LiveAmplitude,
    ) -> Self {
        Self {
            device,
            sink,
            format,
            gate: SilenceGate::new(silence, format),
            elapsed: DurationAccumulator::new(format),
            flags,
            events,
            meter,
            chunk_budget: CONTROL_EVENT_BUDGET,
            chunks_written: 0,
            chunks_skipped: 0,
        }
    }

    /// Capture until stopped, then close the stream and patch the header.
    pub(super) fn run(mut self, stream: SinkStream) -> Result<RecordingSummary> {
        let mut writer = StreamWriter::new(stream);
        let raw_events = self.events.clone();
        let raw_flags = self.flags.clone();
        writer = writer.with_raw_chunk_callback(Box::new(move |bytes: &[u8]| {
            if raw_flags.raw_chunk_wanted() {
                raw_events.emit(RecorderEvent::RawChunk(bytes.to_vec()));
            }
        }));

        let outcome = self.capture(&mut writer);
        self.device.stop();

        let payload_bytes = writer.bytes_written();
        let outcome = outcome.and(writer.finish().map(drop).map_err(RecorderError::from));
        let result = match outcome {
            Ok(()) => self
                .patch_header(payload_bytes)
                .map(|file_bytes| self.summary(payload_bytes, file_bytes)),
            Err(err) => {
                tracing::error!(error = %err, "capture aborted");
                self.salvage_header();
                Err(err)
            }
        };

        self.events.arm(CONTROL_EVENT_BUDGET);
        self.transition(RecorderState::Stop);
        if let Ok(summary) = &result {
            tracing::info!(
                location = %summary.location,
                payload_bytes = summary.payload_bytes,
                duration_ms = summary.duration_ms,
                chunks_skipped = summary.chunks_skipped,
                "recording finished"
            );
        }
        result
    }

    fn capture(&mut self, writer: &mut StreamWriter<SinkStream>) -> Result<()> {
        loop {
            if self.flags.stop_requested() {
                tracing::debug!("stop requested");
                return Ok(());
            }
            if !self.device.is_recording() {
                if let Some(err) = self.device.take_error() {
                    return Err(err);
                }
                tracing::debug!(device = %self.device.name(), "device stopped delivering");
                return Ok(());
            }
            self.apply_controls();

            let chunk = match self.device.read_chunk() {
                ReadStatus::Data(chunk) => chunk,
                ReadStatus::NoData => continue,
                ReadStatus::InvalidOperation(reason) => {
                    tracing::warn!(device = %self.device.name(), %reason, "device read failed");
                    continue;
                }
            };

            self.apply_controls();
            if self.flags.is_paused() {
                continue;
            }
            self.process(writer, &chunk)?;
        }
    }

    /// Apply pause and resume requests made since the last check.
    fn apply_controls(&mut self) {
        self.events.arm(self.chunk_budget);
        if self.flags.take_resume() {
            self.gate.reset();
            self.transition(RecorderState::Recording);
        }
        if self.flags.is_paused() {
            self.transition(RecorderState::Pause);
        }
    }

    fn process(&mut self, writer: &mut StreamWriter<SinkStream>, chunk: &Chunk) -> Result<()> {
        chunk.ensure_matches(&self.format)?;
        self.chunk_budget = self.budget_for(chunk.byte_len());
        self.events.arm(self.chunk_budget);

        let wants_amplitude = self.flags.amplitude_wanted();
        let level = if self.gate.config().enabled || wants_amplitude {
            amplitude(chunk, &self.format)?
        } else {
            0
        };
        self.meter.set(level);

        match self.gate.observe(level, chunk) {
            GateDecision::Skip { .. } => {
                self.chunks_skipped += 1;
                self.transition(RecorderState::SkippingSilence);
            }
            GateDecision::Write => {
                self.transition(RecorderState::Recording);
                let written = writer.write(self.gate.look_back_mut(), chunk)?;
                self.elapsed.add_bytes(written);
                self.chunks_written += 1;
            }
        }

        if wants_amplitude {
            self.events.emit(RecorderEvent::Amplitude(level));
        }
        self.events
            .emit(RecorderEvent::ElapsedMillis(self.elapsed.millis()));
        Ok(())
    }

    fn transition(&self, next: RecorderState) {
        let previous = self.flags.swap_state(next);
        if previous != next {
            tracing::debug!(from = ?previous, to = ?next, "recorder state changed");
            self.events.emit(RecorderEvent::State(next));
        }
    }

    /// Real-time duration of `bytes`, the longest the worker may wait on listeners.
    fn budget_for(&self, bytes: usize) -> Duration {
        let micros = bytes as u128 * 1_000_000 / u128::from(self.format.byte_rate());
        Duration::from_micros(u64::try_from(micros).unwrap_or(u64::MAX))
    }

    fn patch_header(&self, payload_bytes: u64) -> Result<u64> {
        let header = wav_header::encode(payload_bytes, &self.format)?;
        let mut target = self.sink.open_rewrite()?;
        wav_header::write_header(&mut *target, &header)?;
        Ok(payload_bytes + WAV_HEADER_LEN as u64)
    }

    /// After a failure, size the header from whatever reached storage.
    fn salvage_header(&self) {
        let patched = self
            .sink
            .stored_len()
            .map_err(RecorderError::from)
            .and_then(|stored| self.patch_header(stored.saturating_sub(WAV_HEADER_LEN as u64)));
        match patched {
            Ok(file_bytes) => tracing::debug!(file_bytes, "wrote best-effort header"),
            Err(err) => tracing::warn!(error = %err, "could not write header after failure"),
        }
    }

    fn summary(&self, payload_bytes: u64, file_bytes: u64) -> RecordingSummary {
        RecordingSummary {
            location: self.sink.location(),
            format: self.format,
            payload_bytes,
            file_bytes,
            duration_ms: duration_from_size(payload_bytes, &self.format),
            streamed_duration_ms: self.elapsed.millis(),
            chunks_written: self.chunks_written,
            chunks_skipped: self.chunks_skipped,
            events_dropped: self.events.dropped(),
        }
    }
}
