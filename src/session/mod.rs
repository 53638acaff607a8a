//! Recording session: the public state machine around the capture worker.
//!
//! A [`CaptureSession`] owns its listeners and control flags. `start` spawns
//! one worker thread that drives device read, analysis, the silence gate and
//! the sink, plus a dispatcher thread that runs listeners off the hot path.
//! `pause`, `resume` and `stop` only flip atomics the worker polls.

mod events;
mod worker;

pub use events::{AmplitudeListener, ElapsedListener, RawChunkListener, StateListener};

use crate::audio::{wav_header, LiveAmplitude, SampleFormat, SilenceDetectionConfig};
use crate::device::CaptureDevice;
use crate::error::{RecorderError, Result};
use crate::lock_or_recover;
use crate::sink::{AudioSink, FileSink};
use events::{event_channel, spawn_dispatcher, Listeners, RecorderEvent};
use serde::Serialize;
use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use worker::CaptureWorker;

/// Queue length between the capture worker and the listener dispatcher.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Budget for events sent outside the per-chunk path (start, pause, stop).
const CONTROL_EVENT_BUDGET: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecorderState {
    Stop,
    Recording,
    Pause,
    SkippingSilence,
}

impl RecorderState {
    fn as_u8(self) -> u8 {
        match self {
            RecorderState::Stop => 0,
            RecorderState::Recording => 1,
            RecorderState::Pause => 2,
            RecorderState::SkippingSilence => 3,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => RecorderState::Recording,
            2 => RecorderState::Pause,
            3 => RecorderState::SkippingSilence,
            _ => RecorderState::Stop,
        }
    }

    /// True for every state in which a worker is capturing.
    pub fn is_active(self) -> bool {
        self != RecorderState::Stop
    }
}

/// Knobs that do not change what ends up in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub event_capacity: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// What a finished recording looks like, returned by [`CaptureSession::stop`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordingSummary {
    pub location: String,
    pub format: SampleFormat,
    /// Audio bytes after the header.
    pub payload_bytes: u64,
    pub file_bytes: u64,
    /// Derived from the payload size.
    pub duration_ms: u64,
    /// Accumulated chunk by chunk while recording.
    pub streamed_duration_ms: u64,
    pub chunks_written: u64,
    pub chunks_skipped: u64,
    pub events_dropped: usize,
}

/// Flags shared between the session handle and its worker.
#[derive(Debug)]
pub(crate) struct SessionFlags {
    state: AtomicU8,
    stop: AtomicBool,
    paused: AtomicBool,
    resume: AtomicBool,
    amplitude_wanted: AtomicBool,
    raw_chunk_wanted: AtomicBool,
}

impl SessionFlags {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(RecorderState::Stop.as_u8()),
            stop: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            resume: AtomicBool::new(false),
            amplitude_wanted: AtomicBool::new(false),
            raw_chunk_wanted: AtomicBool::new(false),
        }
    }

    pub(crate) fn state(&self) -> RecorderState {
        RecorderState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Store `next` and return the previous state.
    pub(crate) fn swap_state(&self, next: RecorderState) -> RecorderState {
        RecorderState::from_u8(self.state.swap(next.as_u8(), Ordering::SeqCst))
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    pub(crate) fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub(crate) fn take_resume(&self) -> bool {
        self.resume.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn amplitude_wanted(&self) -> bool {
        self.amplitude_wanted.load(Ordering::Relaxed)
    }

    pub(crate) fn raw_chunk_wanted(&self) -> bool {
        self.raw_chunk_wanted.load(Ordering::Relaxed)
    }

    fn arm_for_start(&self) {
        self.stop.store(false, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        self.resume.store(false, Ordering::SeqCst);
    }
}

struct RunningCapture {
    worker: thread::JoinHandle<Result<RecordingSummary>>,
    dispatcher: thread::JoinHandle<()>,
}

/// One recorder bound to one destination.
///
/// Listeners may be registered at any time, also from inside a listener.
/// They run on a dispatcher thread. Telemetry arrives in the order the worker
/// produced it; state changes are never dropped and may overtake queued
/// telemetry.
pub struct CaptureSession {
    sink: Arc<dyn AudioSink>,
    format: SampleFormat,
    silence: SilenceDetectionConfig,
    options: SessionOptions,
    flags: Arc<SessionFlags>,
    listeners: Arc<Mutex<Listeners>>,
    meter: LiveAmplitude,
    running: Option<RunningCapture>,
}

impl CaptureSession {
    pub fn new(
        sink: Arc<dyn AudioSink>,
        format: SampleFormat,
        silence: SilenceDetectionConfig,
        options: SessionOptions,
    ) -> Self {
        Self {
            sink,
            format,
            silence,
            options,
            flags: Arc::new(SessionFlags::new()),
            listeners: Arc::new(Mutex::new(Listeners::default())),
            meter: LiveAmplitude::new(),
            running: None,
        }
    }

    /// Session writing to a file path with default options.
    pub fn to_file(path: impl Into<PathBuf>, format: SampleFormat) -> Self {
        Self::new(
            Arc::new(FileSink::new(path)),
            format,
            SilenceDetectionConfig::default(),
            SessionOptions::default(),
        )
    }

    pub fn state(&self) -> RecorderState {
        self.flags.state()
    }

    pub fn format(&self) -> SampleFormat {
        self.format
    }

    pub fn silence_config(&self) -> &SilenceDetectionConfig {
        &self.silence
    }

    pub fn location(&self) -> String {
        self.sink.location()
    }

    /// Latest amplitude seen by the worker, readable without a listener.
    pub fn amplitude_meter(&self) -> LiveAmplitude {
        self.meter.clone()
    }

    pub fn on_amplitude(&self, listener: impl FnMut(i32) + Send + 'static) {
        lock_or_recover(&self.listeners, "on_amplitude").amplitude = Some(Box::new(listener));
        self.flags.amplitude_wanted.store(true, Ordering::Relaxed);
    }

    /// Receives the exact bytes appended to the sink, look-back replay included.
    pub fn on_raw_chunk(&self, listener: impl FnMut(&[u8]) + Send + 'static) {
        lock_or_recover(&self.listeners, "on_raw_chunk").raw_chunk = Some(Box::new(listener));
        self.flags.raw_chunk_wanted.store(true, Ordering::Relaxed);
    }

    pub fn on_elapsed_millis(&self, listener: impl FnMut(u64) + Send + 'static) {
        lock_or_recover(&self.listeners, "on_elapsed_millis").elapsed_millis =
            Some(Box::new(listener));
    }

    pub fn on_elapsed_seconds(&self, listener: impl FnMut(u64) + Send + 'static) {
        lock_or_recover(&self.listeners, "on_elapsed_seconds").elapsed_seconds =
            Some(Box::new(listener));
    }

    /// Called only when the state actually changes.
    pub fn on_state_change(&self, listener: impl FnMut(RecorderState) + Send + 'static) {
        lock_or_recover(&self.listeners, "on_state_change").state = Some(Box::new(listener));
    }

    /// Start capturing from `device` into the sink.
    ///
    /// The sink is truncated and a placeholder header written before the
    /// worker starts, so open failures surface here rather than on `stop`.
    pub fn start<D>(&mut self, mut device: D) -> Result<()>
    where
        D: CaptureDevice + 'static,
    {
        let state = self.flags.state();
        if state.is_active() {
            return Err(RecorderError::AlreadyRecording);
        }
        if self.running.is_some() {
            // The previous device ended on its own and nobody collected it.
            if let Err(err) = self.collect() {
                tracing::warn!(error = %err, "previous capture ended with an error");
            }
        }
        if device.format() != self.format {
            return Err(RecorderError::UnsupportedFormat(format!(
                "device delivers {}, session expects {}",
                device.format(),
                self.format
            )));
        }
        let placeholder = wav_header::encode(0, &self.format)?;

        device.start()?;
        let mut stream = match self.sink.open_append() {
            Ok(stream) => stream,
            Err(err) => {
                device.stop();
                return Err(err.into());
            }
        };
        if let Err(err) = stream.write_all(&placeholder) {
            device.stop();
            return Err(err.into());
        }

        self.flags.arm_for_start();
        let (events, rx) = event_channel(self.options.event_capacity);
        let dispatcher = spawn_dispatcher(rx, self.listeners.clone());

        self.flags.swap_state(RecorderState::Recording);
        events.arm(CONTROL_EVENT_BUDGET);
        events.emit(RecorderEvent::State(RecorderState::Recording));
        tracing::info!(
            device = %device.name(),
            location = %self.sink.location(),
            format = %self.format,
            silence_detection = self.silence.enabled,
            "recording started"
        );

        let worker = CaptureWorker::new(
            Box::new(device),
            self.sink.clone(),
            self.format,
            self.silence.clone(),
            self.flags.clone(),
            events,
            self.meter.clone(),
        );
        let worker = thread::spawn(move || worker.run(stream));
        self.running = Some(RunningCapture { worker, dispatcher });
        Ok(())
    }

    /// Keep reading from the device but stop analysing and writing.
    pub fn pause(&self) -> Result<()> {
        let state = self.flags.state();
        if !state.is_active() {
            return Err(RecorderError::InvalidState {
                operation: "pause",
                state,
            });
        }
        self.flags.paused.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Leave pause. Silence tracking restarts from zero.
    pub fn resume(&self) -> Result<()> {
        let state = self.flags.state();
        if !state.is_active() {
            return Err(RecorderError::InvalidState {
                operation: "resume",
                state,
            });
        }
        if self.flags.is_paused() {
            // Raised before `paused` clears so the worker resets the gate
            // before it processes the first chunk after the pause.
            self.flags.resume.store(true, Ordering::SeqCst);
            self.flags.paused.store(false, Ordering::SeqCst);
        }
        Ok(())
    }

    /// Stop capturing, finalize the header and report what was recorded.
    ///
    /// Returns `Ok(None)` when nothing was running. Once this returns, every
    /// listener event of the recording has been delivered.
    pub fn stop(&mut self) -> Result<Option<RecordingSummary>> {
        if self.running.is_none() {
            return Ok(None);
        }
        self.flags.stop.store(true, Ordering::SeqCst);
        self.collect().map(Some)
    }

    fn collect(&mut self) -> Result<RecordingSummary> {
        let Some(running) = self.running.take() else {
            return Err(RecorderError::InvalidState {
                operation: "collect",
                state: self.flags.state(),
            });
        };
        let outcome = running.worker.join();
        if running.dispatcher.join().is_err() {
            tracing::warn!("listener dispatcher panicked");
        }
        match outcome {
            Ok(result) => result,
            Err(_) => {
                self.flags.swap_state(RecorderState::Stop);
                Err(RecorderError::Worker)
            }
        }
    }

    /// Point the session at a new file. Rejected while capturing.
    pub fn change_file_path(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        self.change_sink(Arc::new(FileSink::new(path)))
    }

    /// Swap the destination. Rejected while capturing.
    pub fn change_sink(&mut self, sink: Arc<dyn AudioSink>) -> Result<()> {
        let state = self.flags.state();
        if state.is_active() {
            return Err(RecorderError::InvalidState {
                operation: "change the output",
                state,
            });
        }
        self.sink = sink;
        Ok(())
    }
}

impl fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureSession")
            .field("sink", &self.sink)
            .field("format", &self.format)
            .field("silence", &self.silence)
            .field("state", &self.flags.state())
            .finish_non_exhaustive()
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if self.running.is_some() {
            if let Err(err) = self.stop() {
                tracing::warn!(error = %err, "capture ended with an error during drop");
            }
        }
    }
}
