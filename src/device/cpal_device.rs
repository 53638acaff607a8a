//! Microphone input via CPAL.
//!
//! CPAL streams are not `Send`, so the stream lives on its own thread and
//! pushes fixed-size chunks through a bounded channel the capture loop reads.

use super::{CaptureDevice, ReadStatus};
use crate::audio::{Chunk, Encoding, SampleFormat};
use crate::error::{RecorderError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::StreamConfig;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const CHUNK_CHANNEL_CAPACITY: usize = 64;

/// Default or named input device, captured in its native format.
pub struct CpalDevice {
    preferred: Option<String>,
    label: String,
    format: SampleFormat,
    chunk_samples: usize,
    poll: Duration,
    receiver: Option<Receiver<ReadStatus>>,
    stop_tx: Option<Sender<()>>,
    stream_thread: Option<thread::JoinHandle<()>>,
    recording: Arc<AtomicBool>,
    lost: Arc<AtomicBool>,
    dropped: Arc<AtomicUsize>,
}

impl CpalDevice {
    /// Names of the available input devices.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices = host
            .input_devices()
            .map_err(|err| RecorderError::DeviceRead(format!("no input devices available: {err}")))?;
        Ok(devices.filter_map(|device| device.name().ok()).collect())
    }

    /// Open `preferred` (or the default input) and derive the session format
    /// from its default configuration.
    pub fn new(preferred: Option<&str>, chunk_ms: u64) -> Result<Self> {
        let device = resolve_device(preferred)?;
        let label = device
            .name()
            .unwrap_or_else(|_| "Unknown Device".to_string());
        let config = device
            .default_input_config()
            .map_err(|err| RecorderError::DeviceRead(format!("{label}: {err}")))?;
        let encoding = encoding_for(config.sample_format())?;
        let format = SampleFormat::new(config.sample_rate().0, config.channels(), encoding)?;
        tracing::debug!(device = %label, %format, "resolved input device");
        Ok(Self {
            preferred: preferred.map(str::to_string),
            label,
            format,
            chunk_samples: format.samples_for_millis(chunk_ms),
            poll: Duration::from_millis(chunk_ms.max(1) * 2),
            receiver: None,
            stop_tx: None,
            stream_thread: None,
            recording: Arc::new(AtomicBool::new(false)),
            lost: Arc::new(AtomicBool::new(false)),
            dropped: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Chunks discarded because the capture loop fell behind.
    pub fn dropped_chunks(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

fn resolve_device(preferred: Option<&str>) -> Result<cpal::Device> {
    let host = cpal::default_host();
    match preferred {
        Some(name) => {
            let mut devices = host
                .input_devices()
                .map_err(|err| RecorderError::DeviceRead(format!("no input devices: {err}")))?;
            devices
                .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                .ok_or_else(|| RecorderError::DeviceRead(format!("input device '{name}' not found")))
        }
        None => host
            .default_input_device()
            .ok_or_else(|| RecorderError::DeviceRead("no default input device".to_string())),
    }
}

fn encoding_for(format: cpal::SampleFormat) -> Result<Encoding> {
    match format {
        cpal::SampleFormat::U8 => Ok(Encoding::Pcm8),
        cpal::SampleFormat::I16 => Ok(Encoding::Pcm16),
        cpal::SampleFormat::I32 => Ok(Encoding::Pcm32),
        cpal::SampleFormat::F32 => Ok(Encoding::Float32),
        other => Err(RecorderError::UnsupportedFormat(format!(
            "device sample format {other:?}"
        ))),
    }
}

/// Regroups callback buffers of arbitrary length into fixed-size chunks.
struct ChunkPump<T> {
    chunk_samples: usize,
    pending: Vec<T>,
    sender: Sender<ReadStatus>,
    dropped: Arc<AtomicUsize>,
    wrap: fn(Vec<T>) -> Chunk,
}

impl<T: Copy> ChunkPump<T> {
    fn new(
        chunk_samples: usize,
        sender: Sender<ReadStatus>,
        dropped: Arc<AtomicUsize>,
        wrap: fn(Vec<T>) -> Chunk,
    ) -> Self {
        Self {
            chunk_samples: chunk_samples.max(1),
            pending: Vec::with_capacity(chunk_samples),
            sender,
            dropped,
            wrap,
        }
    }

    fn push(&mut self, data: &[T]) {
        self.pending.extend_from_slice(data);
        while self.pending.len() >= self.chunk_samples {
            let samples: Vec<T> = self.pending.drain(..self.chunk_samples).collect();
            match self.sender.try_send(ReadStatus::Data((self.wrap)(samples))) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
                Err(TrySendError::Disconnected(_)) => break,
            }
        }
    }
}

fn build_typed<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut pump: ChunkPump<T>,
    recording: Arc<AtomicBool>,
    lost: Arc<AtomicBool>,
) -> std::result::Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample + Send + 'static,
{
    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| pump.push(data),
        move |err| match err {
            cpal::StreamError::DeviceNotAvailable => {
                tracing::warn!("input device disappeared");
                lost.store(true, Ordering::SeqCst);
                recording.store(false, Ordering::SeqCst);
            }
            other => tracing::warn!(error = %other, "audio stream error"),
        },
        None,
    )
}

fn build_stream(
    device: &cpal::Device,
    chunk_samples: usize,
    sender: Sender<ReadStatus>,
    dropped: Arc<AtomicUsize>,
    recording: Arc<AtomicBool>,
    lost: Arc<AtomicBool>,
) -> std::result::Result<cpal::Stream, String> {
    let default_config = device.default_input_config().map_err(|err| err.to_string())?;
    let sample_format = default_config.sample_format();
    let config: StreamConfig = default_config.config();
    let stream = match sample_format {
        cpal::SampleFormat::U8 => build_typed(
            device,
            &config,
            ChunkPump::new(chunk_samples, sender, dropped, Chunk::Pcm8),
            recording,
            lost,
        ),
        cpal::SampleFormat::I16 => build_typed(
            device,
            &config,
            ChunkPump::new(chunk_samples, sender, dropped, Chunk::Pcm16),
            recording,
            lost,
        ),
        cpal::SampleFormat::I32 => build_typed(
            device,
            &config,
            ChunkPump::new(chunk_samples, sender, dropped, Chunk::Pcm32),
            recording,
            lost,
        ),
        cpal::SampleFormat::F32 => build_typed(
            device,
            &config,
            ChunkPump::new(chunk_samples, sender, dropped, Chunk::Float32),
            recording,
            lost,
        ),
        other => return Err(format!("unsupported sample format: {other:?}")),
    };
    stream.map_err(|err| err.to_string())
}

impl CaptureDevice for CpalDevice {
    fn format(&self) -> SampleFormat {
        self.format
    }

    fn start(&mut self) -> Result<()> {
        let (chunk_tx, chunk_rx) = bounded(CHUNK_CHANNEL_CAPACITY);
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let (ready_tx, ready_rx) = bounded::<std::result::Result<(), String>>(1);
        let preferred = self.preferred.clone();
        let chunk_samples = self.chunk_samples;
        let dropped = self.dropped.clone();
        let recording = self.recording.clone();
        let lost = self.lost.clone();
        lost.store(false, Ordering::SeqCst);
        recording.store(true, Ordering::SeqCst);

        let handle = thread::spawn(move || {
            let stream = resolve_device(preferred.as_deref())
                .map_err(|err| err.to_string())
                .and_then(|device| {
                    build_stream(
                        &device,
                        chunk_samples,
                        chunk_tx,
                        dropped,
                        recording.clone(),
                        lost,
                    )
                })
                .and_then(|stream| stream.play().map(|()| stream).map_err(|e| e.to_string()));
            let stream = match stream {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(()));
                    stream
                }
                Err(err) => {
                    recording.store(false, Ordering::SeqCst);
                    let _ = ready_tx.send(Err(err));
                    return;
                }
            };
            // Parked until stop() drops the sender.
            let _ = stop_rx.recv();
            if let Err(err) = stream.pause() {
                tracing::debug!(error = %err, "failed to pause audio stream");
            }
            drop(stream);
            recording.store(false, Ordering::SeqCst);
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.receiver = Some(chunk_rx);
                self.stop_tx = Some(stop_tx);
                self.stream_thread = Some(handle);
                Ok(())
            }
            Ok(Err(err)) => {
                let _ = handle.join();
                Err(RecorderError::DeviceRead(format!("{}: {err}", self.label)))
            }
            Err(_) => {
                self.recording.store(false, Ordering::SeqCst);
                Err(RecorderError::DeviceRead(format!(
                    "{}: stream thread exited early",
                    self.label
                )))
            }
        }
    }

    fn read_chunk(&mut self) -> ReadStatus {
        let Some(receiver) = self.receiver.as_ref() else {
            return ReadStatus::InvalidOperation("device not started".to_string());
        };
        match receiver.recv_timeout(self.poll) {
            Ok(status) => status,
            Err(RecvTimeoutError::Timeout) => ReadStatus::NoData,
            Err(RecvTimeoutError::Disconnected) => {
                self.recording.store(false, Ordering::SeqCst);
                ReadStatus::NoData
            }
        }
    }

    fn is_recording(&self) -> bool {
        self.recording.load(Ordering::SeqCst)
    }

    fn stop(&mut self) {
        self.stop_tx = None;
        if let Some(handle) = self.stream_thread.take() {
            if handle.join().is_err() {
                tracing::warn!(device = %self.label, "audio stream thread panicked");
            }
        }
        self.receiver = None;
        self.recording.store(false, Ordering::SeqCst);
    }

    fn take_error(&mut self) -> Option<RecorderError> {
        self.lost
            .swap(false, Ordering::SeqCst)
            .then(|| RecorderError::DeviceRead(format!("{}: input device disappeared", self.label)))
    }

    fn name(&self) -> String {
        self.label.clone()
    }
}

impl Drop for CpalDevice {
    fn drop(&mut self) {
        if self.stream_thread.is_some() {
            self.stop();
        }
    }
}
