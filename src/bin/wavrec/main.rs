//! wavrec entrypoint: record a microphone or a raw PCM file into a WAV file.
//!
//! The recording runs on the library's capture worker; this thread only waits
//! for the time limit or for the input to run dry, then stops the session and
//! prints what was written.

mod cli_utils;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use wavrec::config::AppConfig;
use wavrec::telemetry::init_tracing;
use wavrec::{
    CaptureDevice, CaptureSession, FileSink, PcmFileDevice, RecorderState, RecordingSummary,
    SampleFormat, SessionOptions, SilenceDetectionConfig,
};

use crate::cli_utils::{format_summary, list_input_devices};

/// How often the main thread checks whether the recording ended on its own.
const STATE_POLL_MS: u64 = 20;

fn main() -> Result<()> {
    let config = AppConfig::parse_args()?;
    init_tracing(&config);

    if config.list_input_devices {
        list_input_devices()?;
        return Ok(());
    }

    let summary = record(&config)?;
    if config.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", format_summary(&summary));
    }
    Ok(())
}

fn record(config: &AppConfig) -> Result<RecordingSummary> {
    match &config.from_pcm {
        Some(path) => {
            let format = config.sample_format()?;
            let device = PcmFileDevice::new(path, format, config.chunk_ms).realtime(config.realtime);
            run_session(config, format, device)
        }
        None => record_microphone(config),
    }
}

#[cfg(feature = "device-cpal")]
fn record_microphone(config: &AppConfig) -> Result<RecordingSummary> {
    let device = wavrec::device::CpalDevice::new(config.input_device.as_deref(), config.chunk_ms)
        .context("failed to open audio input")?;
    let format = device.format();
    run_session(config, format, device)
}

#[cfg(not(feature = "device-cpal"))]
fn record_microphone(_config: &AppConfig) -> Result<RecordingSummary> {
    anyhow::bail!("microphone capture needs the `device-cpal` feature; use --from-pcm instead")
}

fn run_session<D>(config: &AppConfig, format: SampleFormat, device: D) -> Result<RecordingSummary>
where
    D: CaptureDevice + 'static,
{
    let mut session = CaptureSession::new(
        Arc::new(FileSink::new(&config.output)),
        format,
        SilenceDetectionConfig::from(config),
        SessionOptions::from(config),
    );
    session.on_state_change(|state| tracing::info!(?state, "recorder state"));
    session
        .start(device)
        .with_context(|| format!("failed to start recording to {}", config.output.display()))?;

    let deadline = config
        .seconds
        .map(|seconds| Instant::now() + Duration::from_secs(seconds));
    while session.state() != RecorderState::Stop {
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            break;
        }
        thread::sleep(Duration::from_millis(STATE_POLL_MS));
    }

    session
        .stop()
        .context("recording failed")?
        .context("recording ended without a summary")
}
