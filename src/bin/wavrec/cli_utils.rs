use anyhow::Result;
use wavrec::RecordingSummary;

/// Overrides device discovery with a comma-separated list of names.
const DEVICE_LIST_ENV: &str = "WAVREC_TEST_DEVICES";

pub(crate) fn list_input_devices() -> Result<()> {
    let devices = detected_devices();
    if devices.is_empty() {
        println!("No audio input devices detected.");
        return Ok(());
    }
    println!("Available audio input devices:");
    for name in &devices {
        println!("  - {name}");
    }
    Ok(())
}

fn detected_devices() -> Vec<String> {
    match std::env::var(DEVICE_LIST_ENV) {
        Ok(names) => parse_device_names(&names),
        Err(_) => host_devices(),
    }
}

fn parse_device_names(names: &str) -> Vec<String> {
    names
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(feature = "device-cpal")]
fn host_devices() -> Vec<String> {
    wavrec::device::CpalDevice::list_devices().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "failed to list audio input devices");
        eprintln!("Failed to list audio input devices: {err}");
        Vec::new()
    })
}

#[cfg(not(feature = "device-cpal"))]
fn host_devices() -> Vec<String> {
    eprintln!("wavrec was built without microphone support (feature `device-cpal`).");
    Vec::new()
}

pub(crate) fn format_summary(summary: &RecordingSummary) -> String {
    let mut lines = vec![
        format!("Saved {}", summary.location),
        format!("  format:   {}", summary.format),
        format!(
            "  duration: {} ({} bytes of audio)",
            format_millis(summary.duration_ms),
            summary.payload_bytes
        ),
        format!(
            "  chunks:   {} written, {} skipped as silence",
            summary.chunks_written, summary.chunks_skipped
        ),
    ];
    if summary.events_dropped > 0 {
        lines.push(format!("  dropped {} listener events", summary.events_dropped));
    }
    lines.join("\n")
}

fn format_millis(millis: u64) -> String {
    let minutes = millis / 60_000;
    let seconds = (millis % 60_000) / 1_000;
    let rest = millis % 1_000;
    format!("{minutes:02}:{seconds:02}.{rest:03}")
}
