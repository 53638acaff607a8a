use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn combined_output(output: &std::process::Output) -> String {
    let mut combined = String::new();
    combined.push_str(&String::from_utf8_lossy(&output.stdout));
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    combined
}

fn wavrec_bin() -> &'static str {
    option_env!("CARGO_BIN_EXE_wavrec").expect("wavrec test binary not built")
}

fn temp_path(name: &str, ext: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("wavrec_cli_{name}_{nanos}.{ext}"))
}

/// `millis` of 16 kHz mono PCM16 at a constant level.
fn pcm16_block(level: i16, millis: usize) -> Vec<u8> {
    std::iter::repeat(level.to_le_bytes())
        .take(16 * millis)
        .flatten()
        .collect()
}

#[test]
fn wavrec_help_mentions_silence() {
    let output = Command::new(wavrec_bin())
        .arg("--help")
        .output()
        .expect("run wavrec --help");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("--silence-detection"));
    assert!(combined.contains("--from-pcm"));
}

#[test]
fn wavrec_list_input_devices_prints_message() {
    let output = Command::new(wavrec_bin())
        .arg("--list-input-devices")
        .env("WAVREC_TEST_DEVICES", "Built-in Microphone, USB Mic")
        .output()
        .expect("run wavrec --list-input-devices");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("Available audio input devices"));
    assert!(combined.contains("  - USB Mic"));
}

#[test]
fn wavrec_rejects_invalid_bits() {
    let output = Command::new(wavrec_bin())
        .args(["--from-pcm", "missing.pcm", "--bits", "24"])
        .output()
        .expect("run wavrec with bad bits");
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("--bits must be 8, 16 or 32"));
}

#[test]
fn wavrec_converts_pcm_file_to_wav() {
    let input = temp_path("convert", "pcm");
    let output_path = temp_path("convert", "wav");
    std::fs::write(&input, pcm16_block(4_000, 1_000)).unwrap();

    let output = Command::new(wavrec_bin())
        .arg("--from-pcm")
        .arg(&input)
        .arg("--output")
        .arg(&output_path)
        .arg("--json")
        .output()
        .expect("run wavrec --from-pcm");
    assert!(output.status.success(), "{}", combined_output(&output));

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["payload_bytes"], 32_000);
    assert_eq!(summary["duration_ms"], 1_000);
    assert_eq!(summary["chunks_written"], 10);

    let reader = hound::WavReader::open(&output_path).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.sample_rate, 16_000);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(spec.sample_format, hound::SampleFormat::Int);
    let samples: Vec<i16> = reader.into_samples::<i16>().map(Result::unwrap).collect();
    assert_eq!(samples.len(), 16_000);
    assert!(samples.iter().all(|&s| s == 4_000));

    let _ = std::fs::remove_file(input);
    let _ = std::fs::remove_file(output_path);
}

#[test]
fn wavrec_skips_long_silence() {
    let input = temp_path("silence", "pcm");
    let output_path = temp_path("silence", "wav");
    let mut pcm = pcm16_block(4_000, 500);
    pcm.extend(pcm16_block(0, 3_000));
    pcm.extend(pcm16_block(4_000, 500));
    std::fs::write(&input, pcm).unwrap();

    let output = Command::new(wavrec_bin())
        .arg("--from-pcm")
        .arg(&input)
        .arg("--output")
        .arg(&output_path)
        .args([
            "--silence-detection",
            "--pre-silence-ms",
            "500",
            "--silence-buffer-ms",
            "200",
            "--json",
        ])
        .output()
        .expect("run wavrec with silence detection");
    assert!(output.status.success(), "{}", combined_output(&output));

    // 500 loud, 400 quiet before the grace period runs out, 200 replayed, 500 loud.
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["duration_ms"], 1_600);
    assert_eq!(summary["chunks_written"], 14);
    assert_eq!(summary["chunks_skipped"], 26);

    let reader = hound::WavReader::open(&output_path).unwrap();
    assert_eq!(reader.duration(), 16 * 1_600);

    let _ = std::fs::remove_file(input);
    let _ = std::fs::remove_file(output_path);
}
