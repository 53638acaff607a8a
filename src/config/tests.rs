use super::AppConfig;
use crate::audio::{Encoding, SilenceDetectionConfig};
use crate::session::SessionOptions;
use clap::Parser;

fn file_config(extra: &[&str]) -> AppConfig {
    let mut args = vec!["test-app", "--from-pcm", "in.pcm"];
    args.extend_from_slice(extra);
    AppConfig::parse_from(args)
}

#[test]
fn defaults_validate_for_file_input() {
    let cfg = file_config(&[]);
    assert!(cfg.validate().is_ok());
    let format = cfg.sample_format().unwrap();
    assert_eq!(format.sample_rate(), 16_000);
    assert_eq!(format.channels(), 1);
    assert_eq!(format.encoding(), Encoding::Pcm16);
}

#[test]
fn microphone_capture_needs_seconds() {
    let cfg = AppConfig::parse_from(["test-app"]);
    assert!(cfg.validate().is_err());

    let cfg = AppConfig::parse_from(["test-app", "--seconds", "3"]);
    assert!(cfg.validate().is_ok());

    let cfg = AppConfig::parse_from(["test-app", "--list-input-devices"]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn rejects_seconds_out_of_bounds() {
    assert!(file_config(&["--seconds", "0"]).validate().is_err());
    assert!(file_config(&["--seconds", "86401"]).validate().is_err());
    assert!(file_config(&["--seconds", "86400"]).validate().is_ok());
}

#[test]
fn rejects_sample_rate_out_of_bounds() {
    assert!(file_config(&["--sample-rate", "3999"]).validate().is_err());
    assert!(file_config(&["--sample-rate", "192001"]).validate().is_err());
    assert!(file_config(&["--sample-rate", "4000"]).validate().is_ok());
    assert!(file_config(&["--sample-rate", "192000"]).validate().is_ok());
}

#[test]
fn rejects_unsupported_layouts() {
    assert!(file_config(&["--channels", "0"]).validate().is_err());
    assert!(file_config(&["--channels", "3"]).validate().is_err());
    assert!(file_config(&["--bits", "24"]).validate().is_err());
    assert!(file_config(&["--float"]).validate().is_err());
    assert!(file_config(&["--bits", "8", "--float"]).validate().is_err());
}

#[test]
fn float_requires_32_bits() {
    let cfg = file_config(&["--bits", "32", "--float", "--channels", "2"]);
    assert!(cfg.validate().is_ok());
    let format = cfg.sample_format().unwrap();
    assert_eq!(format.encoding(), Encoding::Float32);
    assert_eq!(format.frame_bytes(), 8);
}

#[test]
fn rejects_chunk_size_out_of_bounds() {
    assert!(file_config(&["--chunk-ms", "4"]).validate().is_err());
    assert!(file_config(&["--chunk-ms", "1001"]).validate().is_err());
    assert!(file_config(&["--chunk-ms", "5"]).validate().is_ok());
}

#[test]
fn rejects_silence_tuning_out_of_bounds() {
    assert!(file_config(&["--silence-threshold=-1"]).validate().is_err());
    assert!(file_config(&["--silence-threshold", "32769"]).validate().is_err());
    assert!(file_config(&["--pre-silence-ms", "600001"]).validate().is_err());
    assert!(file_config(&["--silence-buffer-ms", "60001"]).validate().is_err());
    assert!(file_config(&["--pre-silence-ms", "0"]).validate().is_ok());
}

#[test]
fn rejects_event_channel_capacity_out_of_bounds() {
    assert!(file_config(&["--event-channel-capacity", "7"]).validate().is_err());
    assert!(file_config(&["--event-channel-capacity", "4097"]).validate().is_err());
    assert!(file_config(&["--event-channel-capacity", "8"]).validate().is_ok());
}

#[test]
fn silence_config_follows_flags() {
    let cfg = file_config(&[
        "--silence-detection",
        "--silence-threshold",
        "900",
        "--pre-silence-ms",
        "250",
        "--silence-buffer-ms",
        "400",
    ]);
    assert_eq!(
        SilenceDetectionConfig::from(&cfg),
        SilenceDetectionConfig {
            enabled: true,
            min_amplitude_threshold: 900,
            pre_silence_duration_ms: 250,
            buffer_duration_ms: 400,
        }
    );
}

#[test]
fn silence_detection_is_off_by_default() {
    let silence = SilenceDetectionConfig::from(&file_config(&[]));
    assert!(!silence.enabled);
    assert_eq!(silence.min_amplitude_threshold, 1_500);
    assert_eq!(silence.pre_silence_duration_ms, 2_000);
    assert_eq!(silence.buffer_duration_ms, 2_000);
}

#[test]
fn session_options_carry_channel_capacity() {
    let cfg = file_config(&["--event-channel-capacity", "128"]);
    assert_eq!(SessionOptions::from(&cfg).event_capacity, 128);
}
