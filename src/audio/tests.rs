use super::*;
use crate::error::RecorderError;

fn pcm16_mono() -> SampleFormat {
    SampleFormat::default()
}

fn all_formats() -> Vec<SampleFormat> {
    let mut formats = Vec::new();
    for encoding in [
        Encoding::Pcm8,
        Encoding::Pcm16,
        Encoding::Pcm32,
        Encoding::Float32,
    ] {
        for channels in [1, 2] {
            for rate in [8_000, 16_000, 44_100, 48_000] {
                formats.push(SampleFormat::new(rate, channels, encoding).unwrap());
            }
        }
    }
    formats
}

/// `millis` of 16 kHz mono PCM16 at a constant level.
fn pcm16_chunk(level: i16, millis: u64) -> Chunk {
    Chunk::Pcm16(vec![level; pcm16_mono().samples_for_millis(millis)])
}

fn gate(pre_ms: u64, buffer_ms: u64) -> SilenceGate {
    SilenceGate::new(
        SilenceDetectionConfig {
            enabled: true,
            min_amplitude_threshold: 1_500,
            pre_silence_duration_ms: pre_ms,
            buffer_duration_ms: buffer_ms,
        },
        pcm16_mono(),
    )
}

#[test]
fn header_lengths_round_trip_for_every_format() {
    for format in all_formats() {
        for total in [0u64, 1, 4_410, 3_200_000, wav_header::MAX_AUDIO_BYTES] {
            let header = wav_header::encode(total, &format).unwrap();
            let decoded = wav_header::decode(&header).unwrap();
            assert_eq!(u64::from(decoded.audio_bytes), total, "{format}");
            assert_eq!(u64::from(decoded.riff_len), total + 36, "{format}");
            assert_eq!(decoded.format, format);
        }
    }
}

#[test]
fn incremental_duration_stays_within_one_chunk_of_file_size() {
    for format in all_formats() {
        let chunk_bytes = (format.samples_for_millis(20) * format.bytes_per_sample()) as u64;
        let mut elapsed = DurationAccumulator::new(format);
        for _ in 0..257 {
            elapsed.add_bytes(chunk_bytes as usize);
        }
        let from_size = duration_from_size(elapsed.total_bytes(), &format);
        let one_chunk = chunk_duration_ms(chunk_bytes, &format);
        let diff = (elapsed.millis_f64() - from_size as f64).abs();
        assert!(diff < one_chunk, "{format}: diff {diff} >= {one_chunk}");
    }
}

#[test]
fn zero_signal_has_zero_amplitude_in_every_format() {
    for format in all_formats() {
        let chunk = Chunk::silence(format.encoding(), format.samples_for_millis(10));
        assert_eq!(amplitude(&chunk, &format).unwrap(), 0, "{format}");
    }
}

#[test]
fn amplitude_rejects_mismatched_chunk() {
    let format = SampleFormat::new(16_000, 1, Encoding::Pcm32).unwrap();
    assert!(matches!(
        amplitude(&Chunk::Pcm16(vec![1, 2, 3]), &format),
        Err(RecorderError::UnsupportedFormat(_))
    ));
}

#[test]
fn skipping_starts_exactly_at_the_grace_period_crossing() {
    let mut gate = gate(1_500, 2_000);
    let quiet = pcm16_chunk(10, 100);
    for n in 1..15 {
        assert_eq!(gate.observe(10, &quiet), GateDecision::Write, "chunk {n}");
        assert_eq!(gate.state(), GateState::Loud);
    }
    assert_eq!(
        gate.observe(10, &quiet),
        GateDecision::Skip { entered: true }
    );
    assert_eq!(gate.silence_ms(), 1_500);
    assert_eq!(
        gate.observe(10, &quiet),
        GateDecision::Skip { entered: false }
    );
}

#[test]
fn zero_grace_period_skips_first_quiet_chunk() {
    let mut gate = gate(0, 2_000);
    assert_eq!(
        gate.observe(0, &pcm16_chunk(0, 100)),
        GateDecision::Skip { entered: true }
    );
    assert_eq!(gate.observe(2_000, &pcm16_chunk(2_000, 100)), GateDecision::Write);
}

#[test]
fn look_back_never_exceeds_budget_and_evicts_oldest() {
    let mut gate = gate(0, 350);
    let budget = gate.look_back().budget_bytes();
    assert_eq!(budget, 11_200);
    for level in 0..20i16 {
        gate.observe(0, &pcm16_chunk(level, 100));
        assert!(gate.look_back().total_bytes() <= budget);
    }
    let kept: Vec<i16> = gate
        .look_back()
        .iter()
        .map(|chunk| match chunk {
            Chunk::Pcm16(samples) => samples[0],
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_eq!(kept, vec![17, 18, 19]);
}

#[test]
fn ten_loud_chunks_are_written_and_timed() {
    let format = pcm16_mono();
    let mut gate = gate(1_500, 2_000);
    let mut writer = StreamWriter::new(Vec::new());
    let mut elapsed = DurationAccumulator::new(format);
    for _ in 0..10 {
        let chunk = pcm16_chunk(8_000, 100);
        let level = amplitude(&chunk, &format).unwrap();
        assert_eq!(gate.observe(level, &chunk), GateDecision::Write);
        let written = writer.write(gate.look_back_mut(), &chunk).unwrap();
        elapsed.add_bytes(written);
    }
    assert_eq!(writer.bytes_written(), 32_000);
    assert_eq!(elapsed.millis(), 1_000);
    assert_eq!(writer.finish().unwrap().len(), 32_000);
}

#[test]
fn quiet_chunks_are_replayed_ahead_of_returning_sound() {
    let format = pcm16_mono();
    let mut gate = gate(200, 2_000);
    let mut writer = StreamWriter::new(Vec::new());
    let mut decisions = Vec::new();
    let levels = [3_000i16, 3_000, 5, 6, 7, 8, 3_001];
    for level in levels {
        let chunk = pcm16_chunk(level, 100);
        let decision = gate.observe(amplitude(&chunk, &format).unwrap(), &chunk);
        if decision == GateDecision::Write {
            writer.write(gate.look_back_mut(), &chunk).unwrap();
        }
        decisions.push(decision);
    }
    assert_eq!(
        decisions,
        vec![
            GateDecision::Write,
            GateDecision::Write,
            GateDecision::Write,
            GateDecision::Skip { entered: true },
            GateDecision::Skip { entered: false },
            GateDecision::Skip { entered: false },
            GateDecision::Write,
        ]
    );
    assert!(gate.look_back().is_empty());

    let bytes = writer.finish().unwrap();
    let starts: Vec<i16> = bytes
        .chunks(3_200)
        .map(|run| i16::from_le_bytes([run[0], run[1]]))
        .collect();
    assert_eq!(starts, levels.to_vec());
}

#[test]
fn resume_style_reset_keeps_retained_chunks() {
    let mut gate = gate(0, 2_000);
    gate.observe(0, &pcm16_chunk(1, 100));
    assert_eq!(gate.state(), GateState::Skipping);
    gate.reset();
    assert_eq!(gate.state(), GateState::Loud);
    assert_eq!(gate.silence_ms(), 0);
    assert_eq!(gate.look_back().len(), 1);
}
