//! Canonical 44-byte RIFF/WAVE header.
//!
//! Layout (all integers little-endian):
//!
//! | offset | size | field                         |
//! |--------|------|-------------------------------|
//! | 0      | 4    | `"RIFF"`                      |
//! | 4      | 4    | audio bytes + 36              |
//! | 8      | 4    | `"WAVE"`                      |
//! | 12     | 4    | `"fmt "`                      |
//! | 16     | 4    | 16 (fmt chunk size)           |
//! | 20     | 2    | 1 = PCM, 3 = IEEE float       |
//! | 22     | 2    | channels                      |
//! | 24     | 4    | sample rate                   |
//! | 28     | 4    | byte rate                     |
//! | 32     | 2    | block align                   |
//! | 34     | 2    | bits per sample               |
//! | 36     | 4    | `"data"`                      |
//! | 40     | 4    | audio bytes                   |

use super::format::SampleFormat;
use crate::error::{RecorderError, Result};
use std::io::{self, Seek, SeekFrom, Write};

pub const WAV_HEADER_LEN: usize = 44;
pub const FORMAT_TAG_PCM: u16 = 1;
pub const FORMAT_TAG_IEEE_FLOAT: u16 = 3;

const FMT_CHUNK_LEN: u32 = 16;
/// Header bytes counted by the RIFF length field (everything after it but the payload).
const RIFF_OVERHEAD: u32 = 36;

/// Largest payload whose RIFF length still fits in 32 bits.
pub const MAX_AUDIO_BYTES: u64 = (u32::MAX - RIFF_OVERHEAD) as u64;

/// Fields recovered from an encoded header.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DecodedHeader {
    pub format: SampleFormat,
    pub riff_len: u32,
    pub audio_bytes: u32,
}

/// Build the header for `total_audio_bytes` of payload in `format`.
pub fn encode(total_audio_bytes: u64, format: &SampleFormat) -> Result<[u8; WAV_HEADER_LEN]> {
    let audio_bytes = u32::try_from(total_audio_bytes)
        .ok()
        .filter(|&len| u64::from(len) <= MAX_AUDIO_BYTES)
        .ok_or_else(|| {
            RecorderError::UnsupportedFormat(format!(
                "{total_audio_bytes} payload bytes exceed the WAV size limit"
            ))
        })?;
    let byte_rate = u32::try_from(format.byte_rate()).map_err(|_| {
        RecorderError::UnsupportedFormat(format!("byte rate of {format} overflows WAV field"))
    })?;
    let format_tag = if format.is_float() {
        FORMAT_TAG_IEEE_FLOAT
    } else {
        FORMAT_TAG_PCM
    };
    let block_align = format.channels() * format.bits_per_sample() / 8;

    let mut header = [0u8; WAV_HEADER_LEN];
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&(audio_bytes + RIFF_OVERHEAD).to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&FMT_CHUNK_LEN.to_le_bytes());
    header[20..22].copy_from_slice(&format_tag.to_le_bytes());
    header[22..24].copy_from_slice(&format.channels().to_le_bytes());
    header[24..28].copy_from_slice(&format.sample_rate().to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&format.bits_per_sample().to_le_bytes());
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&audio_bytes.to_le_bytes());
    Ok(header)
}

/// Parse a header written by [`encode`]. Extension chunks are not supported.
pub fn decode(header: &[u8]) -> Result<DecodedHeader> {
    if header.len() < WAV_HEADER_LEN {
        return Err(RecorderError::UnsupportedFormat(format!(
            "header is {} bytes, expected {WAV_HEADER_LEN}",
            header.len()
        )));
    }
    if &header[0..4] != b"RIFF"
        || &header[8..12] != b"WAVE"
        || &header[12..16] != b"fmt "
        || &header[36..40] != b"data"
    {
        return Err(RecorderError::UnsupportedFormat(
            "not a canonical RIFF/WAVE header".to_string(),
        ));
    }
    let u16_at = |at: usize| u16::from_le_bytes([header[at], header[at + 1]]);
    let u32_at = |at: usize| {
        u32::from_le_bytes([header[at], header[at + 1], header[at + 2], header[at + 3]])
    };

    let is_float = match u16_at(20) {
        FORMAT_TAG_PCM => false,
        FORMAT_TAG_IEEE_FLOAT => true,
        tag => {
            return Err(RecorderError::UnsupportedFormat(format!(
                "format tag {tag}"
            )))
        }
    };
    let format = SampleFormat::from_parts(u32_at(24), u16_at(22), u16_at(34), is_float)?;
    Ok(DecodedHeader {
        format,
        riff_len: u32_at(4),
        audio_bytes: u32_at(40),
    })
}

/// Overwrite the first 44 bytes of `target` with `header`; the payload is untouched.
pub fn write_header<W: Write + Seek + ?Sized>(
    target: &mut W,
    header: &[u8; WAV_HEADER_LEN],
) -> io::Result<()> {
    target.seek(SeekFrom::Start(0))?;
    target.write_all(header)?;
    target.flush()
}
