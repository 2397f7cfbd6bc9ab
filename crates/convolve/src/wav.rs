//! Minimal RIFF/WAVE codec.
//!
//! Supported profile:
//! - one `fmt ` subchunk (16 bytes, or longer with opaque trailing bytes)
//! - a `data` subchunk immediately after it
//! - mono, 16-bit signed little-endian samples
//!
//! Fields are read and written one at a time in little-endian order; nothing here
//! depends on in-memory struct layout.

use std::io::{self, Read, Write};

use thiserror::Error;
use tracing::{debug, warn};

use crate::constants::{
    BYTES_PER_SAMPLE, DATA_TAG, FMT_BASE_SIZE, FMT_TAG, RIFF_TAG, SUPPORTED_BITS_PER_SAMPLE,
    SUPPORTED_CHANNELS, WAVE_FORMAT_PCM, WAVE_TAG,
};

#[derive(Debug, Error)]
pub enum WavError {
    #[error("bad chunk tag: expected {expected:?}, found {found:?}")]
    BadTag {
        expected: &'static str,
        found: String,
    },
    #[error(
        "unsupported WAV profile: {channels} channel(s) at {bits_per_sample} bits (need mono 16-bit)"
    )]
    UnsupportedProfile { channels: u16, bits_per_sample: u16 },
    #[error("fmt subchunk too small: {0} bytes (need at least 16)")]
    FmtTooSmall(u32),
    #[error("unexpected end of stream")]
    Truncated,
    #[error("payload of {0} bytes does not fit in a RIFF container")]
    TooLarge(usize),
    #[error("io error: {0}")]
    Io(#[source] io::Error),
}

impl WavError {
    fn from_read(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Self::Truncated
        } else {
            Self::Io(e)
        }
    }
}

/// The RIFF header plus the fixed fields of the `fmt ` subchunk.
///
/// Tags are not stored: decoding rejects anything but the canonical values and
/// encoding always writes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavFormatHeader {
    /// RIFF chunk size as found in the file. Never written back; see [`riff_chunk_size`].
    pub chunk_size: u32,
    pub fmt_size: u32,
    pub audio_format: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
}

impl WavFormatHeader {
    /// Header for a fresh mono 16-bit PCM stream.
    #[must_use]
    pub fn mono_pcm16(sample_rate: u32) -> Self {
        let block_align = SUPPORTED_CHANNELS * SUPPORTED_BITS_PER_SAMPLE / 8;
        Self {
            chunk_size: 0,
            fmt_size: FMT_BASE_SIZE,
            audio_format: WAVE_FORMAT_PCM,
            channels: SUPPORTED_CHANNELS,
            sample_rate,
            byte_rate: sample_rate * u32::from(block_align),
            block_align,
            bits_per_sample: SUPPORTED_BITS_PER_SAMPLE,
        }
    }
}

/// Header of the `data` subchunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataChunkHeader {
    pub data_len: u32,
}

impl DataChunkHeader {
    /// Header describing exactly `n_samples` 16-bit samples.
    pub fn for_samples(n_samples: usize) -> Result<Self, WavError> {
        let bytes = n_samples
            .checked_mul(BYTES_PER_SAMPLE)
            .ok_or(WavError::TooLarge(n_samples))?;
        let data_len = u32::try_from(bytes).map_err(|_| WavError::TooLarge(bytes))?;
        Ok(Self { data_len })
    }

    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.data_len as usize / BYTES_PER_SAMPLE
    }
}

/// A fully decoded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavFile {
    pub header: WavFormatHeader,
    /// Opaque `fmt ` bytes past the fixed 16; empty for plain PCM headers.
    pub extra: Vec<u8>,
    pub samples: Vec<i16>,
}

fn read_array<const N: usize, R: Read>(r: &mut R) -> Result<[u8; N], WavError> {
    let mut buf = [0u8; N];
    r.read_exact(&mut buf).map_err(WavError::from_read)?;
    Ok(buf)
}

fn read_u16_le<R: Read>(r: &mut R) -> Result<u16, WavError> {
    read_array(r).map(u16::from_le_bytes)
}

fn read_u32_le<R: Read>(r: &mut R) -> Result<u32, WavError> {
    read_array(r).map(u32::from_le_bytes)
}

/// Read exactly `len` bytes without trusting `len` for the allocation size.
fn read_bytes<R: Read>(r: &mut R, len: usize) -> Result<Vec<u8>, WavError> {
    let mut out = Vec::new();
    r.take(len as u64)
        .read_to_end(&mut out)
        .map_err(WavError::from_read)?;
    if out.len() != len {
        return Err(WavError::Truncated);
    }
    Ok(out)
}

fn expect_tag<R: Read>(r: &mut R, expected: [u8; 4], name: &'static str) -> Result<(), WavError> {
    let found: [u8; 4] = read_array(r)?;
    if found != expected {
        return Err(WavError::BadTag {
            expected: name,
            found: String::from_utf8_lossy(&found).into_owned(),
        });
    }
    Ok(())
}

/// RIFF chunk size for a file with the given `fmt ` body and `data` body sizes.
///
/// Counts the `WAVE` tag, the `fmt ` subchunk (header + body) and the `data`
/// subchunk (header + body).
pub fn riff_chunk_size(fmt_size: u32, data_len: u32) -> Result<u32, WavError> {
    4u32.checked_add(8)
        .and_then(|n| n.checked_add(fmt_size))
        .and_then(|n| n.checked_add(8))
        .and_then(|n| n.checked_add(data_len))
        .ok_or(WavError::TooLarge(data_len as usize))
}

/// Decode the RIFF header and `fmt ` subchunk, including any extension bytes.
pub fn decode_header<R: Read>(r: &mut R) -> Result<(WavFormatHeader, Vec<u8>), WavError> {
    expect_tag(r, RIFF_TAG, "RIFF")?;
    let chunk_size = read_u32_le(r)?;
    expect_tag(r, WAVE_TAG, "WAVE")?;
    expect_tag(r, FMT_TAG, "fmt ")?;

    let fmt_size = read_u32_le(r)?;
    if fmt_size < FMT_BASE_SIZE {
        return Err(WavError::FmtTooSmall(fmt_size));
    }

    let header = WavFormatHeader {
        chunk_size,
        fmt_size,
        audio_format: read_u16_le(r)?,
        channels: read_u16_le(r)?,
        sample_rate: read_u32_le(r)?,
        byte_rate: read_u32_le(r)?,
        block_align: read_u16_le(r)?,
        bits_per_sample: read_u16_le(r)?,
    };

    if header.channels != SUPPORTED_CHANNELS
        || header.bits_per_sample != SUPPORTED_BITS_PER_SAMPLE
    {
        return Err(WavError::UnsupportedProfile {
            channels: header.channels,
            bits_per_sample: header.bits_per_sample,
        });
    }
    if header.audio_format != WAVE_FORMAT_PCM {
        warn!(
            audio_format = header.audio_format,
            "non-PCM format code, treating samples as 16-bit PCM"
        );
    }

    let extra = read_bytes(r, (fmt_size - FMT_BASE_SIZE) as usize)?;
    debug!(
        sample_rate = header.sample_rate,
        fmt_size,
        extra_len = extra.len(),
        "decoded fmt subchunk"
    );
    Ok((header, extra))
}

/// Decode the `data` subchunk header that must follow the `fmt ` subchunk.
pub fn decode_data_chunk_header<R: Read>(r: &mut R) -> Result<DataChunkHeader, WavError> {
    expect_tag(r, DATA_TAG, "data")?;
    let data_len = read_u32_le(r)?;
    if data_len % 2 == 1 {
        warn!(data_len, "odd data length, ignoring the trailing byte");
    }
    Ok(DataChunkHeader { data_len })
}

/// Read the PCM region described by `data`.
pub fn decode_samples<R: Read>(r: &mut R, data: &DataChunkHeader) -> Result<Vec<i16>, WavError> {
    let raw = read_bytes(r, data.data_len as usize)?;
    Ok(raw
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect())
}

/// Write the RIFF header and `fmt ` subchunk.
///
/// `fmt_size` is written as `16 + extra.len()` and the RIFF chunk size is
/// recomputed from `data_len`; `header.chunk_size` is ignored.
pub fn encode_header<W: Write>(
    header: &WavFormatHeader,
    extra: &[u8],
    data_len: u32,
    w: &mut W,
) -> Result<(), WavError> {
    let extra_len = u32::try_from(extra.len()).map_err(|_| WavError::TooLarge(extra.len()))?;
    let fmt_size = FMT_BASE_SIZE
        .checked_add(extra_len)
        .ok_or(WavError::TooLarge(extra.len()))?;
    let chunk_size = riff_chunk_size(fmt_size, data_len)?;

    let mut buf = Vec::with_capacity(20 + fmt_size as usize);
    buf.extend_from_slice(&RIFF_TAG);
    buf.extend_from_slice(&chunk_size.to_le_bytes());
    buf.extend_from_slice(&WAVE_TAG);
    buf.extend_from_slice(&FMT_TAG);
    buf.extend_from_slice(&fmt_size.to_le_bytes());
    buf.extend_from_slice(&header.audio_format.to_le_bytes());
    buf.extend_from_slice(&header.channels.to_le_bytes());
    buf.extend_from_slice(&header.sample_rate.to_le_bytes());
    buf.extend_from_slice(&header.byte_rate.to_le_bytes());
    buf.extend_from_slice(&header.block_align.to_le_bytes());
    buf.extend_from_slice(&header.bits_per_sample.to_le_bytes());
    buf.extend_from_slice(extra);
    w.write_all(&buf).map_err(WavError::Io)
}

/// Write a `data` subchunk holding `samples`; returns the header that was written.
pub fn encode_data_chunk<W: Write>(
    samples: &[i16],
    w: &mut W,
) -> Result<DataChunkHeader, WavError> {
    let data = DataChunkHeader::for_samples(samples.len())?;
    let mut buf = Vec::with_capacity(8 + data.data_len as usize);
    buf.extend_from_slice(&DATA_TAG);
    buf.extend_from_slice(&data.data_len.to_le_bytes());
    for s in samples {
        buf.extend_from_slice(&s.to_le_bytes());
    }
    w.write_all(&buf).map_err(WavError::Io)?;
    Ok(data)
}

/// Decode a whole file held in memory. Bytes after the `data` region are ignored.
pub fn decode_wav(bytes: &[u8]) -> Result<WavFile, WavError> {
    let mut r = bytes;
    let (header, extra) = decode_header(&mut r)?;
    let data = decode_data_chunk_header(&mut r)?;
    let samples = decode_samples(&mut r, &data)?;
    Ok(WavFile {
        header,
        extra,
        samples,
    })
}

/// Encode a whole file into memory with consistent size fields.
pub fn encode_wav(
    header: &WavFormatHeader,
    extra: &[u8],
    samples: &[i16],
) -> Result<Vec<u8>, WavError> {
    let data = DataChunkHeader::for_samples(samples.len())?;
    let mut out = Vec::with_capacity(44 + extra.len() + data.data_len as usize);
    encode_header(header, extra, data.data_len, &mut out)?;
    encode_data_chunk(samples, &mut out)?;
    Ok(out)
}
