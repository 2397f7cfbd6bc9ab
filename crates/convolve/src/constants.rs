//! Container and signal-processing constants.

// RIFF/WAVE chunk tags.
pub const RIFF_TAG: [u8; 4] = *b"RIFF";
pub const WAVE_TAG: [u8; 4] = *b"WAVE";
pub const FMT_TAG: [u8; 4] = *b"fmt ";
pub const DATA_TAG: [u8; 4] = *b"data";

/// Size of the fixed part of the `fmt ` subchunk body.
pub const FMT_BASE_SIZE: u32 = 16;

// The only supported sample profile.
pub const SUPPORTED_CHANNELS: u16 = 1;
pub const SUPPORTED_BITS_PER_SAMPLE: u16 = 16;
pub const BYTES_PER_SAMPLE: usize = 2;
pub const WAVE_FORMAT_PCM: u16 = 1;

/// int16 <-> float scale: `i16::MIN` maps to exactly -1.0.
pub const PCM_SCALE: f32 = 32_768.0;

/// Output is normalised so the peak lands at `1 / HEADROOM_FACTOR` of full scale.
pub const HEADROOM_FACTOR: f32 = 1.1;

/// Output cells handed to one worker by the parallel engine.
pub const PARALLEL_SEGMENT: usize = 4_096;
