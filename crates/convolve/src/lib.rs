//! Convolution reverb for mono 16-bit PCM WAV files.
//!
//! This crate provides:
//! - A minimal RIFF/WAVE codec (`wav`)
//! - int16 <-> f32 sample conversion with headroom rescaling (`sample`)
//! - Direct and parallel linear convolution (`conv`)
//! - The file-to-file render pipeline (`pipeline`)

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub mod constants;
pub mod conv;
pub mod math;
pub mod pipeline;
pub mod sample;
pub mod wav;

pub use conv::{ConvolutionResult, convolve, convolve_parallel};
pub use pipeline::{Engine, RenderOptions, RenderStats, check_wav_path, render_files};
pub use wav::WavError;

/// Run-level failure. Every variant ends the run.
#[derive(Debug, Error)]
pub enum ConvolveError {
    #[error("{0}")]
    Usage(String),
    #[error("cannot open {path:?} for reading")]
    FileNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot write output file {path:?}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid WAV file {path:?}")]
    Format {
        path: PathBuf,
        #[source]
        source: WavError,
    },
}
