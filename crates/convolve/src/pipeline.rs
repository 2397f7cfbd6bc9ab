//! End-to-end render: decode -> normalise -> convolve -> rescale -> encode.
//!
//! The output header is the dry input's header (including any extension bytes);
//! the impulse response only contributes samples.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::ConvolveError;
use crate::conv::{ConvolutionResult, convolve, convolve_parallel};
use crate::sample::{normalize, rescale};
use crate::wav::{
    DataChunkHeader, WavError, WavFile, WavFormatHeader, decode_wav, encode_data_chunk,
    encode_header,
};

/// Which convolution form to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Engine {
    #[default]
    Direct,
    /// Output split into disjoint segments on the rayon pool.
    Parallel,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    pub engine: Engine,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderStats {
    pub input_samples: usize,
    pub impulse_samples: usize,
    pub output_samples: usize,
    pub peak: f32,
    pub sample_rate: u32,
}

/// A rendered file that has not been encoded yet.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub header: WavFormatHeader,
    pub extra: Vec<u8>,
    pub samples: Vec<i16>,
    pub stats: RenderStats,
}

impl Rendered {
    /// Encode with size fields recomputed from the rendered sample count.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<(), WavError> {
        let data = DataChunkHeader::for_samples(self.samples.len())?;
        encode_header(&self.header, &self.extra, data.data_len, w)?;
        encode_data_chunk(&self.samples, w)?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, WavError> {
        let mut out = Vec::with_capacity(44 + self.extra.len() + self.samples.len() * 2);
        self.write_to(&mut out)?;
        Ok(out)
    }
}

/// Accept only arguments that end in `.wav` (case-sensitive).
pub fn check_wav_path(arg: &str) -> Result<PathBuf, ConvolveError> {
    if arg.ends_with(".wav") {
        Ok(PathBuf::from(arg))
    } else {
        Err(ConvolveError::Usage(format!(
            "{arg:?} does not have a .wav extension"
        )))
    }
}

/// Convolve two decoded files. `input`'s header is retained; `impulse`'s is dropped.
pub fn render(input: &WavFile, impulse: &WavFile, opts: RenderOptions) -> Rendered {
    if input.header.sample_rate != impulse.header.sample_rate {
        warn!(
            input_rate = input.header.sample_rate,
            impulse_rate = impulse.header.sample_rate,
            "sample rates differ, keeping the input rate"
        );
    }

    let x = normalize(&input.samples);
    let h = normalize(&impulse.samples);
    debug!(
        input_samples = x.len(),
        impulse_samples = h.len(),
        engine = ?opts.engine,
        "convolving"
    );

    let ConvolutionResult { signal, peak } = match opts.engine {
        Engine::Direct => convolve(&x, &h),
        Engine::Parallel => convolve_parallel(&x, &h),
    };
    let samples = rescale(&signal, peak);

    Rendered {
        header: input.header,
        extra: input.extra.clone(),
        stats: RenderStats {
            input_samples: x.len(),
            impulse_samples: h.len(),
            output_samples: samples.len(),
            peak,
            sample_rate: input.header.sample_rate,
        },
        samples,
    }
}

/// Render two in-memory WAV files into an encoded output file.
pub fn render_bytes(
    input: &[u8],
    impulse: &[u8],
    opts: RenderOptions,
) -> Result<(Vec<u8>, RenderStats), WavError> {
    let input = decode_wav(input)?;
    let impulse = decode_wav(impulse)?;
    let rendered = render(&input, &impulse, opts);
    Ok((rendered.to_bytes()?, rendered.stats))
}

fn load(path: &Path) -> Result<WavFile, ConvolveError> {
    let bytes = fs::read(path).map_err(|source| ConvolveError::FileNotFound {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = bytes.len(), "read file");
    decode_wav(&bytes).map_err(|source| ConvolveError::Format {
        path: path.to_path_buf(),
        source,
    })
}

/// Output staged next to its destination; removed on drop unless committed.
struct PartialOutput {
    part: PathBuf,
    dest: PathBuf,
    file: Option<BufWriter<File>>,
}

impl PartialOutput {
    fn create(dest: &Path) -> Result<Self, ConvolveError> {
        let mut name = dest.file_name().unwrap_or(dest.as_os_str()).to_os_string();
        name.push(".part");
        let part = dest.with_file_name(name);
        let file = File::create(&part).map_err(|source| ConvolveError::FileWrite {
            path: dest.to_path_buf(),
            source,
        })?;
        Ok(Self {
            part,
            dest: dest.to_path_buf(),
            file: Some(BufWriter::new(file)),
        })
    }

    fn write_err(&self, source: std::io::Error) -> ConvolveError {
        ConvolveError::FileWrite {
            path: self.dest.clone(),
            source,
        }
    }

    fn commit(mut self, rendered: &Rendered) -> Result<(), ConvolveError> {
        let Some(mut w) = self.file.take() else {
            return Ok(());
        };
        rendered.write_to(&mut w).map_err(|e| match e {
            WavError::Io(source) => self.write_err(source),
            other => ConvolveError::Format {
                path: self.dest.clone(),
                source: other,
            },
        })?;
        let file = w
            .into_inner()
            .map_err(|e| self.write_err(e.into_error()))?;
        file.sync_all().map_err(|e| self.write_err(e))?;
        drop(file);
        fs::rename(&self.part, &self.dest).map_err(|e| self.write_err(e))?;
        // Renamed away; nothing left for Drop to clean up.
        self.part = PathBuf::new();
        Ok(())
    }
}

impl Drop for PartialOutput {
    fn drop(&mut self) {
        self.file = None;
        if !self.part.as_os_str().is_empty() {
            let _ = fs::remove_file(&self.part);
        }
    }
}

/// Render `input` convolved with `impulse` into `output`.
///
/// `output` only appears once the whole file has been written; on any failure no
/// file is left at `output` (an existing file there is left untouched).
pub fn render_files(
    input: &Path,
    impulse: &Path,
    output: &Path,
    opts: RenderOptions,
) -> Result<RenderStats, ConvolveError> {
    let input_wav = load(input)?;
    let impulse_wav = load(impulse)?;
    let staged = PartialOutput::create(output)?;

    let rendered = render(&input_wav, &impulse_wav, opts);
    staged.commit(&rendered)?;

    info!(
        output = %output.display(),
        samples = rendered.stats.output_samples,
        peak = rendered.stats.peak,
        "wrote output"
    );
    Ok(rendered.stats)
}
