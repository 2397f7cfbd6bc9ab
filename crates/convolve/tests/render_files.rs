use std::fs;
use std::path::{Path, PathBuf};

use convolve::pipeline::{Engine, RenderOptions, render_files};
use convolve::wav::decode_wav;
use convolve::{ConvolveError, WavError};

/// Canonical mono file; `extra` extends the fmt subchunk, `riff_size` plants a bogus size.
fn write_wav(
    path: &Path,
    channels: u16,
    bits: u16,
    extra: &[u8],
    samples: &[i16],
    riff_size: Option<u32>,
) {
    let fmt_size = 16 + extra.len() as u32;
    let data_len = (samples.len() * 2) as u32;
    let block_align = channels * bits / 8;

    let mut wav = Vec::<u8>::new();
    wav.extend_from_slice(b"RIFF");
    let riff_size = riff_size.unwrap_or(4 + 8 + fmt_size + 8 + data_len);
    wav.extend_from_slice(&riff_size.to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&fmt_size.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes());
    wav.extend_from_slice(&channels.to_le_bytes());
    wav.extend_from_slice(&22_050u32.to_le_bytes());
    wav.extend_from_slice(&(22_050u32 * u32::from(block_align)).to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&bits.to_le_bytes());
    wav.extend_from_slice(extra);
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    for s in samples {
        wav.extend_from_slice(&s.to_le_bytes());
    }
    fs::write(path, wav).expect("write fixture");
}

fn paths(dir: &Path) -> (PathBuf, PathBuf, PathBuf) {
    (dir.join("dry.wav"), dir.join("ir.wav"), dir.join("wet.wav"))
}

fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("read dir")
        .map(|e| e.expect("dir entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn header_fidelity_with_plain_fmt() {
    let dir = tempfile::tempdir().unwrap();
    let (input, ir, out) = paths(dir.path());
    write_wav(&input, 1, 16, &[], &[8_000, -4_000, 2_000, 0], Some(12345));
    write_wav(&ir, 1, 16, &[], &[16_384, 8_192], None);

    let stats = render_files(&input, &ir, &out, RenderOptions::default()).expect("render");
    assert_eq!(stats.output_samples, 5);

    let src = fs::read(&input).unwrap();
    let dst = fs::read(&out).unwrap();
    assert_eq!(dst.len(), 44 + 5 * 2);
    // Format and data tags are carried byte for byte.
    assert_eq!(dst[..4], src[..4]);
    assert_eq!(dst[8..40], src[8..40]);
    // Sizes match what was written.
    let riff = u32::from_le_bytes(dst[4..8].try_into().unwrap());
    let data_len = u32::from_le_bytes(dst[40..44].try_into().unwrap());
    assert_eq!(riff as usize, dst.len() - 8);
    assert_eq!(data_len, 10);

    assert_eq!(dir_entries(dir.path()), vec!["dry.wav", "ir.wav", "wet.wav"]);
}

#[test]
fn extended_fmt_bytes_follow_the_input_only() {
    let dir = tempfile::tempdir().unwrap();
    let (input, ir, out) = paths(dir.path());
    write_wav(&input, 1, 16, &[0x5A, 0xA5], &[1_000, 2_000, 3_000], None);
    write_wav(&ir, 1, 16, &[9, 9, 9, 9, 9, 9], &[32_767], None);

    render_files(&input, &ir, &out, RenderOptions::default()).expect("render");
    let wet = decode_wav(&fs::read(&out).unwrap()).expect("decode output");
    assert_eq!(wet.header.fmt_size, 18);
    assert_eq!(wet.extra, vec![0x5A, 0xA5]);
    assert_eq!(wet.samples.len(), 3);
    // Single-tap impulse: output keeps the input's shape, peak at 1/1.1 of full scale.
    assert_eq!(wet.samples, vec![9_930, 19_859, 29_789]);
}

#[test]
fn silent_impulse_writes_silence() {
    let dir = tempfile::tempdir().unwrap();
    let (input, ir, out) = paths(dir.path());
    write_wav(&input, 1, 16, &[], &[100, 200, 300], None);
    write_wav(&ir, 1, 16, &[], &[0, 0, 0], None);

    let opts = RenderOptions {
        engine: Engine::Parallel,
    };
    let stats = render_files(&input, &ir, &out, opts).expect("render");
    assert_eq!(stats.peak, 0.0);
    let wet = decode_wav(&fs::read(&out).unwrap()).expect("decode output");
    assert_eq!(wet.samples, vec![0; 5]);
}

#[test]
fn stereo_input_is_rejected_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let (input, ir, out) = paths(dir.path());
    write_wav(&input, 2, 16, &[], &[1, 2, 3, 4], None);
    write_wav(&ir, 1, 16, &[], &[1], None);

    let err = render_files(&input, &ir, &out, RenderOptions::default()).unwrap_err();
    match err {
        ConvolveError::Format {
            path,
            source: WavError::UnsupportedProfile { channels, .. },
        } => {
            assert_eq!(path, input);
            assert_eq!(channels, 2);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(dir_entries(dir.path()), vec!["dry.wav", "ir.wav"]);
}

#[test]
fn wrong_bit_depths_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (input, ir, out) = paths(dir.path());
    write_wav(&input, 1, 16, &[], &[1, 2], None);
    for bits in [8u16, 24] {
        write_wav(&ir, 1, bits, &[], &[0, 0, 0], None);
        let err = render_files(&input, &ir, &out, RenderOptions::default()).unwrap_err();
        match &err {
            ConvolveError::Format {
                path,
                source: WavError::UnsupportedProfile {
                    bits_per_sample, ..
                },
            } => {
                assert_eq!(path, &ir);
                assert_eq!(*bits_per_sample, bits);
            }
            other => panic!("{bits}-bit: unexpected error {other:?}"),
        }
        assert!(!out.exists());
    }
}

#[test]
fn missing_input_is_reported_before_output_is_touched() {
    let dir = tempfile::tempdir().unwrap();
    let (_, ir, out) = paths(dir.path());
    let input = dir.path().join("nope.wav");
    write_wav(&ir, 1, 16, &[], &[1], None);

    let err = render_files(&input, &ir, &out, RenderOptions::default()).unwrap_err();
    assert!(matches!(err, ConvolveError::FileNotFound { ref path, .. } if *path == input));
    assert_eq!(dir_entries(dir.path()), vec!["ir.wav"]);
}

#[test]
fn truncated_input_leaves_existing_output_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let (input, ir, out) = paths(dir.path());
    write_wav(&input, 1, 16, &[], &[1, 2, 3, 4], None);
    let mut bytes = fs::read(&input).unwrap();
    bytes.truncate(bytes.len() - 3);
    fs::write(&input, bytes).unwrap();
    write_wav(&ir, 1, 16, &[], &[1], None);
    fs::write(&out, b"previous").unwrap();

    let err = render_files(&input, &ir, &out, RenderOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        ConvolveError::Format {
            source: WavError::Truncated,
            ..
        }
    ));
    assert_eq!(fs::read(&out).unwrap(), b"previous");
    assert_eq!(dir_entries(dir.path()), vec!["dry.wav", "ir.wav", "wet.wav"]);
}

#[test]
fn unwritable_output_is_a_write_error() {
    let dir = tempfile::tempdir().unwrap();
    let (input, ir) = (dir.path().join("dry.wav"), dir.path().join("ir.wav"));
    let out = dir.path().join("missing-dir").join("wet.wav");
    write_wav(&input, 1, 16, &[], &[1], None);
    write_wav(&ir, 1, 16, &[], &[1], None);

    let err = render_files(&input, &ir, &out, RenderOptions::default()).unwrap_err();
    assert!(matches!(err, ConvolveError::FileWrite { ref path, .. } if *path == out));
}
