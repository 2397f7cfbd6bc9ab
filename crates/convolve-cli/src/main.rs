use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use convolve::pipeline::{Engine, RenderOptions, check_wav_path, render_files};
use tracing::{Level, info};

#[derive(Debug, Parser)]
#[command(name = "convolve")]
#[command(about = "Convolve a dry WAV recording with an impulse response", long_about = None)]
struct Args {
    /// Dry input recording (mono 16-bit PCM .wav).
    #[arg(value_parser = parse_wav_arg)]
    input: PathBuf,

    /// Impulse response (mono 16-bit PCM .wav).
    #[arg(value_parser = parse_wav_arg)]
    impulse: PathBuf,

    /// Output file (.wav). Only created once rendering succeeds.
    #[arg(value_parser = parse_wav_arg)]
    output: PathBuf,

    /// Split the convolution across all cores.
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long, default_value_t = false, conflicts_with = "verbose")]
    quiet: bool,
}

fn parse_wav_arg(arg: &str) -> Result<PathBuf, String> {
    check_wav_path(arg).map_err(|e| e.to_string())
}

fn init_logging(args: &Args) {
    let level = match (args.quiet, args.verbose) {
        (true, _) => Level::WARN,
        (false, 0) => Level::INFO,
        (false, 1) => Level::DEBUG,
        (false, _) => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    let opts = RenderOptions {
        engine: if args.parallel {
            Engine::Parallel
        } else {
            Engine::Direct
        },
    };

    let stats = render_files(&args.input, &args.impulse, &args.output, opts)
        .with_context(|| format!("render {:?}", args.output))?;
    info!(
        input_samples = stats.input_samples,
        impulse_samples = stats.impulse_samples,
        output_samples = stats.output_samples,
        sample_rate = stats.sample_rate,
        peak = stats.peak,
        "done"
    );
    Ok(())
}
