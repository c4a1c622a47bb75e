//! graphtrace: turn a directory of video frames into graphing-calculator
//! expressions.
//!
//! Reads `frame0001.<ext>`, `frame0002.<ext>`, ... from the frame
//! directory, vectorizes every frame in parallel, and writes a JSON
//! manifest with one ordered expression list per frame plus the canvas
//! size and viewer settings.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin graphtrace -- [OPTIONS]
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, ValueEnum};
use graphtrace_pipeline::{GradientNorm, PipelineConfig, SmoothingMode};
use graphtrace_render::{
    FrameSource, RenderError, RenderManifest, RenderOptions, ViewerSettings,
};
use tracing::level_filters::LevelFilter;

/// Convert video frames into coloured parametric Bezier expressions.
///
/// Frames must be named `frame0001.<ext>`, `frame0002.<ext>`, ... inside
/// the frame directory.
#[derive(Parser)]
#[command(name = "graphtrace", version)]
struct Cli {
    /// Directory holding the numbered frames.
    #[arg(short = 'f', long, default_value = FrameSource::DEFAULT_DIRECTORY)]
    frames: PathBuf,

    /// Frame file extension.
    #[arg(short = 'e', long, default_value = FrameSource::DEFAULT_EXTENSION)]
    extension: String,

    /// Line colour shown by the viewer, as `#rrggbb`.
    #[arg(short = 'c', long, default_value = ViewerSettings::DEFAULT_LINE_COLOR)]
    colour: String,

    /// Start every frame with bilateral smoothing enabled.
    #[arg(short = 'b', long)]
    bilateral: bool,

    /// Gradient magnitude formula for smoothed-mode edge detection.
    #[arg(long, value_enum, default_value_t = Gradient::L2)]
    gradient: Gradient,

    /// Multiplier applied to every emitted coordinate.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_SCALE_FACTOR)]
    scale: f64,

    /// Let the viewer offer each frame as an image download.
    #[arg(short = 'd', long)]
    download_images: bool,

    /// Hide the grid behind the graph.
    #[arg(short = 'g', long)]
    hide_grid: bool,

    /// Worker threads (defaults to one per processing unit).
    #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    threads: Option<usize>,

    /// Write the manifest here instead of stdout.
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Full pipeline config as a JSON string.
    ///
    /// When provided, `--bilateral`, `--gradient` and `--scale` are
    /// ignored. The JSON must be a valid `PipelineConfig` serialization;
    /// missing fields take their defaults.
    #[arg(long)]
    config_json: Option<String>,

    /// More log output (repeat for more).
    #[arg(short = 'v', long, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Only log errors.
    #[arg(short = 'q', long)]
    quiet: bool,
}

/// Gradient formula selection.
#[derive(Clone, Copy, ValueEnum)]
enum Gradient {
    /// Sum of absolute derivatives.
    L1,
    /// Euclidean magnitude.
    L2,
}

/// Build a [`PipelineConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and the
/// individual pipeline flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<PipelineConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(PipelineConfig {
        initial_mode: if cli.bilateral {
            SmoothingMode::Smoothed
        } else {
            SmoothingMode::Plain
        },
        gradient: match cli.gradient {
            Gradient::L1 => GradientNorm::L1,
            Gradient::L2 => GradientNorm::L2,
        },
        scale_factor: cli.scale,
        ..PipelineConfig::default()
    })
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        LevelFilter::ERROR
    } else {
        match verbose {
            0 => LevelFilter::INFO,
            1 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

/// Print `err` and every error in its source chain.
fn report(err: &dyn Error) {
    eprintln!("Error: {err}");
    let mut source = err.source();
    while let Some(cause) = source {
        eprintln!("  caused by: {cause}");
        source = cause.source();
    }
}

fn report_render_error(err: &RenderError) {
    report(err);
    if let Some(hint) = err.naming_hint() {
        eprintln!();
        eprintln!("{hint}");
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = config.validate() {
        report(&e);
        eprintln!("Run with --help for the accepted options.");
        return ExitCode::FAILURE;
    }

    let settings = ViewerSettings {
        line_color: cli.colour.clone(),
        show_grid: !cli.hide_grid,
        download_images: cli.download_images,
    };
    if let Err(e) = settings.validate() {
        report(&e);
        eprintln!("Run with --help for the accepted options.");
        return ExitCode::FAILURE;
    }

    let source = FrameSource::new(&cli.frames, &cli.extension);
    let options = RenderOptions {
        threads: cli.threads,
    };
    tracing::debug!(?config, ?options, "resolved configuration");

    let output = match graphtrace_render::render(&source, &config, &options) {
        Ok(output) => output,
        Err(e) => {
            report_render_error(&e);
            return ExitCode::FAILURE;
        }
    };
    eprintln!(
        "Rendered {} frames in {:.2}s",
        output.frames.len(),
        output.elapsed.as_secs_f64()
    );

    let manifest = RenderManifest::new(output, config.scale_factor, &settings);
    let json = match serde_json::to_string(&manifest) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Error serializing manifest: {e}");
            return ExitCode::FAILURE;
        }
    };

    match cli.output {
        Some(ref path) => {
            if let Err(e) = std::fs::write(path, &json) {
                eprintln!("Error writing manifest to {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
            eprintln!("Manifest written to {} ({} bytes)", path.display(), json.len());
        }
        None => println!("{json}"),
    }

    ExitCode::SUCCESS
}
