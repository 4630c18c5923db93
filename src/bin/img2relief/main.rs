// img2relief - Convert a PNG or TGA image into a smoothed heightmap
//
// Pipeline:
//   1. Decode the image into a canonical 8-bit buffer
//   2. Average channels into a heightmap
//   3. Smooth the heightmap
//   4. Report, and optionally write a grayscale preview
//
// Usage: cargo run --bin img2relief -- <image> [--smooths N] [--thresh F]
//        [--hscale N] [--vscale N] [--preview out.png]

mod preview;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use relief_engine::pipeline::{DEFAULT_HORIZONTAL_SCALE, DEFAULT_THRESHOLD, DEFAULT_VERTICAL_SCALE};
use relief_engine::heightmap::DEFAULT_SMOOTHING_PASSES;
use relief_engine::{Config, MeshParams, Pipeline};

/// Generate heightmap data from a TGA or PNG image.
#[derive(Parser, Debug)]
#[command(name = "img2relief", version, about, long_about = None)]
struct Args {
    /// Input image (.tga or .png).
    #[arg(value_name = "IMAGE")]
    input: PathBuf,

    /// Maximum mesh/heightmap error.
    #[arg(long, default_value_t = DEFAULT_THRESHOLD, value_name = "FLOAT")]
    thresh: f32,

    /// Smoothing passes on heightmap data before meshing.
    #[arg(long, default_value_t = DEFAULT_SMOOTHING_PASSES, value_name = "INT")]
    smooths: u32,

    /// Horizontal scale, pixels per inch.
    #[arg(long, default_value_t = DEFAULT_HORIZONTAL_SCALE, value_name = "INT",
          value_parser = clap::value_parser!(u32).range(1..))]
    hscale: u32,

    /// Vertical scale, image gradations per inch.
    #[arg(long, default_value_t = DEFAULT_VERTICAL_SCALE, value_name = "INT",
          value_parser = clap::value_parser!(u32).range(1..))]
    vscale: u32,

    /// Write the heightmap as an 8-bit grayscale PNG.
    #[arg(long, value_name = "PATH")]
    preview: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("img2relief={log_level},relief_engine={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if let Err(err) = run(&args) {
        tracing::error!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run(args: &Args) -> Result<()> {
    let config = Config {
        smoothing_passes: args.smooths,
        mesh: MeshParams {
            threshold: args.thresh,
            horizontal_scale: args.hscale,
            vertical_scale: args.vscale,
        },
        ..Config::default()
    };

    let pipeline = Pipeline::new(config);
    let mut sink = preview::Report::new(args.preview.clone());

    let summary = pipeline
        .run(&args.input, &mut sink)
        .with_context(|| format!("unable to convert {}", args.input.display()))??;

    println!("{summary}");
    Ok(())
}
