//! Command-line entry point.

use clap::Parser;
use kd_forest::{app, AppConfig, ColorSpace, OrderMode, Selection};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Paint every color of a sampled RGB cube onto one image, placing each
/// color next to its perceptual neighbors.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Use all colors of a DEPTH-bit sampling of the RGB cube.
    #[arg(
        short,
        long,
        value_name = "DEPTH",
        default_value_t = 24,
        value_parser = clap::value_parser!(u32).range(2..=24)
    )]
    bit_depth: u32,

    /// The order colors are placed in.
    #[arg(short = 'm', long, value_name = "MODE", default_value = "hue-sort")]
    order: OrderMode,

    /// How the pixel for each color is selected.
    #[arg(short = 'l', long, value_name = "MODE", default_value = "min")]
    selection: Selection,

    /// The color space distances are measured in.
    #[arg(short, long, value_name = "SPACE", default_value = "Lab")]
    color_space: ColorSpace,

    /// Write animation frames instead of a single image.
    #[arg(short, long)]
    animate: bool,

    /// Output file, or output directory with --animate
    /// [default: kd-forest.png, or frames when animating].
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Seed for the random number generator.
    #[arg(short = 'e', long, value_name = "SEED", default_value_t = 0)]
    seed: u32,

    /// X coordinate of the first placement [default: center].
    #[arg(short, long, value_name = "X")]
    x0: Option<u32>,

    /// Y coordinate of the first placement [default: center].
    #[arg(short, long, value_name = "Y")]
    y0: Option<u32>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let output = cli.output.unwrap_or_else(|| {
        PathBuf::from(if cli.animate { "frames" } else { "kd-forest.png" })
    });

    let config = AppConfig {
        bit_depth: cli.bit_depth,
        order: cli.order,
        selection: cli.selection,
        space: cli.color_space,
        animate: cli.animate,
        output,
        seed: cli.seed,
        x0: cli.x0,
        y0: cli.y0,
    };

    match app::run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
