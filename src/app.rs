//! Application orchestration.
//!
//! Ties the pipeline together: enumerate and order the colors, stripe them
//! across placement passes, drive the selected frontier, and hand finished
//! bitmaps to the PNG writer.

use crate::color::{self, unpack, ColorSpace, OrderMode};
use crate::error::{ConfigError, Result};
use crate::frontier::{Frontier, MeanFrontier, MinFrontier, Selection};
use crate::output::{self, FrameWriter};
use crate::rng::Lcg;
use crate::schedule;

use image::{Rgb, RgbImage};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// A full generation run, as derived from command-line arguments.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bit_depth: u32,
    pub order: OrderMode,
    pub selection: Selection,
    pub space: ColorSpace,
    pub animate: bool,
    pub output: PathBuf,
    pub seed: u32,
    /// First placement, defaulting to the image center.
    pub x0: Option<u32>,
    pub y0: Option<u32>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bit_depth: 24,
            order: OrderMode::HueSort,
            selection: Selection::Min,
            space: ColorSpace::Lab,
            animate: false,
            output: PathBuf::from("kd-forest.png"),
            seed: 0,
            x0: None,
            y0: None,
        }
    }
}

/// Image dimensions for a bit depth: the width exponent rounds up, the
/// height exponent rounds down, so `width * height == 2^bit_depth`.
pub fn dimensions(bit_depth: u32) -> (u32, u32) {
    (1 << ((bit_depth + 1) / 2), 1 << (bit_depth / 2))
}

/// Run a complete generation, writing the image (or frame directory) named
/// by the configuration.
pub fn run(config: &AppConfig) -> Result<()> {
    if config.animate {
        let mut frames = FrameWriter::new(&config.output)?;
        let bitmap = generate(config, Some(&mut frames))?;
        frames.finish(&bitmap)
    } else {
        let bitmap = generate(config, None)?;
        output::write_png(&bitmap, &config.output)
    }
}

/// Generate the bitmap, optionally streaming intermediate frames.
///
/// A frame is emitted every `width` placements, starting with the empty
/// canvas, so the animation advances one row's worth of pixels per frame.
pub fn generate(config: &AppConfig, mut frames: Option<&mut FrameWriter>) -> Result<RgbImage> {
    let bit_depth = config.bit_depth;
    if !(2..=24).contains(&bit_depth) {
        return Err(ConfigError::BitDepthOutOfRange(bit_depth).into());
    }

    let (width, height) = dimensions(bit_depth);
    let x0 = config.x0.unwrap_or(width / 2);
    let y0 = config.y0.unwrap_or(height / 2);
    if x0 >= width || y0 >= height {
        return Err(ConfigError::SeedOutOfBounds {
            x: x0,
            y: y0,
            width,
            height,
        }
        .into());
    }

    let size = (width as usize) * (height as usize);
    info!(
        "generating a {}-bit {}x{} image ({} pixels)",
        bit_depth, width, height, size
    );

    // The ordering pass and the frontier share one random stream, so the
    // seed pins down the entire run.
    let mut rng = Lcg::new(config.seed);
    let colors = color::colors(bit_depth, config.order, &mut rng);

    let mut frontier: Box<dyn Frontier> = match config.selection {
        Selection::Min => Box::new(MinFrontier::new(width, height, x0, y0, rng)),
        Selection::Mean => Box::new(MeanFrontier::new(width, height, x0, y0)),
    };

    let mut bitmap = RgbImage::new(width, height);
    let started = Instant::now();
    let mut max_frontier = 0;

    for (placed, index) in schedule::striped_indices(size).enumerate() {
        if placed % width as usize == 0 {
            if let Some(frames) = frames.as_deref_mut() {
                frames.write(&bitmap)?;
            }
            info!(
                "{:6.2}% placed, frontier holds {} pixels",
                100.0 * placed as f64 / size as f64,
                frontier.len(),
            );
        }

        let color = colors[index];
        let (x, y) = frontier.place(config.space.to_coord(color))?;
        bitmap.put_pixel(x, y, Rgb(unpack(color)));
        max_frontier = max_frontier.max(frontier.len());
    }

    let elapsed = started.elapsed().as_secs_f64().max(f64::EPSILON);
    info!(
        "placed {} pixels in {:.2}s ({:.0} px/s), peak frontier {}",
        size,
        elapsed,
        size as f64 / elapsed,
        max_frontier,
    );

    Ok(bitmap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn config(bit_depth: u32, selection: Selection, space: ColorSpace) -> AppConfig {
        AppConfig {
            bit_depth,
            order: OrderMode::HueSort,
            selection,
            space,
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_dimensions_round_the_exponents() {
        assert_eq!(dimensions(2), (2, 2));
        assert_eq!(dimensions(3), (4, 2));
        assert_eq!(dimensions(8), (16, 16));
        assert_eq!(dimensions(24), (4096, 4096));
    }

    #[test]
    fn test_generated_image_holds_the_exact_color_set() {
        for selection in [Selection::Min, Selection::Mean] {
            for space in [ColorSpace::Rgb, ColorSpace::Lab, ColorSpace::Luv] {
                let cfg = config(6, selection, space);
                let bitmap = generate(&cfg, None).unwrap();

                let mut seen: Vec<u32> = bitmap
                    .pixels()
                    .map(|p| ((p[0] as u32) << 16) | ((p[1] as u32) << 8) | p[2] as u32)
                    .collect();
                seen.sort_unstable();

                let mut expected = color::colors(6, OrderMode::Sequential, &mut Lcg::new(0));
                expected.sort_unstable();

                assert_eq!(seen, expected, "{:?}/{:?}", selection, space);
            }
        }
    }

    #[test]
    fn test_bit_depth_is_validated() {
        for bad in [0, 1, 25] {
            let cfg = AppConfig {
                bit_depth: bad,
                ..AppConfig::default()
            };
            assert!(matches!(
                generate(&cfg, None),
                Err(Error::Config(ConfigError::BitDepthOutOfRange(_)))
            ));
        }
    }

    #[test]
    fn test_seed_pixel_is_validated() {
        let cfg = AppConfig {
            bit_depth: 4,
            x0: Some(4),
            ..AppConfig::default()
        };
        assert!(matches!(
            generate(&cfg, None),
            Err(Error::Config(ConfigError::SeedOutOfBounds { .. }))
        ));
    }

    #[test]
    fn test_same_config_same_image() {
        let cfg = AppConfig {
            bit_depth: 8,
            order: OrderMode::Random,
            seed: 1234,
            ..AppConfig::default()
        };
        let a = generate(&cfg, None).unwrap();
        let b = generate(&cfg, None).unwrap();
        assert_eq!(a.as_raw(), b.as_raw());
    }
}
