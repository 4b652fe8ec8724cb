//! PNG output and animation frame management.

use crate::error::{Error, Result};
use image::RgbImage;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Still frames appended after the last placement, holding the finished
/// image on screen for a few seconds when the sequence is encoded as video.
const TERMINAL_HOLD: u32 = 120;

/// Encode a bitmap as an 8-bit RGB PNG.
///
/// The file is tagged as sRGB, with fallback gAMA and cHRM chunks for
/// decoders that ignore the sRGB chunk.
pub fn write_png(bitmap: &RgbImage, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|e| Error::io("create", path, e))?;

    let mut encoder = png::Encoder::new(BufWriter::new(file), bitmap.width(), bitmap.height());
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_srgb(png::SrgbRenderingIntent::AbsoluteColorimetric);
    encoder.set_source_gamma(png::ScaledFloat::from_scaled(45_455));
    encoder.set_source_chromaticities(png::SourceChromaticities::new(
        (0.3127, 0.3290),
        (0.6400, 0.3300),
        (0.3000, 0.6000),
        (0.1500, 0.0600),
    ));

    let png_error = |source| Error::PngEncode {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = encoder.write_header().map_err(png_error)?;
    writer.write_image_data(bitmap.as_raw()).map_err(png_error)?;
    writer.finish().map_err(png_error)
}

/// Writes the numbered frame sequence for animate mode.
pub struct FrameWriter {
    dir: PathBuf,
    frame: u32,
}

impl FrameWriter {
    /// Name of the final image inside the frame directory; the terminal
    /// frames all resolve to this file.
    const LAST: &'static str = "last.png";

    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| Error::io("create directory", &dir, e))?;
        Ok(Self { dir, frame: 0 })
    }

    fn frame_path(&self, frame: u32) -> PathBuf {
        self.dir.join(format!("{:04}.png", frame))
    }

    /// Write the next numbered frame.
    pub fn write(&mut self, bitmap: &RgbImage) -> Result<()> {
        write_png(bitmap, &self.frame_path(self.frame))?;
        self.frame += 1;
        Ok(())
    }

    /// Write the finished image and the trailing hold frames.
    pub fn finish(mut self, bitmap: &RgbImage) -> Result<()> {
        let last = self.dir.join(Self::LAST);
        write_png(bitmap, &last)?;

        for _ in 0..TERMINAL_HOLD {
            let path = self.frame_path(self.frame);
            Self::link_or_copy(&last, &path)?;
            self.frame += 1;
        }

        Ok(())
    }

    /// Hold frames are symlinks where the platform has them, copies
    /// elsewhere.
    #[cfg(unix)]
    fn link_or_copy(_last: &Path, frame: &Path) -> Result<()> {
        std::os::unix::fs::symlink(Self::LAST, frame).map_err(|e| Error::io("symlink", frame, e))
    }

    #[cfg(not(unix))]
    fn link_or_copy(last: &Path, frame: &Path) -> Result<()> {
        fs::copy(last, frame)
            .map(|_| ())
            .map_err(|e| Error::io("copy", frame, e))
    }
}
