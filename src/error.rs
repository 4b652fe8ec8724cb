//! Error types for image generation.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error for a generation run.
///
/// Configuration problems are recoverable in the sense that they are reported
/// with usage information; everything else indicates a broken environment or
/// a bug and terminates the run.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to {operation} `{}`: {source}", path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        source: io::Error,
    },

    #[error("failed to encode `{}`: {source}", path.display())]
    PngEncode {
        path: PathBuf,
        source: png::EncodingError,
    },

    /// A nearest-neighbor query ran against a forest with no live nodes.
    /// The placement driver seeds the frontier before its first query, so
    /// hitting this means the frontier bookkeeping is broken.
    #[error("nearest-neighbor query on an empty k-d forest")]
    EmptyForest,
}

/// Invalid configuration detected before generation starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("bit depth {0} out of range, expected 2..=24")]
    BitDepthOutOfRange(u32),

    #[error("initial pixel ({x}, {y}) is outside the {width}x{height} image")]
    SeedOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
}

impl Error {
    /// Wrap an I/O error with the operation and path that produced it.
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}
