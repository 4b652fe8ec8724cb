//! Paint every color of a sampled RGB cube onto a single image.
//!
//! The image has one pixel per color; each incoming color is placed next to
//! the already-placed colors it resembles most, so the finished bitmap reads
//! as a smooth field instead of noise. The engine behind that query is a
//! dynamic k-d forest ([`forest`]), driven by a placement frontier
//! ([`frontier`]) and fed colors in banding-resistant striped passes
//! ([`schedule`]).

pub mod app;
pub mod color;
pub mod error;
pub mod forest;
pub mod frontier;
pub mod output;
pub mod rng;
pub mod schedule;

pub use app::{dimensions, generate, run, AppConfig};
pub use color::{ColorSpace, OrderMode};
pub use error::{ConfigError, Error, Result};
pub use frontier::Selection;
