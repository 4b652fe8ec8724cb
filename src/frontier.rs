//! Placement frontiers.
//!
//! A frontier owns the pixel grid and decides where each incoming color
//! lands. Candidate positions are indexed in a [`KdForest`] keyed by color
//! coordinates, so every placement is one nearest-neighbor query plus a
//! constant-sized patch of updates around the filled pixel. Pixels and
//! forest nodes reference each other by stable indices: the pixel table
//! owns pixels, the forest owns nodes, and neither holds a pointer into the
//! other.

use crate::color::Coord;
use crate::error::{Error, Result};
use crate::forest::{KdForest, NodeId};
use crate::rng::Lcg;

use clap::ValueEnum;
use nalgebra::Vector3;
use smallvec::SmallVec;

/// How the frontier picks the pixel for each color.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum Selection {
    /// Place next to the already-placed pixel with the closest color.
    Min,
    /// Place on the open pixel whose filled neighbors average closest.
    Mean,
}

/// A frontier strategy driving one image.
pub trait Frontier {
    /// Choose a pixel for a color with coordinate `target`, fill it, and
    /// return its position.
    fn place(&mut self, target: Coord) -> Result<(u32, u32)>;

    /// Number of candidate pixels currently indexed.
    fn len(&self) -> usize;
}

/// In-bounds Moore neighbors of a grid cell.
type Neighbors = SmallVec<[(u32, u32); 8]>;

fn moore_neighbors(x: u32, y: u32, width: u32, height: u32) -> Neighbors {
    let mut neighbors = Neighbors::new();
    for dy in -1i64..=1 {
        for dx in -1i64..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            let nx = x as i64 + dx;
            let ny = y as i64 + dy;
            if (0..width as i64).contains(&nx) && (0..height as i64).contains(&ny) {
                neighbors.push((nx as u32, ny as u32));
            }
        }
    }
    neighbors
}

fn pixel_index(width: u32, x: u32, y: u32) -> usize {
    (y * width + x) as usize
}

fn pixel_position(width: u32, index: u32) -> (u32, u32) {
    (index % width, index / width)
}

/// State of one pixel on a [`MinFrontier`].
#[derive(Clone, Copy, Default)]
struct MinPixel {
    filled: bool,
    /// Present while this (filled) pixel still borders an unfilled one.
    node: Option<NodeId>,
}

/// Frontier that queries over *filled* boundary pixels.
///
/// Each forest entry is a filled pixel that can still offer an unfilled
/// Moore neighbor, keyed by its own color. A placement finds the filled
/// pixel closest in color to the incoming one and spills onto a uniformly
/// random free neighbor, which grows blobs of similar color outward.
pub struct MinFrontier {
    pixels: Vec<MinPixel>,
    forest: KdForest,
    rng: Lcg,
    width: u32,
    height: u32,
    x0: u32,
    y0: u32,
    filled: usize,
}

impl MinFrontier {
    pub fn new(width: u32, height: u32, x0: u32, y0: u32, rng: Lcg) -> Self {
        let size = (width as usize) * (height as usize);
        Self {
            pixels: vec![MinPixel::default(); size],
            forest: KdForest::new(),
            rng,
            width,
            height,
            x0,
            y0,
            filled: 0,
        }
    }

    fn unfilled_neighbors(&self, x: u32, y: u32) -> Neighbors {
        moore_neighbors(x, y, self.width, self.height)
            .into_iter()
            .filter(|&(nx, ny)| !self.pixels[pixel_index(self.width, nx, ny)].filled)
            .collect()
    }

    fn fill(&mut self, x: u32, y: u32, coord: Coord) {
        let i = pixel_index(self.width, x, y);
        debug_assert!(!self.pixels[i].filled);
        self.pixels[i].filled = true;
        self.filled += 1;

        // A just-filled pixel joins the frontier only while it can still
        // offer an unfilled neighbor.
        if !self.unfilled_neighbors(x, y).is_empty() {
            self.pixels[i].node = Some(self.forest.insert(coord, i as u32));
        }

        // Filling this pixel may have sealed off adjacent frontier members.
        for (nx, ny) in moore_neighbors(x, y, self.width, self.height) {
            let j = pixel_index(self.width, nx, ny);
            if self.pixels[j].node.is_some() && self.unfilled_neighbors(nx, ny).is_empty() {
                if let Some(id) = self.pixels[j].node.take() {
                    self.forest.remove(id);
                }
            }
        }
    }
}

impl Frontier for MinFrontier {
    fn place(&mut self, target: Coord) -> Result<(u32, u32)> {
        let (x, y) = if self.filled == 0 {
            (self.x0, self.y0)
        } else {
            let pixel = self.forest.nearest(&target).ok_or(Error::EmptyForest)?;
            let (px, py) = pixel_position(self.width, pixel);

            // Every frontier member still has a free neighbor, or it would
            // have been removed when its last one filled.
            let candidates = self.unfilled_neighbors(px, py);
            debug_assert!(!candidates.is_empty());
            candidates[self.rng.below(candidates.len() as u32) as usize]
        };

        self.fill(x, y, target);
        Ok((x, y))
    }

    fn len(&self) -> usize {
        self.forest.len()
    }
}

/// State of one pixel on a [`MeanFrontier`].
#[derive(Clone, Copy)]
struct MeanPixel {
    filled: bool,
    /// Present while this (unfilled) pixel borders a filled one.
    node: Option<NodeId>,
    /// The pixel's color coordinate; meaningful once filled.
    coord: Coord,
}

impl Default for MeanPixel {
    fn default() -> Self {
        Self {
            filled: false,
            node: None,
            coord: Vector3::zeros(),
        }
    }
}

/// Frontier that queries over *unfilled* boundary pixels.
///
/// Each forest entry is an unfilled pixel adjacent to the placed region,
/// keyed by the mean color of its filled neighbors; a placement fills the
/// returned pixel directly. Smoother than [`MinFrontier`] but churns the
/// forest harder, since every placement re-keys up to eight neighbors.
pub struct MeanFrontier {
    pixels: Vec<MeanPixel>,
    forest: KdForest,
    width: u32,
    height: u32,
    x0: u32,
    y0: u32,
    filled: usize,
}

impl MeanFrontier {
    pub fn new(width: u32, height: u32, x0: u32, y0: u32) -> Self {
        let size = (width as usize) * (height as usize);
        Self {
            pixels: vec![MeanPixel::default(); size],
            forest: KdForest::new(),
            width,
            height,
            x0,
            y0,
            filled: 0,
        }
    }

    /// Mean coordinate of the filled Moore neighbors, if any.
    fn neighborhood_mean(&self, x: u32, y: u32) -> Option<Coord> {
        let mut sum = Vector3::zeros();
        let mut count = 0;
        for (nx, ny) in moore_neighbors(x, y, self.width, self.height) {
            let pixel = &self.pixels[pixel_index(self.width, nx, ny)];
            if pixel.filled {
                sum += pixel.coord;
                count += 1;
            }
        }
        (count > 0).then(|| sum / count as f64)
    }

    fn fill(&mut self, x: u32, y: u32, coord: Coord) {
        let i = pixel_index(self.width, x, y);
        debug_assert!(!self.pixels[i].filled);
        if let Some(id) = self.pixels[i].node.take() {
            self.forest.remove(id);
        }
        self.pixels[i].filled = true;
        self.pixels[i].coord = coord;
        self.filled += 1;

        // Every unfilled neighbor now sees one more filled pixel; its mean
        // shifts, so its forest entry is replaced wholesale.
        for (nx, ny) in moore_neighbors(x, y, self.width, self.height) {
            let j = pixel_index(self.width, nx, ny);
            if self.pixels[j].filled {
                continue;
            }
            let mean = self
                .neighborhood_mean(nx, ny)
                .expect("unfilled neighbor of a filled pixel must see it");
            if let Some(id) = self.pixels[j].node.take() {
                self.forest.remove(id);
            }
            self.pixels[j].node = Some(self.forest.insert(mean, j as u32));
        }
    }
}

impl Frontier for MeanFrontier {
    fn place(&mut self, target: Coord) -> Result<(u32, u32)> {
        let (x, y) = if self.filled == 0 {
            (self.x0, self.y0)
        } else {
            let pixel = self.forest.nearest(&target).ok_or(Error::EmptyForest)?;
            pixel_position(self.width, pixel)
        };

        self.fill(x, y, target);
        Ok((x, y))
    }

    fn len(&self) -> usize {
        self.forest.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_coord(rng: &mut Lcg) -> Coord {
        Vector3::new(
            rng.below(256) as f64,
            rng.below(256) as f64,
            rng.below(256) as f64,
        )
    }

    fn run_min(width: u32, height: u32, seed: u32) -> (MinFrontier, Vec<(u32, u32)>) {
        let mut frontier = MinFrontier::new(width, height, width / 2, height / 2, Lcg::new(seed));
        let mut rng = Lcg::new(!seed);
        let mut placed = Vec::new();
        for _ in 0..width * height {
            placed.push(frontier.place(test_coord(&mut rng)).unwrap());
        }
        (frontier, placed)
    }

    fn run_mean(width: u32, height: u32) -> (MeanFrontier, Vec<(u32, u32)>) {
        let mut frontier = MeanFrontier::new(width, height, width / 2, height / 2);
        let mut rng = Lcg::new(5);
        let mut placed = Vec::new();
        for _ in 0..width * height {
            placed.push(frontier.place(test_coord(&mut rng)).unwrap());
        }
        (frontier, placed)
    }

    #[test]
    fn test_first_placement_is_the_seed_pixel() {
        let mut min = MinFrontier::new(8, 4, 4, 2, Lcg::new(0));
        assert_eq!(min.place(Vector3::zeros()).unwrap(), (4, 2));

        let mut mean = MeanFrontier::new(8, 4, 4, 2);
        assert_eq!(mean.place(Vector3::zeros()).unwrap(), (4, 2));
    }

    #[test]
    fn test_every_pixel_filled_exactly_once() {
        let (_, placed) = run_min(8, 8, 1);
        let mut seen = vec![false; 64];
        for (x, y) in placed {
            let i = (y * 8 + x) as usize;
            assert!(!seen[i], "({}, {}) filled twice", x, y);
            seen[i] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_placements_touch_the_filled_region() {
        for placed in [run_min(8, 8, 2).1, run_mean(8, 8).1] {
            let mut filled = vec![vec![false; 8]; 8];
            for (i, &(x, y)) in placed.iter().enumerate() {
                if i > 0 {
                    let touches = moore_neighbors(x, y, 8, 8)
                        .into_iter()
                        .any(|(nx, ny)| filled[ny as usize][nx as usize]);
                    assert!(touches, "({}, {}) placed away from the region", x, y);
                }
                filled[y as usize][x as usize] = true;
            }
        }
    }

    #[test]
    fn test_min_forest_tracks_open_boundary() {
        let width = 8;
        let height = 8;
        let mut frontier = MinFrontier::new(width, height, 4, 4, Lcg::new(9));
        let mut rng = Lcg::new(10);

        for step in 0..width * height {
            frontier.place(test_coord(&mut rng)).unwrap();

            // A pixel is open exactly when filled with a free neighbor.
            let open = (0..height)
                .flat_map(|y| (0..width).map(move |x| (x, y)))
                .filter(|&(x, y)| {
                    frontier.pixels[pixel_index(width, x, y)].filled
                        && !frontier.unfilled_neighbors(x, y).is_empty()
                })
                .count();
            assert_eq!(frontier.len(), open, "boundary drifted at step {}", step);
        }
    }

    #[test]
    fn test_mean_forest_tracks_open_boundary() {
        let width = 8;
        let height = 8;
        let mut frontier = MeanFrontier::new(width, height, 4, 4);
        let mut rng = Lcg::new(11);

        for step in 0..width * height {
            frontier.place(test_coord(&mut rng)).unwrap();

            let open = (0..height)
                .flat_map(|y| (0..width).map(move |x| (x, y)))
                .filter(|&(x, y)| {
                    !frontier.pixels[pixel_index(width, x, y)].filled
                        && frontier.neighborhood_mean(x, y).is_some()
                })
                .count();
            assert_eq!(frontier.len(), open, "boundary drifted at step {}", step);
        }
    }

    #[test]
    fn test_frontier_drains_when_image_completes() {
        let (min, _) = run_min(8, 4, 3);
        assert_eq!(min.len(), 0);

        let (mean, _) = run_mean(8, 4);
        assert_eq!(mean.len(), 0);
    }

    #[test]
    fn test_min_placement_is_seed_deterministic() {
        let (_, a) = run_min(16, 8, 77);
        let (_, b) = run_min(16, 8, 77);
        assert_eq!(a, b);
    }
}
