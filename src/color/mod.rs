//! Color enumeration and ordering.
//!
//! The generator consumes every color of a `B`-bit sampling of the sRGB
//! cube, exactly once, in a configurable order. The sampling allocates
//! channel bits from most to least perceptually important (G, then R, then
//! B) and slides each channel's value into the high bits of its 8-bit
//! field, so the sampled values span the full channel range.

pub mod hilbert;
pub mod space;

pub use self::space::{unpack, ColorSpace, Coord};

use self::hilbert::hilbert_point;
use crate::rng::Lcg;
use clap::ValueEnum;
use std::cmp::Ordering;

/// The order colors are fed to the placement driver.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum OrderMode {
    /// Sorted by hue angle.
    HueSort,
    /// Shuffled with the seeded generator.
    Random,
    /// Morton order (Z-order) over the channel grid.
    Morton,
    /// Compact Hilbert curve order over the channel grid.
    Hilbert,
    /// Natural order: G varies fastest, then R, then B.
    Sequential,
}

/// Bits allocated to each channel for a given depth, in (G, R, B) order.
pub fn channel_bits(bit_depth: u32) -> [u32; 3] {
    [(bit_depth + 2) / 3, (bit_depth + 1) / 3, bit_depth / 3]
}

/// Pack per-channel grid values into a `(R << 16) | (G << 8) | B` color,
/// sliding each value to the top of its 8-bit field.
fn pack(grb: [u32; 3], bits: [u32; 3]) -> u32 {
    let g = grb[0] << (16 - bits[0]);
    let r = grb[1] << (24 - bits[1]);
    let b = grb[2] << (8 - bits[2]);
    r | g | b
}

/// Channel grid point `i` positions along the natural order.
fn sequential_point(bits: &[u32; 3], i: u32) -> [u32; 3] {
    let mut n = i;
    let mut grb = [0; 3];
    for (channel, &b) in grb.iter_mut().zip(bits) {
        *channel = n & ((1 << b) - 1);
        n >>= b;
    }
    grb
}

/// Channel grid point `i` positions along the Morton (Z-order) curve:
/// bit `j` of the index becomes bit `j / 3` of channel `j mod 3`.
fn morton_point(bit_depth: u32, i: u32) -> [u32; 3] {
    let mut grb = [0; 3];
    for j in 0..bit_depth {
        grb[(j % 3) as usize] |= ((i >> j) & 1) << (j / 3);
    }
    grb
}

/// Every color of the `bit_depth`-bit sampling, in the given order.
///
/// The multiset of colors depends only on `bit_depth`; the order mode is a
/// permutation on top of it.
pub fn colors(bit_depth: u32, order: OrderMode, rng: &mut Lcg) -> Vec<u32> {
    let bits = channel_bits(bit_depth);
    let count = 1u32 << bit_depth;

    let mut colors = Vec::with_capacity(count as usize);
    for i in 0..count {
        let grb = match order {
            OrderMode::Morton => morton_point(bit_depth, i),
            OrderMode::Hilbert => hilbert_point(&bits, i),
            _ => sequential_point(&bits, i),
        };
        colors.push(pack(grb, bits));
    }

    match order {
        OrderMode::HueSort => colors.sort_by(|&a, &b| hue_cmp(a, b)),
        OrderMode::Random => shuffle(&mut colors, rng),
        _ => {}
    }

    colors
}

/// Numerator and denominator of the hue tangent: the hue angle of an RGB
/// color is `atan2(sqrt(3) * (G - B), 2R - G - B)`.
fn hue_ratio(color: u32) -> (i32, i32) {
    let [r, g, b] = unpack(color);
    let (r, g, b) = (r as i32, g as i32, b as i32);
    (g - b, 2 * r - g - b)
}

/// Total order on packed colors by hue angle in `[0, 2pi)`, using integer
/// arithmetic only.
///
/// The angle never has to be evaluated. Splitting on the signs of the
/// numerator and denominator orders the three regions
/// `d >= 0, n >= 0` < `d < 0` < `d >= 0, n < 0` outright; within a region
/// `atan` is increasing in `n/d` and both denominators share a sign, so
/// `n_a/d_a < n_b/d_b` exactly when `n_a*d_b < n_b*d_a`.
pub fn hue_cmp(a: u32, b: u32) -> Ordering {
    fn region(n: i32, d: i32) -> u8 {
        if d < 0 {
            1
        } else if n >= 0 {
            0
        } else {
            2
        }
    }

    let (an, ad) = hue_ratio(a);
    let (bn, bd) = hue_ratio(b);

    let order = region(an, ad).cmp(&region(bn, bd));
    if order != Ordering::Equal {
        return order;
    }

    // Zero numerators would make the cross-multiplication degenerate; 0/0
    // counts as hue 0, and a bare zero sorts by the sign of its denominator.
    if an == 0 || bn == 0 {
        let lhs = if ad >= 0 { an } else { -an };
        let rhs = if bd >= 0 { bn } else { -bn };
        return lhs.cmp(&rhs);
    }

    (an * bd).cmp(&(bn * ad))
}

/// Fisher-Yates shuffle driven by the seeded generator.
fn shuffle(colors: &mut [u32], rng: &mut Lcg) {
    for i in (1..colors.len()).rev() {
        let j = rng.below(i as u32 + 1) as usize;
        colors.swap(i, j);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const MODES: [OrderMode; 5] = [
        OrderMode::HueSort,
        OrderMode::Random,
        OrderMode::Morton,
        OrderMode::Hilbert,
        OrderMode::Sequential,
    ];

    #[test]
    fn test_channel_bit_allocation() {
        assert_eq!(channel_bits(24), [8, 8, 8]);
        assert_eq!(channel_bits(8), [3, 3, 2]);
        assert_eq!(channel_bits(2), [1, 1, 0]);
        for depth in 2..=24 {
            assert_eq!(channel_bits(depth).iter().sum::<u32>(), depth);
        }
    }

    #[test]
    fn test_sequential_enumeration_at_depth_2() {
        let mut rng = Lcg::new(0);
        let colors = colors(2, OrderMode::Sequential, &mut rng);
        assert_eq!(colors, [0x000000, 0x008000, 0x800000, 0x808000]);
    }

    #[test]
    fn test_every_color_distinct() {
        let mut rng = Lcg::new(0);
        for depth in [2, 5, 8, 12] {
            let colors = colors(depth, OrderMode::Sequential, &mut rng);
            assert_eq!(colors.len(), 1 << depth);
            let distinct: HashSet<_> = colors.iter().collect();
            assert_eq!(distinct.len(), colors.len());
        }
    }

    #[test]
    fn test_color_set_independent_of_order() {
        let mut rng = Lcg::new(99);
        let mut reference = colors(8, OrderMode::Sequential, &mut rng);
        reference.sort_unstable();

        for mode in MODES {
            let mut got = colors(8, mode, &mut rng);
            got.sort_unstable();
            assert_eq!(got, reference, "{:?} changed the color set", mode);
        }
    }

    #[test]
    fn test_channel_values_use_high_bit_strides() {
        let mut rng = Lcg::new(0);
        for color in colors(8, OrderMode::Sequential, &mut rng) {
            let [r, g, b] = unpack(color);
            // 3 bits for R and G, 2 for B.
            assert_eq!(r % 0x20, 0);
            assert_eq!(g % 0x20, 0);
            assert_eq!(b % 0x40, 0);
        }
    }

    #[test]
    fn test_hue_orders_the_primaries() {
        let red = 0xFF0000;
        let green = 0x00FF00;
        let blue = 0x0000FF;
        assert_eq!(hue_cmp(red, green), Ordering::Less);
        assert_eq!(hue_cmp(green, blue), Ordering::Less);
        assert_eq!(hue_cmp(red, blue), Ordering::Less);
    }

    #[test]
    fn test_greys_share_a_hue() {
        assert_eq!(hue_cmp(0x000000, 0xFFFFFF), Ordering::Equal);
        assert_eq!(hue_cmp(0x808080, 0x404040), Ordering::Equal);
    }

    #[test]
    fn test_hue_is_a_total_order() {
        let mut rng = Lcg::new(3);
        let sample: Vec<u32> = (0..512).map(|_| rng.below(1 << 24)).collect();

        let mut sorted = sample.clone();
        sorted.sort_by(|&a, &b| hue_cmp(a, b));
        for pair in sorted.windows(2) {
            assert_ne!(hue_cmp(pair[0], pair[1]), Ordering::Greater);
        }

        for &a in sample.iter().take(32) {
            for &b in sample.iter().take(32) {
                assert_eq!(hue_cmp(a, b), hue_cmp(b, a).reverse());
            }
        }
    }

    #[test]
    fn test_shuffle_is_seed_deterministic() {
        let mut rng1 = Lcg::new(42);
        let mut rng2 = Lcg::new(42);
        assert_eq!(
            colors(8, OrderMode::Random, &mut rng1),
            colors(8, OrderMode::Random, &mut rng2),
        );
    }
}
