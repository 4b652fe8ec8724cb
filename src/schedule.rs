//! Pass scheduling for color placement.
//!
//! Consuming a sorted color stream front to back produces visible banding:
//! long runs of near-identical colors land in one region before the frontier
//! moves on. Instead the driver visits the stream in striped passes with
//! bit-reversed spacing, so each pass sweeps the whole stream at a coarser
//! stride and perceptually similar colors are spread across time.

/// The order in which to place `colors[0..len]`.
///
/// Pass `p` (with stripe `s = 2^p`) visits indices `s - 1, 3s - 1, 5s - 1`
/// and so on: every other remaining index, at doubling strides. Each index
/// in `0..len` comes up exactly once, starting with index 0; striping
/// `0..16` yields `[0, 2, 4, 6, 8, 10, 12, 14, 1, 5, 9, 13, 3, 11, 7, 15]`.
pub fn striped_indices(len: usize) -> impl Iterator<Item = usize> {
    let passes = (0..).map(|p| 1usize << p).take_while(move |&s| s <= len);
    passes.flat_map(move |stripe| ((stripe - 1)..len).step_by(2 * stripe))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_striped_matches_reference_order() {
        let order: Vec<_> = striped_indices(16).collect();
        assert_eq!(order, [0, 2, 4, 6, 8, 10, 12, 14, 1, 5, 9, 13, 3, 11, 7, 15]);
    }

    #[test]
    fn test_striped_is_a_permutation() {
        for len in [1usize, 2, 4, 64, 1024, 100, 7] {
            let mut seen = vec![false; len];
            for i in striped_indices(len) {
                assert!(!seen[i], "index {} visited twice (len {})", i, len);
                seen[i] = true;
            }
            assert!(seen.iter().all(|&s| s), "some index unvisited (len {})", len);
        }
    }

    #[test]
    fn test_first_index_is_zero() {
        assert_eq!(striped_indices(1 << 10).next(), Some(0));
    }
}
