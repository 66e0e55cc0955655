//! Property tests for the extent difference.
//!
//! Extents use integer bounds so membership can be checked exactly at the
//! half-integer midpoints of every unit cell.

use proptest::prelude::*;
use thumbgrid::geometry::{diff_extents, Extent};

fn arb_extent() -> impl Strategy<Value = Extent> {
    (-50i32..50, 0i32..40).prop_map(|(start, length)| Extent::new(start as f64, length as f64))
}

fn covered(pieces: &[Extent], x: f64) -> usize {
    pieces.iter().filter(|piece| piece.contains(x)).count()
}

proptest! {
    #[test]
    fn disjoint_extents_swap_whole_windows(old in arb_extent(), new in arb_extent()) {
        prop_assume!(!old.intersects(&new));
        let diff = diff_extents(old, new);
        let expect = |e: Extent| if e.is_empty() { vec![] } else { vec![e] };
        prop_assert_eq!(diff.added, expect(new));
        prop_assert_eq!(diff.removed, expect(old));
    }

    #[test]
    fn pieces_equal_set_differences(old in arb_extent(), new in arb_extent()) {
        let diff = diff_extents(old, new);
        prop_assert!(diff.added.iter().chain(&diff.removed).all(|piece| !piece.is_empty()));

        for cell in -100..100 {
            let x = cell as f64 + 0.5;
            let in_old = old.contains(x);
            let in_new = new.contains(x);
            // Each point is covered at most once.
            prop_assert_eq!(covered(&diff.added, x), usize::from(in_new && !in_old));
            prop_assert_eq!(covered(&diff.removed, x), usize::from(in_old && !in_new));
        }
    }

    #[test]
    fn identical_extents_yield_nothing(extent in arb_extent()) {
        let diff = diff_extents(extent, extent);
        prop_assert!(diff.added.is_empty());
        prop_assert!(diff.removed.is_empty());
    }
}
