use super::Extent;

/// Regions gained and lost when a window moves from one extent to another.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtentDiff {
    /// Parts of the new extent not covered by the old one.
    pub added: Vec<Extent>,
    /// Parts of the old extent no longer covered by the new one.
    pub removed: Vec<Extent>,
}

/// Computes the newly covered and newly uncovered sub-extents between `old`
/// and `new`.
///
/// Disjoint extents replace each other wholesale. Overlapping extents yield
/// at most one added and one removed piece per edge. Empty pieces are never
/// returned, so two empty inputs produce two empty lists.
pub fn diff_extents(old: Extent, new: Extent) -> ExtentDiff {
    if !old.intersects(&new) {
        return ExtentDiff {
            added: non_empty(new),
            removed: non_empty(old),
        };
    }

    let mut added = Vec::with_capacity(2);
    if new.end() > old.end() {
        added.push(Extent::from_bounds(old.end(), new.end()));
    }
    if old.start > new.start {
        added.push(Extent::from_bounds(new.start, old.start));
    }

    let mut removed = Vec::with_capacity(2);
    if new.end() < old.end() {
        removed.push(Extent::from_bounds(new.end(), old.end()));
    }
    if old.start < new.start {
        removed.push(Extent::from_bounds(old.start, new.start));
    }

    ExtentDiff { added, removed }
}

fn non_empty(extent: Extent) -> Vec<Extent> {
    if extent.is_empty() {
        Vec::new()
    } else {
        vec![extent]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disjoint_extents_replace_window() {
        let old = Extent::new(0.0, 100.0);
        let new = Extent::new(500.0, 100.0);
        let diff = diff_extents(old, new);
        assert_eq!(diff.added, vec![new]);
        assert_eq!(diff.removed, vec![old]);
    }

    #[test]
    fn test_scroll_down_adds_below_removes_above() {
        let diff = diff_extents(Extent::new(0.0, 300.0), Extent::new(100.0, 300.0));
        assert_eq!(diff.added, vec![Extent::new(300.0, 100.0)]);
        assert_eq!(diff.removed, vec![Extent::new(0.0, 100.0)]);
    }

    #[test]
    fn test_scroll_up_adds_above_removes_below() {
        let diff = diff_extents(Extent::new(100.0, 300.0), Extent::new(0.0, 300.0));
        assert_eq!(diff.added, vec![Extent::new(0.0, 100.0)]);
        assert_eq!(diff.removed, vec![Extent::new(300.0, 100.0)]);
    }

    #[test]
    fn test_growing_window_only_adds() {
        let diff = diff_extents(Extent::new(100.0, 100.0), Extent::new(50.0, 200.0));
        assert_eq!(
            diff.added,
            vec![Extent::new(200.0, 50.0), Extent::new(50.0, 50.0)]
        );
        assert!(diff.removed.is_empty());
    }

    #[test]
    fn test_identical_extents_produce_nothing() {
        let e = Extent::new(10.0, 90.0);
        assert_eq!(diff_extents(e, e), ExtentDiff::default());
    }

    #[test]
    fn test_degenerate_inputs_yield_empty_lists() {
        let diff = diff_extents(Extent::ZERO, Extent::new(40.0, 0.0));
        assert!(diff.added.is_empty());
        assert!(diff.removed.is_empty());
    }

    #[test]
    fn test_from_empty_window_adds_whole_new_extent() {
        let new = Extent::new(-150.0, 900.0);
        let diff = diff_extents(Extent::ZERO, new);
        assert_eq!(diff.added, vec![new]);
        assert!(diff.removed.is_empty());
    }
}
