//! Primary reference resolution and tagged-cell lookup.
//!
//! A grid's *primary* reference is the single distinguished portal pointing
//! at it — its parent link for exit and continuity purposes. Primary-ness is
//! a query over current cell contents, never cached state: it is recomputed
//! from the store on every call so that pushes which move reference cells
//! around are immediately reflected.
//!
//! # Determinism
//! Both lookups scan grids in lexicographic id order and cells row-major
//! (see [`GridStore::iter`]), so ties are broken identically across calls
//! and runs.

use crate::grid::{Cell, CellPosition, GridStore, TagFn};

/// Finds the primary reference to `target`.
///
/// Two passes: an explicit `primary = Some(true)` reference wins; otherwise
/// the first reference found in scan order is primary. Returns
/// `(parent_grid_id, row, col)`, or `None` if nothing references `target`
/// (i.e. it is a root grid).
pub fn find_primary_ref(store: &GridStore, target: &str) -> Option<(String, usize, usize)> {
    // Explicit marking wins over discovery order.
    for grid in store.iter() {
        for (row, col, cell) in grid.iter_cells() {
            if let Cell::Ref {
                grid: ref_target,
                primary: Some(true),
            } = cell
            {
                if ref_target == target {
                    return Some((grid.id().to_owned(), row, col));
                }
            }
        }
    }
    for grid in store.iter() {
        for (row, col, cell) in grid.iter_cells() {
            if let Cell::Ref {
                grid: ref_target, ..
            } = cell
            {
                if ref_target == target {
                    return Some((grid.id().to_owned(), row, col));
                }
            }
        }
    }
    None
}

/// Finds the first cell (in scan order) whose tag set contains `tag`.
pub fn find_tagged_cell(store: &GridStore, tag: &str, tag_fn: &TagFn) -> Option<CellPosition> {
    for grid in store.iter() {
        for (row, col, cell) in grid.iter_cells() {
            if tag_fn(cell).contains(tag) {
                return Some(CellPosition::new(grid.id(), row, col));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use std::collections::BTreeSet;

    fn store_with(grids: Vec<Grid>) -> GridStore {
        grids.into_iter().collect()
    }

    #[test]
    fn explicit_primary_wins_over_scan_order() {
        // "a" references t first in scan order, but "z" carries the explicit
        // marking.
        let store = store_with(vec![
            Grid::new("a", vec![vec![Cell::reference("t")]]),
            Grid::new("t", vec![vec![Cell::Empty]]),
            Grid::new(
                "z",
                vec![vec![Cell::Ref {
                    grid: "t".into(),
                    primary: Some(true),
                }]],
            ),
        ]);
        assert_eq!(find_primary_ref(&store, "t"), Some(("z".into(), 0, 0)));
    }

    #[test]
    fn first_reference_in_scan_order_is_primary() {
        let store = store_with(vec![
            Grid::new(
                "m",
                vec![vec![Cell::reference("t"), Cell::reference("t")]],
            ),
            Grid::new("t", vec![vec![Cell::Empty]]),
        ]);
        assert_eq!(find_primary_ref(&store, "t"), Some(("m".into(), 0, 0)));
    }

    #[test]
    fn root_grid_has_no_primary() {
        let store = store_with(vec![Grid::new("root", vec![vec![Cell::Empty]])]);
        assert_eq!(find_primary_ref(&store, "root"), None);
    }

    #[test]
    fn primary_is_stable_across_calls() {
        let store = store_with(vec![
            Grid::new("a", vec![vec![Cell::reference("t")]]),
            Grid::new("b", vec![vec![Cell::reference("t")]]),
            Grid::new("t", vec![vec![Cell::Empty]]),
        ]);
        let first = find_primary_ref(&store, "t");
        for _ in 0..3 {
            assert_eq!(find_primary_ref(&store, "t"), first);
        }
        assert_eq!(first, Some(("a".into(), 0, 0)));
    }

    #[test]
    fn demoted_reference_is_skipped_in_first_pass() {
        // ~t in "a" is explicitly secondary; it still wins the fallback pass
        // because no explicit primary exists.
        let store = store_with(vec![
            Grid::new(
                "a",
                vec![vec![Cell::Ref {
                    grid: "t".into(),
                    primary: Some(false),
                }]],
            ),
            Grid::new("t", vec![vec![Cell::Empty]]),
        ]);
        assert_eq!(find_primary_ref(&store, "t"), Some(("a".into(), 0, 0)));
    }

    #[test]
    fn tagged_cell_first_match() {
        let store = store_with(vec![
            Grid::new("a", vec![vec![Cell::concrete("x"), Cell::concrete("p")]]),
            Grid::new("b", vec![vec![Cell::concrete("p")]]),
        ]);
        let tag_fn = |cell: &Cell| -> BTreeSet<String> {
            if matches!(cell, Cell::Concrete(v) if v == "p") {
                BTreeSet::from(["player".to_owned()])
            } else {
                BTreeSet::new()
            }
        };
        assert_eq!(
            find_tagged_cell(&store, "player", &tag_fn),
            Some(CellPosition::new("a", 0, 1))
        );
        assert_eq!(find_tagged_cell(&store, "absent", &tag_fn), None);
    }
}
