//! Exact-rational coordinate continuity across portal boundaries.
//!
//! Cells are modeled as occupying a continuous `[0, 1]` axis per dimension:
//! cell `i` of `d` has its *center* at `(i+1)/(d+1)` and an *extent* running
//! between the midpoints toward its neighbours' centers (the extreme cells
//! extend to 0 and 1; a single-cell dimension spans all of `[0, 1]`).
//! Mapping a child grid's `[0, 1]` axis onto the extent of the parent cell
//! that holds it, and inverting that map, lets an exit position be carried
//! up to a common ancestor and back down into a sibling grid so that motion
//! continuing across a portal boundary stays positionally aligned.
//!
//! # Exactness
//! All arithmetic is `BigRational`. These maps are composed and inverted
//! once per portal hop; any floating-point rendition accumulates error and
//! silently drifts the re-entry cell after enough hops, so lossless
//! rationals are a correctness requirement, not an optimization.
//!
//! # Caller invariants
//! The climb and descent helpers are deliberately strict: the requested
//! ancestor must actually be reachable through primary references, and a
//! descent chain must connect the ancestor to the target. The navigator
//! guarantees both; violations are assertions (logic bugs), not errors.

use num_rational::BigRational;
use num_traits::{One, ToPrimitive, Zero};

use crate::grid::{Axis, GridStore};
use crate::resolver::find_primary_ref;

/// One recorded portal hop: the `Ref` cell at `(row, col)` of `parent`
/// pointing into `child`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefHop {
    pub parent: String,
    pub row: usize,
    pub col: usize,
    pub child: String,
}

impl RefHop {
    /// The hop's cell coordinate along the given axis.
    #[inline]
    fn index(&self, axis: Axis) -> usize {
        match axis {
            Axis::Rows => self.row,
            Axis::Cols => self.col,
        }
    }
}

#[inline]
fn ratio(numer: usize, denom: usize) -> BigRational {
    BigRational::new(numer.into(), denom.into())
}

/// Center of cell `i` in a dimension of `d` cells: `(i+1)/(d+1)`.
///
/// # Panics
/// If `i >= d` or `d == 0` (debug assertion).
pub fn cell_center_fraction(i: usize, d: usize) -> BigRational {
    debug_assert!(d >= 1 && i < d, "cell index {} out of dimension {}", i, d);
    ratio(i + 1, d + 1)
}

/// The extent `[lo, hi]` of cell `i` in a dimension of `d` cells.
///
/// Interior bounds sit at the midpoints between adjacent centers,
/// `(2i+1)/(2(d+1))` and `(2i+3)/(2(d+1))`; the first cell extends to 0 and
/// the last to 1.
pub fn cell_extent(i: usize, d: usize) -> (BigRational, BigRational) {
    debug_assert!(d >= 1 && i < d, "cell index {} out of dimension {}", i, d);
    let lo = if i == 0 {
        BigRational::zero()
    } else {
        ratio(2 * i + 1, 2 * (d + 1))
    };
    let hi = if i == d - 1 {
        BigRational::one()
    } else {
        ratio(2 * i + 3, 2 * (d + 1))
    };
    (lo, hi)
}

/// Maps a fraction in a child grid's `[0, 1]` axis into the extent of parent
/// cell `parent_index` (of `parent_dim` cells).
pub fn map_through_parent(
    local: &BigRational,
    parent_index: usize,
    parent_dim: usize,
) -> BigRational {
    let (lo, hi) = cell_extent(parent_index, parent_dim);
    &lo + local * (hi - &lo)
}

/// Exact inverse of [`map_through_parent`], clamped to `[0, 1]` to absorb
/// positions that fall just outside the cell's extent.
pub fn map_to_child(
    parent_fraction: &BigRational,
    parent_index: usize,
    parent_dim: usize,
) -> BigRational {
    let (lo, hi) = cell_extent(parent_index, parent_dim);
    let span = &hi - &lo;
    debug_assert!(span > BigRational::zero());
    let local = (parent_fraction - lo) / span;
    if local < BigRational::zero() {
        BigRational::zero()
    } else if local > BigRational::one() {
        BigRational::one()
    } else {
        local
    }
}

/// Converts a fraction in `[0, 1]` to a cell index by flooring, clamped to
/// `[0, d-1]` (the `f == 1` edge lands in the last cell).
pub fn fraction_to_cell_index(fraction: &BigRational, d: usize) -> usize {
    debug_assert!(d >= 1);
    let scaled = fraction * BigRational::from_integer(d.into());
    let floored = scaled
        .floor()
        .to_integer()
        .to_usize()
        .unwrap_or(0);
    floored.min(d - 1)
}

/// Carries a cell's center fraction upward through primary references until
/// reaching `stop_at`, returning the fraction in the ancestor's coordinates
/// together with the ancestor id.
///
/// # Panics
/// If a grid on the way up has no primary reference before `stop_at` is
/// reached — the caller must guarantee the ancestor lies on the primary
/// chain.
pub fn exit_ancestor_fraction(
    store: &GridStore,
    grid_id: &str,
    cell_index: usize,
    axis: Axis,
    stop_at: &str,
) -> (BigRational, String) {
    let dim = store.grid(grid_id).len(axis);
    let mut fraction = cell_center_fraction(cell_index, dim);
    let mut current = grid_id.to_owned();

    while current != stop_at {
        let (parent, row, col) = find_primary_ref(store, &current).unwrap_or_else(|| {
            panic!(
                "ancestor {:?} is not reachable from {:?} via primary references",
                stop_at, grid_id
            )
        });
        let parent_dim = store.grid(&parent).len(axis);
        let parent_index = match axis {
            Axis::Rows => row,
            Axis::Cols => col,
        };
        fraction = map_through_parent(&fraction, parent_index, parent_dim);
        current = parent;
    }
    (fraction, current)
}

/// Walks a recorded hop chain downward from `ancestor` to `target`,
/// inverse-mapping `fraction` at every hop, and converts the result to a
/// cell index along `axis` in the target grid.
///
/// The chain must be exactly the hops taken since the matching exit: its
/// first hop leaves `ancestor` and its last hop lands in `target`.
pub fn entry_fraction_to_child(
    store: &GridStore,
    target: &str,
    fraction: &BigRational,
    axis: Axis,
    ancestor: &str,
    chain: &[RefHop],
) -> usize {
    debug_assert!(!chain.is_empty(), "descent chain must contain the entry hop");
    debug_assert_eq!(chain[0].parent, ancestor, "chain must start at the ancestor");
    debug_assert_eq!(
        chain[chain.len() - 1].child,
        target,
        "chain must end at the target grid"
    );

    let mut fraction = fraction.clone();
    for hop in chain {
        let parent_dim = store.grid(&hop.parent).len(axis);
        fraction = map_to_child(&fraction, hop.index(axis), parent_dim);
    }
    fraction_to_cell_index(&fraction, store.grid(target).len(axis))
}
