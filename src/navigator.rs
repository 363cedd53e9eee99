//! Cross-grid cursor movement: advancing, boundary-exit cascades, and
//! portal entry.
//!
//! A [`Navigator`] is a cursor over a fixed store snapshot: a position, a
//! travel direction, and the continuity bookkeeping needed to keep motion
//! positionally aligned when it crosses portal boundaries. It never mutates
//! the store.
//!
//! # Invariants
//! - Real movement (a successful [`Navigator::try_advance`]) resets all
//!   continuity state. Portal entries between movements accumulate onto the
//!   state recorded by the last boundary exit.
//! - Both cycle guards are per-operation: the exit cascade refuses to revisit
//!   a reference cell within one cascade, and [`Navigator::try_enter`]
//!   refuses to re-enter a grid already entered since the last real
//!   movement. Neither guard persists across movements.
//!
//! # Determinism
//! Cascades climb primary references only, and primary resolution is
//! deterministic (see [`crate::resolver`]), so the same snapshot and cursor
//! always cascade to the same landing cell.

use std::collections::BTreeSet;

use tracing::trace;

use crate::continuity::{entry_fraction_to_child, exit_ancestor_fraction, RefHop};
use crate::grid::{CellPosition, Direction, GridStore};
use crate::resolver::find_primary_ref;

/// Continuity bookkeeping between a boundary exit and the portal entries
/// that follow it.
#[derive(Debug, Clone)]
struct Continuity {
    /// Where the cursor stood when it stepped over an edge.
    exit: CellPosition,
    /// The grid the exit cascade landed in.
    ancestor: String,
    /// Portal hops taken since the cascade, outermost first.
    hops: Vec<RefHop>,
}

/// A movable cursor over a store snapshot.
///
/// Cloning is cheap (the store is borrowed), which is what makes speculative
/// probing — "would this cursor be able to advance?" — affordable inside the
/// push search.
#[derive(Debug, Clone)]
pub struct Navigator<'a> {
    store: &'a GridStore,
    position: CellPosition,
    direction: Direction,
    continuity: Option<Continuity>,
    /// Grids entered since the last real movement.
    entered: BTreeSet<String>,
}

impl<'a> Navigator<'a> {
    /// Creates a cursor at `position` facing `direction`.
    pub fn new(store: &'a GridStore, position: CellPosition, direction: Direction) -> Navigator<'a> {
        Navigator {
            store,
            position,
            direction,
            continuity: None,
            entered: BTreeSet::new(),
        }
    }

    /// The current position.
    #[inline]
    pub fn position(&self) -> &CellPosition {
        &self.position
    }

    /// The current travel direction.
    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The cell under the cursor.
    #[inline]
    pub fn cell(&self) -> &crate::grid::Cell {
        self.store.cell(&self.position)
    }

    /// Reverses the travel direction. Continuity state is untouched.
    #[inline]
    pub fn flip(&mut self) {
        self.direction = self.direction.opposite();
    }

    /// Steps one cell in the travel direction.
    ///
    /// In-bounds: the cursor moves and all continuity state resets. Over an
    /// edge: the boundary exit is recorded, then the cascade climbs primary
    /// references, re-attempting the same step from each reference cell in
    /// turn, until a step lands in bounds. Returns `false` when the cascade
    /// reaches a root grid's edge or revisits a reference cell (an exit
    /// cycle); the cursor does not move in that case.
    pub fn try_advance(&mut self) -> bool {
        let (dr, dc) = self.direction.delta();
        let grid = self.store.grid(&self.position.grid);
        let next_row = self.position.row as isize + dr;
        let next_col = self.position.col as isize + dc;

        if grid.contains(next_row, next_col) {
            self.position.row = next_row as usize;
            self.position.col = next_col as usize;
            self.continuity = None;
            self.entered.clear();
            return true;
        }

        let exit = self.position.clone();
        let mut visited: BTreeSet<CellPosition> = BTreeSet::new();
        let mut current = self.position.grid.clone();
        loop {
            let (parent, row, col) = match find_primary_ref(self.store, &current) {
                Some(found) => found,
                // Root grid: the universe has no outside.
                None => return false,
            };
            let ref_pos = CellPosition::new(parent.clone(), row, col);
            if !visited.insert(ref_pos.clone()) {
                trace!(position = %exit, cycle_at = %ref_pos, "exit cascade cycled");
                return false;
            }

            let parent_grid = self.store.grid(&parent);
            let landing_row = row as isize + dr;
            let landing_col = col as isize + dc;
            if parent_grid.contains(landing_row, landing_col) {
                trace!(from = %exit, to_grid = %parent, "exit cascade landed");
                self.position =
                    CellPosition::new(parent.clone(), landing_row as usize, landing_col as usize);
                self.continuity = Some(Continuity {
                    exit,
                    ancestor: parent,
                    hops: Vec::new(),
                });
                self.entered.clear();
                return true;
            }
            current = parent;
        }
    }

    /// Enters the grid referenced by the cell under the cursor.
    ///
    /// Returns `false` if the cell is not a reference, or if the target grid
    /// was already entered since the last real movement (an entry cycle).
    ///
    /// With continuity state present — i.e. the cursor arrived here via a
    /// boundary exit, possibly through intermediate portals — the entry
    /// coordinate along the edge is the exit position carried through the
    /// ancestor and back down (see [`crate::continuity`]). Without it, entry
    /// lands in the middle of the facing edge.
    pub fn try_enter(&mut self) -> bool {
        let target = match self.cell().ref_target() {
            Some(target) => target.to_owned(),
            None => return false,
        };
        if self.entered.contains(&target) {
            trace!(position = %self.position, target = %target, "entry cycle refused");
            return false;
        }

        let target_grid = self.store.grid(&target);
        let (rows, cols) = (target_grid.rows(), target_grid.cols());

        let cross = match &mut self.continuity {
            Some(cont) => {
                let axis = self.direction.cross_axis();
                let (fraction, _) = exit_ancestor_fraction(
                    self.store,
                    &cont.exit.grid,
                    cont.exit.index(axis),
                    axis,
                    &cont.ancestor,
                );
                cont.hops.push(RefHop {
                    parent: self.position.grid.clone(),
                    row: self.position.row,
                    col: self.position.col,
                    child: target.clone(),
                });
                Some(entry_fraction_to_child(
                    self.store,
                    &target,
                    &fraction,
                    axis,
                    &cont.ancestor,
                    &cont.hops,
                ))
            }
            None => None,
        };

        let (row, col) = match self.direction {
            Direction::East => (cross.unwrap_or(rows / 2), 0),
            Direction::West => (cross.unwrap_or(rows / 2), cols - 1),
            Direction::South => (0, cross.unwrap_or(cols / 2)),
            Direction::North => (rows - 1, cross.unwrap_or(cols / 2)),
        };

        trace!(from = %self.position, target = %target, row, col, "entered grid");
        self.entered.insert(target.clone());
        self.position = CellPosition::new(target, row, col);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Cell, Grid};

    fn nested_store() -> GridStore {
        // main: [1, INNER, _], inner: [a, b]
        vec![
            Grid::new(
                "inner",
                vec![vec![Cell::concrete("a"), Cell::concrete("b")]],
            ),
            Grid::new(
                "main",
                vec![vec![
                    Cell::concrete("1"),
                    Cell::reference("inner"),
                    Cell::Empty,
                ]],
            ),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn in_bounds_advance_moves() {
        let store = nested_store();
        let mut nav = Navigator::new(&store, CellPosition::new("main", 0, 0), Direction::East);
        assert!(nav.try_advance());
        assert_eq!(nav.position(), &CellPosition::new("main", 0, 1));
    }

    #[test]
    fn exit_cascades_into_parent() {
        let store = nested_store();
        // Stepping east off inner's right edge lands just east of inner's
        // reference cell in main.
        let mut nav = Navigator::new(&store, CellPosition::new("inner", 0, 1), Direction::East);
        assert!(nav.try_advance());
        assert_eq!(nav.position(), &CellPosition::new("main", 0, 2));
    }

    #[test]
    fn exit_off_root_edge_fails() {
        let store = nested_store();
        let mut nav = Navigator::new(&store, CellPosition::new("main", 0, 2), Direction::East);
        assert!(!nav.try_advance());
        assert_eq!(nav.position(), &CellPosition::new("main", 0, 2));
    }

    /// Two 1x1 grids referencing each other: every exit re-exits forever,
    /// which the cascade must detect and refuse.
    #[test]
    fn mutual_exit_cycle_terminates() {
        let store: GridStore = vec![
            Grid::new("a", vec![vec![Cell::reference("b")]]),
            Grid::new("b", vec![vec![Cell::reference("a")]]),
        ]
        .into_iter()
        .collect();
        let mut nav = Navigator::new(&store, CellPosition::new("a", 0, 0), Direction::East);
        assert!(!nav.try_advance());
    }

    #[test]
    fn fallback_entry_lands_mid_edge() {
        let store: GridStore = vec![
            Grid::new("main", vec![vec![Cell::reference("wide")]]),
            Grid::new(
                "wide",
                vec![
                    vec![Cell::Empty, Cell::Empty],
                    vec![Cell::Empty, Cell::Empty],
                    vec![Cell::Empty, Cell::Empty],
                ],
            ),
        ]
        .into_iter()
        .collect();
        // No boundary exit preceded this entry, so it lands mid-edge.
        let mut nav = Navigator::new(&store, CellPosition::new("main", 0, 0), Direction::East);
        assert!(nav.try_enter());
        assert_eq!(nav.position(), &CellPosition::new("wide", 1, 0));

        let mut nav = Navigator::new(&store, CellPosition::new("main", 0, 0), Direction::South);
        assert!(nav.try_enter());
        assert_eq!(nav.position(), &CellPosition::new("wide", 0, 1));
    }

    /// Exit at inner's bottom row, cascade into outer, enter a sibling:
    /// the entry row matches the exit row through the exact fraction maps.
    #[test]
    fn continuity_preserves_edge_position_across_siblings() {
        let empty3 = || {
            vec![
                vec![Cell::Empty, Cell::Empty, Cell::Empty],
                vec![Cell::Empty, Cell::Empty, Cell::Empty],
                vec![Cell::Empty, Cell::Empty, Cell::Empty],
            ]
        };
        let store: GridStore = vec![
            Grid::new("inner", empty3()),
            Grid::new("other", empty3()),
            Grid::new(
                "outer",
                vec![
                    vec![Cell::Empty, Cell::Empty, Cell::Empty],
                    vec![
                        Cell::reference("inner"),
                        Cell::reference("other"),
                        Cell::Empty,
                    ],
                    vec![Cell::Empty, Cell::Empty, Cell::Empty],
                ],
            ),
        ]
        .into_iter()
        .collect();

        let mut nav = Navigator::new(&store, CellPosition::new("inner", 2, 2), Direction::East);
        // Off inner's east edge, landing on outer's ref to "other".
        assert!(nav.try_advance());
        assert_eq!(nav.position(), &CellPosition::new("outer", 1, 1));
        // Entering carries the bottom-row exit to the bottom row of "other".
        assert!(nav.try_enter());
        assert_eq!(nav.position(), &CellPosition::new("other", 2, 0));
    }

    #[test]
    fn entry_cycle_guard_refuses_reentry() {
        let store: GridStore = vec![
            Grid::new("main", vec![vec![Cell::reference("a")]]),
            Grid::new("a", vec![vec![Cell::reference("b")]]),
            Grid::new("b", vec![vec![Cell::reference("a")]]),
        ]
        .into_iter()
        .collect();
        let mut nav = Navigator::new(&store, CellPosition::new("main", 0, 0), Direction::East);
        assert!(nav.try_enter()); // into a
        assert!(nav.try_enter()); // into b
        assert!(!nav.try_enter()); // back into a: refused
    }

    #[test]
    fn real_movement_clears_entry_guard() {
        let store: GridStore = vec![
            Grid::new(
                "main",
                vec![vec![Cell::reference("box"), Cell::reference("box")]],
            ),
            Grid::new("box", vec![vec![Cell::Empty]]),
        ]
        .into_iter()
        .collect();
        let mut nav = Navigator::new(&store, CellPosition::new("main", 0, 0), Direction::East);
        assert!(nav.try_enter());
        assert_eq!(nav.position().grid, "box");
        // Stepping out cascades onto main[0,1], which is real movement.
        assert!(nav.try_advance());
        assert_eq!(nav.position(), &CellPosition::new("main", 0, 1));
        // The guard reset, so box can be entered again.
        assert!(nav.try_enter());
        assert_eq!(nav.position().grid, "box");
    }
}
