//! The greedy pull: dragging a chain of cells into an empty start cell.
//!
//! Pull is push's forgiving sibling. The cursor walks away from the empty
//! start cell in the pull direction, collecting every cell it can reach;
//! whatever terminates the walk — an empty cell, a stop tag, a revisited
//! position, a dead end, the depth budget — simply ends the chain there.
//! The collected cells then rotate one step *toward* the start. There is no
//! failure mode: the worst case is a chain of length zero, which returns
//! the store unchanged.
//!
//! Each target consults the rule order before joining the chain, exactly as
//! in a push: a reference taken as SOLID is dragged like any object, while
//! one taken as PORTAL is a transparent doorway — it stays in place and the
//! walk continues inside it, pulling the child grid's contents out through
//! it. Swallow has no meaning for cells moving toward the puller and
//! swallow entries in the rule order are skipped. A cell nothing applies to
//! still joins the chain; it just ends the walk.

use std::collections::BTreeSet;

use tracing::trace;

use crate::grid::{is_stop_tagged, Cell, CellPosition, Direction, GridStore, TagFn};
use crate::navigator::Navigator;
use crate::push::DEFAULT_MAX_DEPTH;
use crate::strategy::{RuleSet, Strategy};

/// Pulls a chain of cells into the empty cell at `start`, walking in
/// `direction`, with default tagging (none) and depth.
pub fn pull(
    store: &GridStore,
    start: &CellPosition,
    direction: Direction,
    rules: &RuleSet,
) -> GridStore {
    pull_with(store, start, direction, rules, None, DEFAULT_MAX_DEPTH)
}

/// How the walk deals with the cell under the cursor.
enum Step<'a> {
    /// The cell joins the chain and the cursor moves past it.
    Drag(Navigator<'a>),
    /// The cell is a doorway: it stays in place, the cursor moves inside.
    Through(Navigator<'a>),
    /// Nothing applies; the cell joins the chain and the walk ends.
    Stuck,
}

/// Pulls a chain of cells into the empty cell at `start`.
///
/// Always succeeds. A non-empty start, an unreachable first target, or an
/// immediately terminated walk all return the input store unchanged
/// (structurally shared, cheap).
pub fn pull_with(
    store: &GridStore,
    start: &CellPosition,
    direction: Direction,
    rules: &RuleSet,
    tag_fn: Option<&TagFn>,
    max_depth: usize,
) -> GridStore {
    if !store.cell(start).is_empty() {
        trace!(start = %start, "pull start is not empty, nothing to do");
        return store.clone();
    }

    let mut nav = Navigator::new(store, start.clone(), direction);
    let mut path = vec![start.clone()];
    let mut visited: BTreeSet<CellPosition> = path.iter().cloned().collect();

    if nav.try_advance() {
        loop {
            let target = nav.position().clone();
            let cell = store.cell(&target);
            // Terminators are excluded from the chain.
            if cell.is_empty() || is_stop_tagged(cell, tag_fn) || visited.contains(&target) {
                break;
            }

            match next_step(&nav, cell, rules) {
                Step::Drag(moved) => {
                    visited.insert(target.clone());
                    path.push(target);
                    if path.len() - 1 >= max_depth {
                        break;
                    }
                    nav = moved;
                }
                Step::Through(inside) => {
                    nav = inside;
                }
                Step::Stuck => {
                    visited.insert(target.clone());
                    path.push(target);
                    break;
                }
            }
        }
    }

    if path.len() <= 1 {
        return store.clone();
    }
    apply_pull(store, &path)
}

/// Decides how to handle the cell under the cursor, trying the rules in
/// order on cloned cursors. Swallow entries are skipped.
fn next_step<'a>(nav: &Navigator<'a>, cell: &Cell, rules: &RuleSet) -> Step<'a> {
    for strategy in rules.order() {
        match strategy {
            Strategy::Solid => {
                let mut probe = nav.clone();
                if probe.try_advance() {
                    return Step::Drag(probe);
                }
            }
            Strategy::Portal => {
                if matches!(cell, Cell::Ref { .. }) {
                    let mut probe = nav.clone();
                    if probe.try_enter() {
                        return Step::Through(probe);
                    }
                }
            }
            Strategy::Swallow => {}
        }
    }
    Step::Stuck
}

/// Rotates the path's cells one step toward the start: position `i`
/// receives the cell that was at `i + 1`, and the last position becomes
/// the (empty) start cell's content.
fn apply_pull(store: &GridStore, path: &[CellPosition]) -> GridStore {
    let values: Vec<Cell> = path.iter().map(|pos| store.cell(pos).clone()).collect();
    let n = path.len();
    let mut writes = Vec::with_capacity(n);
    for i in 0..n - 1 {
        writes.push((path[i].clone(), values[i + 1].clone()));
    }
    writes.push((path[n - 1].clone(), values[0].clone()));
    store.with_cells(&writes)
}
