//! warpgrid: a recursive grid universe with portal traversal and
//! backtracking block pushing.
//!
//! This crate models a store of named 2D grids whose cells hold concrete
//! values or *references* to other grids — portals, with cycles (including
//! self-reference) fully supported — and provides:
//! - cursor movement across grid boundaries with exit cascades and cycle
//!   detection ([`navigator`]),
//! - exact-rational coordinate continuity, so motion crossing portals stays
//!   positionally aligned through arbitrarily deep nesting ([`continuity`]),
//! - a backtracking push that displaces chains of cells through portals
//!   under a configurable strategy order ([`push`]),
//! - a greedy, always-succeeding pull ([`pull`]).
//!
//! # Design notes
//!
//! Grids refer to each other only by id through the [`grid::GridStore`], so
//! cyclic grid graphs need no special ownership. Operations are pure: they
//! take a store reference and return either a new store (sharing every
//! untouched grid) or a failure value. Continuity arithmetic uses exact
//! rationals so that repeated portal crossings never drift.
//!
//! # Example
//!
//! ```
//! use warpgrid::prelude::*;
//!
//! let store: GridStore = vec![Grid::new(
//!     "main",
//!     vec![vec![Cell::concrete("1"), Cell::concrete("2"), Cell::Empty]],
//! )]
//! .into_iter()
//! .collect();
//!
//! let pushed = push(
//!     &store,
//!     &CellPosition::new("main", 0, 0),
//!     Direction::East,
//!     &RuleSet::default(),
//! )
//! .unwrap();
//! assert!(pushed.cell(&CellPosition::new("main", 0, 0)).is_empty());
//! ```

pub mod continuity;
pub mod grid;
pub mod navigator;
pub mod pull;
pub mod push;
pub mod resolver;
pub mod strategy;

pub use continuity::RefHop;
pub use grid::{Axis, Cell, CellPosition, Direction, Grid, GridStore, TagFn, STOP_TAG};
pub use navigator::Navigator;
pub use pull::{pull, pull_with};
pub use push::{push, push_with, PushFailure, PushReason, DEFAULT_MAX_DEPTH};
pub use resolver::{find_primary_ref, find_tagged_cell};
pub use strategy::{RuleSet, Strategy};

/// Prelude for convenient usage.
pub mod prelude {
    pub use crate::grid::{
        Axis, Cell, CellPosition, Direction, Grid, GridStore, TagFn, STOP_TAG,
    };
    pub use crate::navigator::Navigator;
    pub use crate::pull::{pull, pull_with};
    pub use crate::push::{push, push_with, PushFailure, PushReason, DEFAULT_MAX_DEPTH};
    pub use crate::resolver::{find_primary_ref, find_tagged_cell};
    pub use crate::strategy::{RuleSet, Strategy};
}

/// Compact grid notation for tests: rows separated by `|`, cells by
/// whitespace. `_` is empty; a leading `*`/`~` marks an explicitly
/// primary/secondary reference; an uppercase leading letter makes the token
/// a reference; anything else is a concrete value.
#[cfg(test)]
pub(crate) mod testkit {
    use crate::grid::{Cell, Grid, GridStore};

    pub(crate) fn cell(token: &str) -> Cell {
        if token == "_" {
            return Cell::Empty;
        }
        if let Some(name) = token.strip_prefix('*') {
            return Cell::Ref {
                grid: name.to_owned(),
                primary: Some(true),
            };
        }
        if let Some(name) = token.strip_prefix('~') {
            return Cell::Ref {
                grid: name.to_owned(),
                primary: Some(false),
            };
        }
        if token.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
            return Cell::reference(token);
        }
        Cell::concrete(token)
    }

    pub(crate) fn grid(id: &str, text: &str) -> Grid {
        let cells = text
            .split('|')
            .map(|row| row.split_whitespace().map(cell).collect())
            .collect();
        Grid::new(id, cells)
    }

    pub(crate) fn store(grids: &[(&str, &str)]) -> GridStore {
        grids.iter().map(|(id, text)| grid(id, text)).collect()
    }

    /// Renders a grid back into the compact notation.
    pub(crate) fn render(store: &GridStore, id: &str) -> String {
        let grid = store.grid(id);
        (0..grid.rows())
            .map(|r| {
                (0..grid.cols())
                    .map(|c| grid.cell(r, c).to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("|")
    }
}
