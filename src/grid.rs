//! Core data model: cells, grids, the grid store, and positions.
//!
//! A universe of named 2D grids. Cells either hold a concrete value or
//! reference another grid by id (a *portal*). Grids refer to each other only
//! through the store's id indirection — never by direct handle — which is
//! what lets reference cycles (self-references, mutual references) exist
//! without cyclic ownership.
//!
//! # Determinism
//! - The store keeps grids in a `BTreeMap`, so enumeration is always in
//!   lexicographic id order, cells row-major within a grid. This is the
//!   canonical scan order used for auto-determining primary references and
//!   for tagged-cell lookup.
//!
//! # Invariants
//! - Grids are rectangular with at least one row and one column.
//! - Every grid id named by a `Cell::Ref` exists in the store. A dangling
//!   reference is a construction bug in the layer that built the store, not
//!   a recoverable condition: lookups panic.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Cardinal direction for traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Up (decreasing row).
    North,
    /// Down (increasing row).
    South,
    /// Right (increasing col).
    East,
    /// Left (decreasing col).
    West,
}

impl Direction {
    /// `(row_delta, col_delta)` of one step in this direction.
    #[inline]
    pub const fn delta(self) -> (isize, isize) {
        match self {
            Direction::North => (-1, 0),
            Direction::South => (1, 0),
            Direction::East => (0, 1),
            Direction::West => (0, -1),
        }
    }

    /// The opposite direction (used by the swallow strategy).
    #[inline]
    pub const fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }

    /// The axis along which positional continuity is measured when moving in
    /// this direction: the axis *perpendicular* to travel. Moving east or
    /// west, position along the edge varies by row; north or south, by
    /// column.
    #[inline]
    pub const fn cross_axis(self) -> Axis {
        match self {
            Direction::East | Direction::West => Axis::Rows,
            Direction::North | Direction::South => Axis::Cols,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::North => "N",
            Direction::South => "S",
            Direction::East => "E",
            Direction::West => "W",
        };
        write!(f, "{}", s)
    }
}

/// One of the two grid axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// The row axis (vertical extent).
    Rows,
    /// The column axis (horizontal extent).
    Cols,
}

/// A single grid cell.
///
/// Closed sum type: every traversal and strategy decision matches
/// exhaustively on these three variants.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Cell {
    /// Nothing here; pushes terminate successfully on it.
    Empty,
    /// A concrete value (opaque to the engine).
    Concrete(String),
    /// A portal to another grid.
    ///
    /// `primary: Some(true)` marks this reference as the distinguished parent
    /// link for its target; `Some(false)` explicitly demotes it; `None`
    /// leaves the choice to scan-order auto-determination.
    Ref {
        grid: String,
        primary: Option<bool>,
    },
}

impl Cell {
    /// Convenience constructor for an auto-determined reference.
    #[inline]
    pub fn reference(grid: impl Into<String>) -> Cell {
        Cell::Ref {
            grid: grid.into(),
            primary: None,
        }
    }

    /// Convenience constructor for a concrete value.
    #[inline]
    pub fn concrete(value: impl Into<String>) -> Cell {
        Cell::Concrete(value.into())
    }

    /// Whether this cell is `Empty`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// The referenced grid id, if this cell is a portal.
    #[inline]
    pub fn ref_target(&self) -> Option<&str> {
        match self {
            Cell::Ref { grid, .. } => Some(grid),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => write!(f, "_"),
            Cell::Concrete(v) => write!(f, "{}", v),
            Cell::Ref { grid, primary } => match primary {
                Some(true) => write!(f, "*{}", grid),
                Some(false) => write!(f, "~{}", grid),
                None => write!(f, "{}", grid),
            },
        }
    }
}

/// A named rectangular matrix of cells.
///
/// Immutable once constructed; mutation paths build replacement grids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    id: String,
    cells: Vec<Vec<Cell>>,
}

impl Grid {
    /// Creates a grid, validating rectangularity.
    ///
    /// # Panics
    /// If `cells` is empty, any row is empty, or rows differ in length.
    pub fn new(id: impl Into<String>, cells: Vec<Vec<Cell>>) -> Grid {
        let id = id.into();
        assert!(!cells.is_empty(), "grid {:?} must have at least one row", id);
        let cols = cells[0].len();
        assert!(cols >= 1, "grid {:?} must have at least one column", id);
        for (r, row) in cells.iter().enumerate() {
            assert_eq!(
                row.len(),
                cols,
                "grid {:?} row {} has {} cells, expected {}",
                id,
                r,
                row.len(),
                cols
            );
        }
        Grid { id, cells }
    }

    /// The grid's id.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Number of rows.
    #[inline]
    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    /// Number of columns.
    #[inline]
    pub fn cols(&self) -> usize {
        self.cells[0].len()
    }

    /// Length along the given axis.
    #[inline]
    pub fn len(&self, axis: Axis) -> usize {
        match axis {
            Axis::Rows => self.rows(),
            Axis::Cols => self.cols(),
        }
    }

    /// The cell at `(row, col)`.
    ///
    /// # Panics
    /// If the coordinates are out of bounds.
    #[inline]
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        &self.cells[row][col]
    }

    /// Whether `(row, col)` (given as signed offsets) lies inside the grid.
    #[inline]
    pub fn contains(&self, row: isize, col: isize) -> bool {
        row >= 0 && col >= 0 && (row as usize) < self.rows() && (col as usize) < self.cols()
    }

    /// Row-major iteration over `(row, col, cell)`.
    pub fn iter_cells(&self) -> impl Iterator<Item = (usize, usize, &Cell)> {
        self.cells
            .iter()
            .enumerate()
            .flat_map(|(r, row)| row.iter().enumerate().map(move |(c, cell)| (r, c, cell)))
    }

    /// Builds a copy of this grid with the given cells replaced.
    ///
    /// Updates are applied in order; a later write to the same position wins.
    pub fn with_updates(&self, updates: &[(usize, usize, Cell)]) -> Grid {
        let mut cells = self.cells.clone();
        for (row, col, cell) in updates {
            cells[*row][*col] = cell.clone();
        }
        Grid {
            id: self.id.clone(),
            cells,
        }
    }
}

/// A position within the grid universe, relative to a specific store
/// snapshot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellPosition {
    pub grid: String,
    pub row: usize,
    pub col: usize,
}

impl CellPosition {
    /// Creates a position.
    #[inline]
    pub fn new(grid: impl Into<String>, row: usize, col: usize) -> CellPosition {
        CellPosition {
            grid: grid.into(),
            row,
            col,
        }
    }

    /// The coordinate along the given axis.
    #[inline]
    pub fn index(&self, axis: Axis) -> usize {
        match axis {
            Axis::Rows => self.row,
            Axis::Cols => self.col,
        }
    }
}

impl fmt::Display for CellPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{},{}]", self.grid, self.row, self.col)
    }
}

/// The arena of all grids, keyed by id.
///
/// Owns every grid exclusively (behind `Arc` so derived stores can share
/// unchanged grids). All cross-grid structure goes through string ids, so
/// cyclic grid graphs need no special ownership handling.
///
/// Core operations never mutate a store in place; they either return the
/// input unchanged or a new store sharing all grids except the rebuilt ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridStore {
    grids: std::collections::BTreeMap<String, Arc<Grid>>,
}

impl GridStore {
    /// Creates an empty store.
    #[inline]
    pub fn new() -> GridStore {
        GridStore::default()
    }

    /// Inserts a grid, keyed by its own id. Replaces any previous grid with
    /// the same id.
    pub fn insert(&mut self, grid: Grid) {
        self.grids.insert(grid.id().to_owned(), Arc::new(grid));
    }

    /// Looks up a grid by id.
    #[inline]
    pub fn get(&self, id: &str) -> Option<&Arc<Grid>> {
        self.grids.get(id)
    }

    /// Looks up a grid by id, asserting it exists.
    ///
    /// # Panics
    /// If the id is unknown — a dangling reference, which the constructing
    /// layer must never produce.
    #[inline]
    #[track_caller]
    pub fn grid(&self, id: &str) -> &Grid {
        match self.grids.get(id) {
            Some(grid) => grid,
            None => panic!("dangling grid reference: {:?}", id),
        }
    }

    /// The cell at a position.
    ///
    /// # Panics
    /// If the position's grid is unknown or its coordinates are out of
    /// bounds.
    #[inline]
    #[track_caller]
    pub fn cell(&self, pos: &CellPosition) -> &Cell {
        self.grid(&pos.grid).cell(pos.row, pos.col)
    }

    /// Number of grids in the store.
    #[inline]
    pub fn len(&self) -> usize {
        self.grids.len()
    }

    /// Whether the store holds no grids.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }

    /// Iterates over grids in lexicographic id order (the canonical scan
    /// order).
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Grid>> {
        self.grids.values()
    }

    /// Replaces one grid in a clone of this store, sharing all others.
    pub(crate) fn with_grid(&self, grid: Grid) -> GridStore {
        let mut next = self.clone();
        next.insert(grid);
        next
    }

    /// Applies a batch of cell writes, rebuilding only the touched grids.
    ///
    /// Writes are grouped per grid preserving their order in `writes`, so a
    /// later write to the same position wins. Untouched grids are shared
    /// with `self`.
    pub(crate) fn with_cells(&self, writes: &[(CellPosition, Cell)]) -> GridStore {
        let mut per_grid: std::collections::BTreeMap<&str, Vec<(usize, usize, Cell)>> =
            std::collections::BTreeMap::new();
        for (pos, cell) in writes {
            per_grid
                .entry(pos.grid.as_str())
                .or_default()
                .push((pos.row, pos.col, cell.clone()));
        }
        let mut next = self.clone();
        for (id, updates) in per_grid {
            next.insert(self.grid(id).with_updates(&updates));
        }
        next
    }
}

impl FromIterator<Grid> for GridStore {
    fn from_iter<I: IntoIterator<Item = Grid>>(iter: I) -> GridStore {
        let mut store = GridStore::new();
        for grid in iter {
            store.insert(grid);
        }
        store
    }
}

/// Callback classifying a cell with a set of tags.
///
/// The engine only interprets [`STOP_TAG`]; any other tags pass through
/// untouched.
pub type TagFn = dyn Fn(&Cell) -> BTreeSet<String>;

/// The one tag the engine recognizes: a stop-tagged cell terminates
/// traversal and can never be pushed.
pub const STOP_TAG: &str = "stop";

/// Whether `cell` carries the stop tag under the (optional) tag function.
#[inline]
pub(crate) fn is_stop_tagged(cell: &Cell, tag_fn: Option<&TagFn>) -> bool {
    match tag_fn {
        Some(f) => f(cell).contains(STOP_TAG),
        None => false,
    }
}
