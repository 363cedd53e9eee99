//! The backtracking push: growing a chain of displaced cells until it ends
//! somewhere, then rotating the chain forward.
//!
//! A push collects the path of positions the moving chain occupies. At each
//! decision point the cursor sits on a *target* cell in front of the chain's
//! tail; the target either terminates the path (empty cell, or a closed loop
//! back to the start) or must itself be dealt with by one of the applicable
//! strategies (see [`crate::strategy`]). Strategies are tried in rule
//! order; a branch that dead-ends is abandoned and the search backtracks to
//! the most recent decision point with untried strategies. Decision points
//! snapshot their path, cursor, and visited set, so backtracking is a pure
//! pop — no undo log.
//!
//! On success the collected cells rotate one step forward along the path:
//! `[c0, .., cn]` becomes `[cn, c0, .., c(n-1)]` in place. A closed loop
//! carries the start position at both ends of the path, and because writes
//! apply in path order with the later write winning, the wrap-around comes
//! out right without special-casing.
//!
//! # Invariants
//! - The input store is never mutated; the result shares every untouched
//!   grid with it.
//! - Search termination: strategy applications are bounded by `max_depth`
//!   (a [`PushReason::MaxDepth`] failure), and backtrack pops by an internal
//!   sanity bound (exceeding it is a logic bug, hence an assertion).

use std::collections::BTreeSet;
use std::error::Error;
use std::fmt;

use tracing::{debug, trace};

use crate::grid::{is_stop_tagged, Cell, CellPosition, Direction, GridStore, TagFn};
use crate::navigator::Navigator;
use crate::strategy::{applicable_strategies, RuleSet, Strategy};

/// Default bound on strategy applications per push or pull.
pub const DEFAULT_MAX_DEPTH: usize = 1000;

/// Sanity bound on backtrack pops. The decision tree of a `max_depth`-bounded
/// search cannot legitimately produce more pops than this.
const MAX_BACKTRACKS: usize = 10_000;

/// Why a push failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushReason {
    /// The very first step out of the start cell was impossible.
    Blocked,
    /// A stop-tagged cell lay in the way (or at the start).
    StopTag,
    /// Every branch curled back onto the path somewhere other than the
    /// start.
    PathCycle,
    /// A target could not be terminated on and no strategy applied to it,
    /// or the chosen strategy could not be carried out.
    NoStrategy,
    /// The strategy-application budget ran out.
    MaxDepth,
}

impl fmt::Display for PushReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            PushReason::Blocked => "BLOCKED",
            PushReason::StopTag => "STOP_TAG",
            PushReason::PathCycle => "PATH_CYCLE",
            PushReason::NoStrategy => "NO_STRATEGY",
            PushReason::MaxDepth => "MAX_DEPTH",
        };
        write!(f, "{}", tag)
    }
}

/// A failed push: the reason, where it surfaced, and optional detail.
///
/// When the whole search exhausts, the reason reported is the most recent
/// local failure — the deepest obstacle the search actually hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushFailure {
    pub reason: PushReason,
    pub position: CellPosition,
    pub details: Option<String>,
}

impl PushFailure {
    pub(crate) fn new(reason: PushReason, position: CellPosition) -> PushFailure {
        PushFailure {
            reason,
            position,
            details: None,
        }
    }

    pub(crate) fn with_details(
        reason: PushReason,
        position: CellPosition,
        details: impl Into<String>,
    ) -> PushFailure {
        PushFailure {
            reason,
            position,
            details: Some(details.into()),
        }
    }
}

impl fmt::Display for PushFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.details {
            Some(details) => write!(f, "{} at {}: {}", self.reason, self.position, details),
            None => write!(f, "{} at {}", self.reason, self.position),
        }
    }
}

impl Error for PushFailure {}

/// A decision point: the state to restore on backtrack plus the strategies
/// not yet tried, in rule order.
struct Frame<'a> {
    path: Vec<CellPosition>,
    nav: Navigator<'a>,
    visited: BTreeSet<CellPosition>,
    strategies: std::vec::IntoIter<Strategy>,
}

enum Evaluation<'a> {
    /// The path terminated; rotate and return.
    Done(Vec<CellPosition>),
    /// This branch is dead.
    Fail(PushFailure),
    /// The target needs a strategy; descend into a new decision point.
    Descend(Frame<'a>),
}

/// Classifies the cell under `nav`'s cursor against the path so far.
fn evaluate<'a>(
    store: &'a GridStore,
    rules: &RuleSet,
    tag_fn: Option<&TagFn>,
    mut path: Vec<CellPosition>,
    nav: Navigator<'a>,
    visited: BTreeSet<CellPosition>,
) -> Evaluation<'a> {
    let target = nav.position().clone();
    let target_cell = store.cell(&target);

    if target_cell.is_empty() {
        path.push(target);
        return Evaluation::Done(path);
    }
    if is_stop_tagged(target_cell, tag_fn) {
        return Evaluation::Fail(PushFailure::new(PushReason::StopTag, target));
    }
    if visited.contains(&target) {
        // Only a loop closing back onto the start terminates; the start
        // appears twice in the path so the rotation wraps around it.
        if target == path[0] {
            path.push(target);
            return Evaluation::Done(path);
        }
        return Evaluation::Fail(PushFailure::new(PushReason::PathCycle, target));
    }

    let source = store.cell(&path[path.len() - 1]);
    let strategies = applicable_strategies(rules, source, &nav);
    if strategies.is_empty() {
        return Evaluation::Fail(PushFailure::new(PushReason::NoStrategy, target));
    }
    Evaluation::Descend(Frame {
        path,
        nav,
        visited,
        strategies: strategies.into_iter(),
    })
}

/// Pushes the cell at `start` one step in `direction` with default tagging
/// (none) and depth.
pub fn push(
    store: &GridStore,
    start: &CellPosition,
    direction: Direction,
    rules: &RuleSet,
) -> Result<GridStore, PushFailure> {
    push_with(store, start, direction, rules, None, DEFAULT_MAX_DEPTH)
}

/// Pushes the cell at `start` one step in `direction`.
///
/// Returns the resulting store on success (the input is untouched), or the
/// deepest failure the search hit when every branch dead-ends.
pub fn push_with(
    store: &GridStore,
    start: &CellPosition,
    direction: Direction,
    rules: &RuleSet,
    tag_fn: Option<&TagFn>,
    max_depth: usize,
) -> Result<GridStore, PushFailure> {
    if is_stop_tagged(store.cell(start), tag_fn) {
        return Err(PushFailure::new(PushReason::StopTag, start.clone()));
    }
    let mut nav = Navigator::new(store, start.clone(), direction);
    if !nav.try_advance() {
        return Err(PushFailure::new(PushReason::Blocked, start.clone()));
    }

    let path = vec![start.clone()];
    let visited: BTreeSet<CellPosition> = path.iter().cloned().collect();

    let mut stack: Vec<Frame<'_>> = Vec::new();
    let mut last_failure: Option<PushFailure> = None;
    match evaluate(store, rules, tag_fn, path, nav, visited) {
        Evaluation::Done(path) => return Ok(apply_push(store, &path)),
        Evaluation::Fail(failure) => last_failure = Some(failure),
        Evaluation::Descend(frame) => stack.push(frame),
    }

    let mut applications = 0usize;
    let mut backtracks = 0usize;
    while !stack.is_empty() {
        let top = stack.len() - 1;
        let Some(strategy) = stack[top].strategies.next() else {
            stack.pop();
            backtracks += 1;
            assert!(
                backtracks <= MAX_BACKTRACKS,
                "push search exceeded the backtrack bound"
            );
            debug!(depth = stack.len(), "backtracking");
            continue;
        };

        applications += 1;
        if applications > max_depth {
            return Err(PushFailure::new(
                PushReason::MaxDepth,
                stack[top].nav.position().clone(),
            ));
        }

        let mut path = stack[top].path.clone();
        let mut nav = stack[top].nav.clone();
        let mut visited = stack[top].visited.clone();
        let target = nav.position().clone();
        trace!(?strategy, target = %target, "applying strategy");

        let applied = match strategy {
            Strategy::Solid => {
                path.push(target.clone());
                visited.insert(target.clone());
                nav.try_advance()
            }
            Strategy::Portal => nav.try_enter(),
            Strategy::Swallow => {
                path.push(target.clone());
                visited.insert(target.clone());
                nav.flip();
                nav.try_advance() && nav.try_enter()
            }
        };
        // An application-time refusal (e.g. an entry-cycle guard) fails the
        // branch with the same reason as an inapplicable strategy; Blocked
        // is reserved for the pre-flight first step.
        if !applied {
            last_failure = Some(PushFailure::with_details(
                PushReason::NoStrategy,
                target,
                format!("{:?} application failed", strategy),
            ));
            continue;
        }

        match evaluate(store, rules, tag_fn, path, nav, visited) {
            Evaluation::Done(path) => return Ok(apply_push(store, &path)),
            Evaluation::Fail(failure) => last_failure = Some(failure),
            Evaluation::Descend(frame) => stack.push(frame),
        }
    }

    match last_failure {
        Some(failure) => Err(failure),
        None => unreachable!("push search exhausted without a recorded failure"),
    }
}

/// Rotates the path's cells one step forward: position `i` receives the
/// cell that was at `i - 1`, and the first position receives the last
/// cell. Writes apply in path order, later writes winning, which makes the
/// duplicated start of a closed loop resolve to the wrapped value.
fn apply_push(store: &GridStore, path: &[CellPosition]) -> GridStore {
    if path.len() <= 1 {
        return store.clone();
    }
    let values: Vec<Cell> = path.iter().map(|pos| store.cell(pos).clone()).collect();
    let n = path.len();
    let mut writes = Vec::with_capacity(n);
    writes.push((path[0].clone(), values[n - 1].clone()));
    for i in 1..n {
        writes.push((path[i].clone(), values[i - 1].clone()));
    }
    store.with_cells(&writes)
}
