//! The push strategy model: what can happen when a moving cell meets
//! another.
//!
//! Three interactions exist. SOLID shoves the target ahead (needs somewhere
//! for it to go). PORTAL dives into the target when it is a reference.
//! SWALLOW lets a moving reference absorb the target by reversing direction
//! into itself. Which ones are *considered*, and in what order, is the
//! caller's policy, carried by a [`RuleSet`]; whether each is *applicable*
//! at a particular meeting is decided here.

use crate::grid::Cell;
use crate::navigator::Navigator;

/// One interaction between the moving source cell and the target in front
/// of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Push the target ahead, continuing in the travel direction.
    Solid,
    /// Enter the target (it must be a reference).
    Portal,
    /// The moving reference swallows the target: direction reverses and the
    /// chain continues into the reference itself.
    Swallow,
}

/// An ordered strategy policy.
///
/// Order is precedence: at each decision point the push search tries the
/// applicable strategies in this order, backtracking through them on
/// failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    order: Vec<Strategy>,
}

impl RuleSet {
    /// Builds a policy from an explicit order. Duplicates are permitted and
    /// harmless (the second occurrence can never apply after the first).
    pub fn new(order: Vec<Strategy>) -> RuleSet {
        RuleSet { order }
    }

    /// Portal dives take precedence over shoving.
    pub fn portal_first() -> RuleSet {
        RuleSet::new(vec![Strategy::Portal, Strategy::Solid, Strategy::Swallow])
    }

    /// Swallowing takes precedence over everything.
    pub fn swallow_first() -> RuleSet {
        RuleSet::new(vec![Strategy::Swallow, Strategy::Solid, Strategy::Portal])
    }

    /// The strategies in precedence order.
    #[inline]
    pub fn order(&self) -> &[Strategy] {
        &self.order
    }
}

impl Default for RuleSet {
    /// Shove first, then dive, then swallow.
    fn default() -> RuleSet {
        RuleSet::new(vec![Strategy::Solid, Strategy::Portal, Strategy::Swallow])
    }
}

/// The strategies from `rules` applicable when `source` (the chain's moving
/// tail) meets the cell under `nav`'s cursor, in precedence order.
///
/// Applicability is a cheap pre-filter, not a guarantee: a strategy listed
/// here can still fail during application (e.g. a portal entry refused by
/// the entry-cycle guard), which fails that branch of the search rather
/// than this decision.
pub(crate) fn applicable_strategies(
    rules: &RuleSet,
    source: &Cell,
    nav: &Navigator<'_>,
) -> Vec<Strategy> {
    rules
        .order()
        .iter()
        .copied()
        .filter(|strategy| match strategy {
            // The target must have somewhere to be shoved to.
            Strategy::Solid => {
                let mut probe = nav.clone();
                probe.try_advance()
            }
            Strategy::Portal => matches!(nav.cell(), Cell::Ref { .. }),
            Strategy::Swallow => matches!(source, Cell::Ref { .. }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{CellPosition, Direction, Grid, GridStore};

    #[test]
    fn default_order_is_solid_portal_swallow() {
        assert_eq!(
            RuleSet::default().order(),
            &[Strategy::Solid, Strategy::Portal, Strategy::Swallow]
        );
        assert_eq!(
            RuleSet::portal_first().order(),
            &[Strategy::Portal, Strategy::Solid, Strategy::Swallow]
        );
    }

    #[test]
    fn applicability_filters_by_situation() {
        // main: [1, sub, 3] with nothing past "3" — solid inapplicable at
        // the east edge, portal applicable on the ref cell.
        let store: GridStore = vec![
            Grid::new(
                "main",
                vec![vec![
                    Cell::concrete("1"),
                    Cell::reference("sub"),
                    Cell::concrete("3"),
                ]],
            ),
            Grid::new("sub", vec![vec![Cell::Empty]]),
        ]
        .into_iter()
        .collect();

        let rules = RuleSet::default();
        let source = Cell::concrete("1");

        // Cursor on the ref cell: it can be shoved (east neighbour exists)
        // or entered.
        let nav = Navigator::new(&store, CellPosition::new("main", 0, 1), Direction::East);
        assert_eq!(
            applicable_strategies(&rules, &source, &nav),
            vec![Strategy::Solid, Strategy::Portal]
        );

        // Cursor on "3" at the east edge of a root grid: nothing applies
        // for a concrete source.
        let nav = Navigator::new(&store, CellPosition::new("main", 0, 2), Direction::East);
        assert_eq!(applicable_strategies(&rules, &source, &nav), vec![]);

        // A reference source can still swallow there.
        let ref_source = Cell::reference("sub");
        assert_eq!(
            applicable_strategies(&rules, &ref_source, &nav),
            vec![Strategy::Swallow]
        );
    }
}
