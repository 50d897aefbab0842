//
// spacecp-rs is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License  v3
// as published by the Free Software Foundation.
//
// spacecp-rs is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY.
// See the GNU Lesser General Public License  for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with spacecp-rs. If not, see http://www.gnu.org/licenses/lgpl-3.0.en.html
//
// Copyright (c)  2026 by the spacecp-rs developers
//

//! This module provides the definition of the kernel's core vocabulary:
//! the failure type, modification events, propagation conditions, cost
//! classes and the errors that signal a misuse of the modeling api.

/// The largest value which can appear in the domain of a variable
pub const MAX_VALUE: i64 = i64::MAX / 4;
/// The smallest value which can appear in the domain of a variable
pub const MIN_VALUE: i64 = -MAX_VALUE;

/// This is the kind of error that gets raised whenever a propagator fails
#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq, Hash)]
#[error("inconsistency")]
pub struct Inconsistency;

/// The result of a propagation operation. (Note: all propagation opertations
/// can fail, in which case they raise an Inconsistency error)
pub type CPResult<T> = Result<T, Inconsistency>;

/// A modification event tells what happened to the domain of a variable. The
/// variants are ordered by increasing information richness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ModEvent {
    /// The domain has not changed at all
    #[default]
    None,
    /// Some value strictly between the bounds has been removed
    Dom,
    /// One of the bounds (or both) has changed
    Bnd,
    /// The variable has become assigned
    Val,
}

/// A propagation condition is what a propagator declares when it subscribes
/// to a view: it tells which kind of modification should wake it up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PropCond {
    /// Wake up when the variable becomes assigned
    Val,
    /// Wake up when a bound changes (or the variable becomes assigned)
    Bnd,
    /// Wake up on any change
    Dom,
}

impl PropCond {
    /// Returns true iff a subscriber with this condition must be scheduled
    /// when a modification of kind `me` occurs
    pub fn is_triggered_by(self, me: ModEvent) -> bool {
        match self {
            PropCond::Val => me == ModEvent::Val,
            PropCond::Bnd => me == ModEvent::Bnd || me == ModEvent::Val,
            PropCond::Dom => me != ModEvent::None,
        }
    }
}

/// The cost class of a propagator. The queue always executes the cheapest
/// propagators first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PropCost {
    Unary,
    Binary,
    Ternary,
    Linear,
    Quadratic,
    Cubic,
    Crazy,
}

impl PropCost {
    /// The number of distinct cost classes
    pub const LEVELS: usize = 7;

    /// The position of this cost class in the queue
    pub fn index(self) -> usize {
        self as usize
    }
}

/// A binary relation between two integer quantities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    /// x == y
    Eq,
    /// x != y
    Nq,
    /// x <= y
    Lq,
    /// x <  y
    Le,
    /// x >= y
    Gq,
    /// x >  y
    Gr,
}

impl Relation {
    /// Returns the relation which holds exactly when this one does not
    pub fn negate(self) -> Self {
        match self {
            Relation::Eq => Relation::Nq,
            Relation::Nq => Relation::Eq,
            Relation::Lq => Relation::Gr,
            Relation::Gr => Relation::Lq,
            Relation::Le => Relation::Gq,
            Relation::Gq => Relation::Le,
        }
    }
    /// Returns the relation r' such that `x r y` iff `y r' x`
    pub fn flip(self) -> Self {
        match self {
            Relation::Eq => Relation::Eq,
            Relation::Nq => Relation::Nq,
            Relation::Lq => Relation::Gq,
            Relation::Gq => Relation::Lq,
            Relation::Le => Relation::Gr,
            Relation::Gr => Relation::Le,
        }
    }
    /// Evaluates the relation on two concrete values
    pub fn holds(self, x: i64, y: i64) -> bool {
        match self {
            Relation::Eq => x == y,
            Relation::Nq => x != y,
            Relation::Lq => x <= y,
            Relation::Le => x < y,
            Relation::Gq => x >= y,
            Relation::Gr => x > y,
        }
    }
}

/// The errors raised when the kernel api is used in a way that makes no sense.
/// These are programming errors, as opposed to an [`Inconsistency`] which is
/// a perfectly normal outcome of the search.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("cannot branch over an empty collection of views")]
    EmptyBranching,
    #[error("arity mismatch: expected {expected} elements but found {found}")]
    ArityMismatch { expected: usize, found: usize },
    #[error("the domain [{min}, {max}] is empty")]
    EmptyDomain { min: i64, max: i64 },
    #[error("the value {0} exceeds the limits of a variable domain")]
    OutOfLimits(i64),
    #[error("a view cannot be scaled by zero")]
    ZeroScale,
    #[error("a failed space cannot be cloned")]
    CloneFailedSpace,
    #[error("the variable {0} does not belong to this space")]
    UnknownVariable(usize),
}

/// Division rounded towards negative infinity
pub(crate) fn floor_div(a: i64, b: i64) -> i64 {
    if b == -1 {
        return a.saturating_neg();
    }
    let q = a / b;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        q - 1
    } else {
        q
    }
}

/// Division rounded towards positive infinity
pub(crate) fn ceil_div(a: i64, b: i64) -> i64 {
    if b == -1 {
        return a.saturating_neg();
    }
    let q = a / b;
    if a % b != 0 && ((a < 0) == (b < 0)) {
        q + 1
    } else {
        q
    }
}

#[cfg(test)]
mod test_core {
    use crate::prelude::*;
    use crate::engine::core::{ceil_div, floor_div};

    #[test]
    fn val_is_only_triggered_by_val() {
        assert!(PropCond::Val.is_triggered_by(ModEvent::Val));
        assert!(!PropCond::Val.is_triggered_by(ModEvent::Bnd));
        assert!(!PropCond::Val.is_triggered_by(ModEvent::Dom));
        assert!(!PropCond::Val.is_triggered_by(ModEvent::None));
    }
    #[test]
    fn bnd_is_triggered_by_bnd_and_val() {
        assert!(PropCond::Bnd.is_triggered_by(ModEvent::Val));
        assert!(PropCond::Bnd.is_triggered_by(ModEvent::Bnd));
        assert!(!PropCond::Bnd.is_triggered_by(ModEvent::Dom));
        assert!(!PropCond::Bnd.is_triggered_by(ModEvent::None));
    }
    #[test]
    fn dom_is_triggered_by_any_change() {
        assert!(PropCond::Dom.is_triggered_by(ModEvent::Val));
        assert!(PropCond::Dom.is_triggered_by(ModEvent::Bnd));
        assert!(PropCond::Dom.is_triggered_by(ModEvent::Dom));
        assert!(!PropCond::Dom.is_triggered_by(ModEvent::None));
    }
    #[test]
    fn cost_classes_are_ordered() {
        assert!(PropCost::Unary < PropCost::Binary);
        assert!(PropCost::Linear < PropCost::Crazy);
        assert_eq!(0, PropCost::Unary.index());
        assert_eq!(PropCost::LEVELS - 1, PropCost::Crazy.index());
    }
    #[test]
    fn negated_relations_hold_on_complement() {
        let rels = [
            Relation::Eq,
            Relation::Nq,
            Relation::Lq,
            Relation::Le,
            Relation::Gq,
            Relation::Gr,
        ];
        for r in rels {
            for x in -2..=2 {
                for y in -2..=2 {
                    assert_ne!(r.holds(x, y), r.negate().holds(x, y));
                    assert_eq!(r.holds(x, y), r.flip().holds(y, x));
                }
            }
        }
    }
    #[test]
    fn rounded_divisions() {
        assert_eq!(2, floor_div(7, 3));
        assert_eq!(-3, floor_div(-7, 3));
        assert_eq!(-3, floor_div(7, -3));
        assert_eq!(2, floor_div(-7, -3));
        assert_eq!(3, ceil_div(7, 3));
        assert_eq!(-2, ceil_div(-7, 3));
        assert_eq!(-2, ceil_div(7, -3));
        assert_eq!(3, ceil_div(-7, -3));
        assert_eq!(2, ceil_div(6, 3));
        assert_eq!(-2, floor_div(-6, 3));
    }

    #[test]
    fn dividing_the_smallest_integer_by_minus_one_saturates() {
        assert_eq!(i64::MAX, floor_div(i64::MIN, -1));
        assert_eq!(i64::MAX, ceil_div(i64::MIN, -1));
        assert_eq!(-5, floor_div(5, -1));
        assert_eq!(i64::MIN + 1, ceil_div(i64::MAX, -1));
    }
}
