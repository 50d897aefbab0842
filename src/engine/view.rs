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

//! This module provides the implementation of the views. A view is a
//! lightweight handle which lets a propagator see an affine transform of a
//! variable `coeff * x + offset` as if it were a variable of its own. This is
//! how a single propagator implementation can serve many constraints (e.g.
//! `x <= y` and `x <= y + 3` or `x <= -y`).

use crate::{
    ceil_div, floor_div, normalize, CPResult, Delta, Inconsistency, IntVarImp, ModelError,
    Variable,
};

/// A view over the variable `var`, standing for `coeff * var + offset`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct View {
    var: Variable,
    coeff: i64,
    offset: i64,
}

/// The narrowing operations which can be applied to a view
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Narrowing {
    /// Keep only this value
    Eq(i64),
    /// Remove this value
    Nq(i64),
    /// Remove all values greater than this one
    Lq(i64),
    /// Remove all values smaller than this one
    Gq(i64),
    /// Keep only the values covered by these intervals
    Inter(Vec<(i64, i64)>),
    /// Remove all values covered by these intervals
    Minus(Vec<(i64, i64)>),
}

impl From<Variable> for View {
    fn from(var: Variable) -> Self {
        View::new(var)
    }
}

impl View {
    /// The identity view of the given variable
    pub fn new(var: Variable) -> Self {
        Self {
            var,
            coeff: 1,
            offset: 0,
        }
    }
    /// The variable which is being viewed
    pub fn var(&self) -> Variable {
        self.var
    }
    /// The multiplicative coefficient of the transform
    pub fn coeff(&self) -> i64 {
        self.coeff
    }
    /// The additive constant of the transform
    pub fn constant(&self) -> i64 {
        self.offset
    }
    /// Returns a view standing for `self + c`
    pub fn offset(self, c: i64) -> Self {
        Self {
            offset: self.offset.saturating_add(c),
            ..self
        }
    }
    /// Returns a view standing for `-self`
    pub fn neg(self) -> Self {
        Self {
            var: self.var,
            coeff: -self.coeff,
            offset: -self.offset,
        }
    }
    /// Returns a view standing for `a * self`
    pub fn scale(self, a: i64) -> Result<Self, ModelError> {
        if a == 0 {
            return Err(ModelError::ZeroScale);
        }
        Ok(Self {
            var: self.var,
            coeff: self.coeff.saturating_mul(a),
            offset: self.offset.saturating_mul(a),
        })
    }
    /// Returns a view standing for the boolean negation `1 - self`
    pub fn not(self) -> Self {
        self.neg().offset(1)
    }
    /// The image of a variable value through this view
    fn apply(&self, x: i64) -> i64 {
        self.coeff.saturating_mul(x).saturating_add(self.offset)
    }
    /// The variable value whose image is `w` (if any)
    fn invert(&self, w: i64) -> Option<i64> {
        let t = w.saturating_sub(self.offset);
        match t.checked_rem(self.coeff) {
            Some(0) => t.checked_div(self.coeff),
            _ => None,
        }
    }
    /// The variable interval whose image falls in `lo..=hi`
    fn invert_range(&self, lo: i64, hi: i64) -> (i64, i64) {
        let lo = lo.saturating_sub(self.offset);
        let hi = hi.saturating_sub(self.offset);
        if self.coeff > 0 {
            (ceil_div(lo, self.coeff), floor_div(hi, self.coeff))
        } else {
            (ceil_div(hi, self.coeff), floor_div(lo, self.coeff))
        }
    }
    //~~~~~ READERS ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
    /// The smallest value of the view
    pub fn lower(&self, imp: &IntVarImp) -> i64 {
        if self.coeff > 0 {
            self.apply(imp.min())
        } else {
            self.apply(imp.max())
        }
    }
    /// The largest value of the view
    pub fn upper(&self, imp: &IntVarImp) -> i64 {
        if self.coeff > 0 {
            self.apply(imp.max())
        } else {
            self.apply(imp.min())
        }
    }
    pub fn size(&self, imp: &IntVarImp) -> u64 {
        imp.size()
    }
    pub fn contains(&self, imp: &IntVarImp, w: i64) -> bool {
        self.invert(w).map_or(false, |x| imp.contains(x))
    }
    pub fn assigned(&self, imp: &IntVarImp) -> bool {
        imp.assigned()
    }
    pub fn val(&self, imp: &IntVarImp) -> Option<i64> {
        imp.val().map(|x| self.apply(x))
    }
    /// The domain of the view as sorted disjoint intervals. A view with a
    /// coefficient other than 1 or -1 has holes between each pair of
    /// consecutive values, hence it yields one interval per value.
    pub fn ranges(&self, imp: &IntVarImp) -> Vec<(i64, i64)> {
        match self.coeff {
            1 => imp
                .ranges()
                .iter()
                .map(|&(lo, hi)| (self.apply(lo), self.apply(hi)))
                .collect(),
            -1 => imp
                .ranges()
                .iter()
                .rev()
                .map(|&(lo, hi)| (self.apply(hi), self.apply(lo)))
                .collect(),
            c if c > 0 => imp.values().map(|x| (self.apply(x), self.apply(x))).collect(),
            _ => {
                let mut values: Vec<(i64, i64)> =
                    imp.values().map(|x| (self.apply(x), self.apply(x))).collect();
                values.reverse();
                values
            }
        }
    }
    //~~~~~ NARROWING ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
    /// Applies the narrowing `op` (expressed in terms of the view) to the
    /// underlying variable. The returned delta is expressed in terms of the
    /// variable.
    pub(crate) fn narrow(&self, imp: &mut IntVarImp, op: &Narrowing) -> CPResult<Delta> {
        match op {
            Narrowing::Eq(w) => match self.invert(*w) {
                Some(x) => imp.eq(x),
                None => Err(Inconsistency),
            },
            Narrowing::Nq(w) => match self.invert(*w) {
                Some(x) => imp.nq(x),
                None => Ok(Delta::NONE),
            },
            Narrowing::Lq(w) => {
                let t = w.saturating_sub(self.offset);
                if self.coeff > 0 {
                    imp.lq(floor_div(t, self.coeff))
                } else {
                    imp.gq(ceil_div(t, self.coeff))
                }
            }
            Narrowing::Gq(w) => {
                let t = w.saturating_sub(self.offset);
                if self.coeff > 0 {
                    imp.gq(ceil_div(t, self.coeff))
                } else {
                    imp.lq(floor_div(t, self.coeff))
                }
            }
            Narrowing::Inter(ranges) => {
                let mapped = self.invert_ranges(ranges);
                imp.inter_ranges(&mapped)
            }
            Narrowing::Minus(ranges) => {
                let mapped = self.invert_ranges(ranges);
                imp.minus_ranges(&mapped)
            }
        }
    }
    fn invert_ranges(&self, ranges: &[(i64, i64)]) -> Vec<(i64, i64)> {
        normalize(
            ranges
                .iter()
                .map(|&(lo, hi)| self.invert_range(lo, hi))
                .collect(),
        )
    }
    /// Translates a delta expressed in terms of the variable into the same
    /// delta expressed in terms of this view
    pub fn translate(&self, delta: Delta) -> Delta {
        Delta {
            event: delta.event,
            removed: delta.removed.map(|(lo, hi)| {
                let (a, b) = (self.apply(lo), self.apply(hi));
                (a.min(b), a.max(b))
            }),
        }
    }
}

#[cfg(test)]
mod test_view {
    use crate::prelude::*;

    fn var(min: i64, max: i64) -> (Space, View) {
        let mut space = Space::new();
        let x = space.int_var(min, max).unwrap();
        (space, x)
    }

    #[test]
    fn offset_view_reads() {
        let (space, x) = var(0, 5);
        let y = x.offset(3);
        assert_eq!(3, space.min(y));
        assert_eq!(8, space.max(y));
        assert_eq!(6, space.size(y));
        assert!(space.contains(y, 4));
        assert!(!space.contains(y, 2));
    }

    #[test]
    fn negated_view_reads() {
        let (space, x) = var(1, 4);
        let y = x.neg();
        assert_eq!(-4, space.min(y));
        assert_eq!(-1, space.max(y));
        assert_eq!(vec![(-4, -1)], space.ranges(y));
    }

    #[test]
    fn scaled_view_has_holes() {
        let (space, x) = var(1, 3);
        let y = x.scale(2).unwrap();
        assert_eq!(2, space.min(y));
        assert_eq!(6, space.max(y));
        assert!(space.contains(y, 4));
        assert!(!space.contains(y, 3));
        assert_eq!(vec![(2, 2), (4, 4), (6, 6)], space.ranges(y));
        assert_eq!(Err(ModelError::ZeroScale), x.scale(0));
    }

    #[test]
    fn boolean_not() {
        let mut space = Space::new();
        let b = space.bool_var();
        let nb = b.not();
        assert_eq!(Ok(ModEvent::Val), space.fix(nb, 1));
        assert_eq!(Some(0), space.value(b));
        assert_eq!(Some(1), space.value(nb));
    }

    #[test]
    fn narrowing_a_negated_view_swaps_the_bounds() {
        let (mut space, x) = var(-10, 10);
        let y = x.neg();
        assert_eq!(Ok(ModEvent::Bnd), space.remove_above(y, 3));
        assert_eq!(-3, space.min(x));
        assert_eq!(Ok(ModEvent::Bnd), space.remove_below(y, -5));
        assert_eq!(5, space.max(x));
    }

    #[test]
    fn narrowing_a_scaled_view_rounds_inwards() {
        let (mut space, x) = var(-10, 10);
        let y = x.scale(3).unwrap();
        space.remove_above(y, 8).unwrap();
        assert_eq!(2, space.max(x));
        space.remove_below(y, -7).unwrap();
        assert_eq!(-2, space.min(x));

        let z = x.scale(-2).unwrap();
        space.remove_above(z, 3).unwrap();
        assert_eq!(-1, space.min(x));
    }

    #[test]
    fn values_not_representable_by_a_view_are_absent() {
        let (mut space, x) = var(0, 10);
        let y = x.scale(2).unwrap();
        assert_eq!(Ok(ModEvent::None), space.remove(y, 3));
        assert_eq!(Err(Inconsistency), space.fix(y, 3));
    }

    #[test]
    fn composition_is_affine() {
        let (mut space, x) = var(0, 10);
        let y = x.scale(2).unwrap().offset(1).neg();
        assert_eq!(-21, space.min(y));
        assert_eq!(-1, space.max(y));
        space.fix(y, -7).unwrap();
        assert_eq!(Some(3), space.value(x));
    }

    #[test]
    fn intersect_through_a_view() {
        let (mut space, x) = var(0, 10);
        let y = x.neg().offset(10);
        space.intersect(y, &[(0, 2), (8, 9)]).unwrap();
        assert_eq!(vec![(1, 2), (8, 10)], space.ranges(x));
        space.exclude(y, &[(9, 9)]).unwrap();
        assert_eq!(vec![(2, 2), (8, 10)], space.ranges(x));
    }

    #[test]
    fn extreme_values_through_a_negated_view() {
        let (space, x) = var(0, 10);
        assert!(!space.contains(x.neg(), i64::MIN));

        let (mut space, x) = var(0, 10);
        post_rel_const(&mut space, x.neg(), Relation::Lq, i64::MIN).unwrap();
        assert!(space.failed());

        let (mut space, x) = var(0, 10);
        post_rel_const(&mut space, x.neg(), Relation::Gq, i64::MIN).unwrap();
        assert!(!space.failed());
        assert_eq!(vec![(0, 10)], space.ranges(x));

        let (mut space, x) = var(0, 10);
        assert_eq!(Err(Inconsistency), space.fix(x.neg(), i64::MIN));
    }

    #[test]
    fn deltas_are_translated_into_view_space() {
        let (_, x) = var(0, 10);
        let y = x.neg().offset(1);
        let delta = Delta {
            event: ModEvent::Bnd,
            removed: Some((0, 3)),
        };
        let translated = y.translate(delta);
        assert_eq!(ModEvent::Bnd, translated.event);
        assert_eq!(Some((-2, 1)), translated.removed);
    }
}
