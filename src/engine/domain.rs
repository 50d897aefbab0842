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

//! This module provides the definition and implementation of the integer
//! variables. The domain of a variable is stored as a list of ranges; each
//! variable also keeps track of who must be told when its domain changes.

use std::cmp::Ordering;

use crate::{
    AdvisorId, CPResult, Inconsistency, ModEvent, ModelError, PropCond, PropagatorId, MAX_VALUE,
    MIN_VALUE,
};

/// An integer variable that can be used in a CP model. This is nothing but
/// an index in the variables of a space.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Variable(pub(crate) usize);

impl Variable {
    /// Returns the position of this variable in its space
    pub fn index(self) -> usize {
        self.0
    }
}

/// A delta describes one modification of a domain. This is what advisors
/// are given to decide whether or not their propagator must be scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Delta {
    /// The kind of modification that occurred
    pub event: ModEvent,
    /// An interval covering all the values that were removed (when known)
    pub removed: Option<(i64, i64)>,
}

impl Delta {
    /// The delta of an operation which had no effect
    pub const NONE: Delta = Delta {
        event: ModEvent::None,
        removed: None,
    };

    /// Returns true iff the domain has actually changed
    pub fn is_change(&self) -> bool {
        self.event != ModEvent::None
    }
}

/// A subscription records that a propagator must be scheduled when the
/// domain of some variable is modified in a way that satisfies `cond`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    pub propagator: PropagatorId,
    pub cond: PropCond,
}

/// This is the implementation of an integer variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntVarImp {
    /// The values of the domain as sorted, disjoint, non adjacent intervals
    ranges: Vec<(i64, i64)>,
    /// Number of values in the domain
    size: u64,
    /// Incremented each time the domain is modified
    stamp: u64,
    /// The propagators to wake up upon modification
    pub(crate) subscriptions: Vec<Subscription>,
    /// The advisors to notify upon modification
    pub(crate) advisors: Vec<AdvisorId>,
}

fn width(lo: i64, hi: i64) -> u64 {
    (hi - lo) as u64 + 1
}

/// Sorts a list of intervals and merges the ones that overlap or touch.
/// Empty intervals are dropped.
pub(crate) fn normalize(mut ranges: Vec<(i64, i64)>) -> Vec<(i64, i64)> {
    ranges.retain(|(lo, hi)| lo <= hi);
    ranges.sort_unstable();
    let mut out: Vec<(i64, i64)> = Vec::with_capacity(ranges.len());
    for (lo, hi) in ranges {
        match out.last_mut() {
            Some(last) if lo <= last.1.saturating_add(1) => last.1 = last.1.max(hi),
            _ => out.push((lo, hi)),
        }
    }
    out
}

impl IntVarImp {
    /// Creates a variable whose domain is `min..=max`
    pub(crate) fn new(min: i64, max: i64) -> Result<Self, ModelError> {
        if min > max {
            return Err(ModelError::EmptyDomain { min, max });
        }
        if min < MIN_VALUE {
            return Err(ModelError::OutOfLimits(min));
        }
        if max > MAX_VALUE {
            return Err(ModelError::OutOfLimits(max));
        }
        Ok(Self {
            ranges: vec![(min, max)],
            size: width(min, max),
            stamp: 0,
            subscriptions: vec![],
            advisors: vec![],
        })
    }
    /// Creates a 0,1 variable
    pub(crate) fn boolean() -> Self {
        Self {
            ranges: vec![(0, 1)],
            size: 2,
            stamp: 0,
            subscriptions: vec![],
            advisors: vec![],
        }
    }
    //~~~~~ READERS ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
    /// The smallest value of the domain
    pub fn min(&self) -> i64 {
        self.ranges[0].0
    }
    /// The largest value of the domain
    pub fn max(&self) -> i64 {
        self.ranges[self.ranges.len() - 1].1
    }
    /// The number of values in the domain
    pub fn size(&self) -> u64 {
        self.size
    }
    /// True iff only one value is left
    pub fn assigned(&self) -> bool {
        self.size == 1
    }
    /// The value of an assigned variable
    pub fn val(&self) -> Option<i64> {
        if self.assigned() {
            Some(self.min())
        } else {
            None
        }
    }
    /// True iff v belongs to the domain
    pub fn contains(&self, v: i64) -> bool {
        self.locate(v).is_ok()
    }
    /// The intervals composing the domain
    pub fn ranges(&self) -> &[(i64, i64)] {
        &self.ranges
    }
    /// Iterates over all the values of the domain in increasing order
    pub fn values(&self) -> impl Iterator<Item = i64> + '_ {
        self.ranges.iter().flat_map(|&(lo, hi)| lo..=hi)
    }
    /// The modification stamp of this variable
    pub fn stamp(&self) -> u64 {
        self.stamp
    }
    /// Finds the range holding `v`
    fn locate(&self, v: i64) -> Result<usize, usize> {
        self.ranges.binary_search_by(|&(lo, hi)| {
            if hi < v {
                Ordering::Less
            } else if lo > v {
                Ordering::Greater
            } else {
                Ordering::Equal
            }
        })
    }
    //~~~~~ NARROWING ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
    /// Restricts the domain to the single value v
    pub(crate) fn eq(&mut self, v: i64) -> CPResult<Delta> {
        if !self.contains(v) {
            return Err(Inconsistency);
        }
        if self.assigned() {
            return Ok(Delta::NONE);
        }
        let (old_min, old_max) = (self.min(), self.max());
        self.ranges.clear();
        self.ranges.push((v, v));
        Ok(self.changed(old_min, old_max, Some((old_min, old_max))))
    }
    /// Removes v from the domain
    pub(crate) fn nq(&mut self, v: i64) -> CPResult<Delta> {
        let Ok(i) = self.locate(v) else {
            return Ok(Delta::NONE);
        };
        if self.assigned() {
            return Err(Inconsistency);
        }
        let (old_min, old_max) = (self.min(), self.max());
        let (lo, hi) = self.ranges[i];
        match (lo == v, hi == v) {
            (true, true) => {
                self.ranges.remove(i);
            }
            (true, false) => self.ranges[i].0 = v + 1,
            (false, true) => self.ranges[i].1 = v - 1,
            (false, false) => {
                self.ranges[i].1 = v - 1;
                self.ranges.insert(i + 1, (v + 1, hi));
            }
        }
        Ok(self.changed(old_min, old_max, Some((v, v))))
    }
    /// Removes all values greater than v
    pub(crate) fn lq(&mut self, v: i64) -> CPResult<Delta> {
        let (old_min, old_max) = (self.min(), self.max());
        if v >= old_max {
            return Ok(Delta::NONE);
        }
        if v < old_min {
            return Err(Inconsistency);
        }
        let keep = self.ranges.partition_point(|&(lo, _)| lo <= v);
        self.ranges.truncate(keep);
        if let Some(last) = self.ranges.last_mut() {
            last.1 = last.1.min(v);
        }
        Ok(self.changed(old_min, old_max, Some((v + 1, old_max))))
    }
    /// Removes all values greater or equal to v
    pub(crate) fn le(&mut self, v: i64) -> CPResult<Delta> {
        self.lq(v.saturating_sub(1))
    }
    /// Removes all values smaller than v
    pub(crate) fn gq(&mut self, v: i64) -> CPResult<Delta> {
        let (old_min, old_max) = (self.min(), self.max());
        if v <= old_min {
            return Ok(Delta::NONE);
        }
        if v > old_max {
            return Err(Inconsistency);
        }
        let drop = self.ranges.partition_point(|&(_, hi)| hi < v);
        self.ranges.drain(..drop);
        self.ranges[0].0 = self.ranges[0].0.max(v);
        Ok(self.changed(old_min, old_max, Some((old_min, v - 1))))
    }
    /// Removes all values smaller or equal to v
    pub(crate) fn gr(&mut self, v: i64) -> CPResult<Delta> {
        self.gq(v.saturating_add(1))
    }
    /// Keeps only the values that belong to one of the given (normalized)
    /// intervals
    pub(crate) fn inter_ranges(&mut self, other: &[(i64, i64)]) -> CPResult<Delta> {
        let mut out = Vec::with_capacity(self.ranges.len());
        let (mut i, mut j) = (0, 0);
        while i < self.ranges.len() && j < other.len() {
            let (alo, ahi) = self.ranges[i];
            let (blo, bhi) = other[j];
            let lo = alo.max(blo);
            let hi = ahi.min(bhi);
            if lo <= hi {
                out.push((lo, hi));
            }
            if ahi < bhi {
                i += 1;
            } else {
                j += 1;
            }
        }
        self.replace(out, None)
    }
    /// Removes all values that belong to one of the given (normalized)
    /// intervals
    pub(crate) fn minus_ranges(&mut self, other: &[(i64, i64)]) -> CPResult<Delta> {
        if other.is_empty() {
            return Ok(Delta::NONE);
        }
        let mut out = Vec::with_capacity(self.ranges.len() + other.len());
        let mut j = 0;
        for &(lo, hi) in self.ranges.iter() {
            let mut cur = lo;
            while j < other.len() && other[j].1 < cur {
                j += 1;
            }
            let mut k = j;
            while cur <= hi && k < other.len() && other[k].0 <= hi {
                if other[k].0 > cur {
                    out.push((cur, other[k].0 - 1));
                }
                cur = cur.max(other[k].1.saturating_add(1));
                k += 1;
            }
            if cur <= hi {
                out.push((cur, hi));
            }
        }
        let hull = (other[0].0, other[other.len() - 1].1);
        self.replace(out, Some(hull))
    }
    /// Replaces the domain by a subset of itself
    fn replace(&mut self, ranges: Vec<(i64, i64)>, hull: Option<(i64, i64)>) -> CPResult<Delta> {
        if ranges.is_empty() {
            return Err(Inconsistency);
        }
        let size: u64 = ranges.iter().map(|&(lo, hi)| width(lo, hi)).sum();
        if size == self.size {
            return Ok(Delta::NONE);
        }
        let (old_min, old_max) = (self.min(), self.max());
        self.ranges = ranges;
        let removed = match hull {
            Some((lo, hi)) => (lo.max(old_min), hi.min(old_max)),
            None => (old_min, old_max),
        };
        Ok(self.changed(old_min, old_max, Some(removed)))
    }
    /// Updates the bookkeeping after a modification and tells what happened
    fn changed(&mut self, old_min: i64, old_max: i64, removed: Option<(i64, i64)>) -> Delta {
        self.size = self.ranges.iter().map(|&(lo, hi)| width(lo, hi)).sum();
        self.stamp += 1;
        let event = if self.size == 1 {
            ModEvent::Val
        } else if self.min() != old_min || self.max() != old_max {
            ModEvent::Bnd
        } else {
            ModEvent::Dom
        };
        Delta { event, removed }
    }
}

#[cfg(test)]
mod test_intvarimp {
    use super::*;

    #[test]
    fn new_rejects_empty_and_unbounded_domains() {
        assert_eq!(
            Err(ModelError::EmptyDomain { min: 3, max: 2 }),
            IntVarImp::new(3, 2)
        );
        assert!(IntVarImp::new(i64::MIN, 0).is_err());
        assert!(IntVarImp::new(0, i64::MAX).is_err());
        assert!(IntVarImp::new(MIN_VALUE, MAX_VALUE).is_ok());
    }

    #[test]
    fn readers_on_a_fresh_variable() {
        let x = IntVarImp::new(-2, 5).unwrap();
        assert_eq!(-2, x.min());
        assert_eq!(5, x.max());
        assert_eq!(8, x.size());
        assert!(!x.assigned());
        assert!(x.contains(0));
        assert!(!x.contains(6));
        assert_eq!(None, x.val());
        assert_eq!(0, x.stamp());
    }

    #[test]
    fn nq_in_the_middle_splits_a_range() {
        let mut x = IntVarImp::new(0, 5).unwrap();
        let d = x.nq(3).unwrap();
        assert_eq!(ModEvent::Dom, d.event);
        assert_eq!(Some((3, 3)), d.removed);
        assert_eq!(&[(0, 2), (4, 5)], x.ranges());
        assert_eq!(5, x.size());
        assert_eq!(1, x.stamp());
    }

    #[test]
    fn nq_on_a_bound_is_a_bound_event() {
        let mut x = IntVarImp::new(0, 5).unwrap();
        assert_eq!(ModEvent::Bnd, x.nq(0).unwrap().event);
        assert_eq!(ModEvent::Bnd, x.nq(5).unwrap().event);
        assert_eq!(&[(1, 4)], x.ranges());
    }

    #[test]
    fn nq_of_an_absent_value_changes_nothing() {
        let mut x = IntVarImp::new(0, 5).unwrap();
        assert_eq!(Delta::NONE, x.nq(9).unwrap());
        assert_eq!(0, x.stamp());
    }

    #[test]
    fn nq_of_the_last_value_fails() {
        let mut x = IntVarImp::new(4, 4).unwrap();
        assert_eq!(Err(Inconsistency), x.nq(4));
    }

    #[test]
    fn removing_all_but_one_value_is_a_val_event() {
        let mut x = IntVarImp::new(0, 1).unwrap();
        assert_eq!(ModEvent::Val, x.nq(1).unwrap().event);
        assert_eq!(Some(0), x.val());
    }

    #[test]
    fn eq_keeps_one_value() {
        let mut x = IntVarImp::new(0, 9).unwrap();
        assert_eq!(ModEvent::Val, IntVarImp::eq(&mut x, 4).unwrap().event);
        assert_eq!(Some(4), x.val());
        assert_eq!(Delta::NONE, IntVarImp::eq(&mut x, 4).unwrap());
        assert_eq!(Err(Inconsistency), IntVarImp::eq(&mut x, 5));
    }

    #[test]
    fn bounds_narrowing() {
        let mut x = IntVarImp::new(0, 9).unwrap();
        x.nq(5).unwrap();
        x.nq(6).unwrap();
        assert_eq!(&[(0, 4), (7, 9)], x.ranges());

        let d = x.lq(6).unwrap();
        assert_eq!(ModEvent::Bnd, d.event);
        assert_eq!(&[(0, 4)], x.ranges());
        assert_eq!(Some((7, 9)), d.removed);

        let d = x.gr(1).unwrap();
        assert_eq!(ModEvent::Bnd, d.event);
        assert_eq!(&[(2, 4)], x.ranges());
        assert_eq!(Some((0, 1)), d.removed);

        assert_eq!(Delta::NONE, x.le(5).unwrap());
        assert_eq!(Delta::NONE, x.gq(2).unwrap());
        assert_eq!(Err(Inconsistency), x.le(2));
        assert_eq!(Err(Inconsistency), x.gq(5));
    }

    #[test]
    fn gq_skips_holes() {
        let mut x = IntVarImp::new(0, 9).unwrap();
        x.nq(5).unwrap();
        x.gq(5).unwrap();
        assert_eq!(6, x.min());
        assert_eq!(&[(6, 9)], x.ranges());
    }

    #[test]
    fn intersection_with_ranges() {
        let mut x = IntVarImp::new(0, 20).unwrap();
        let d = x.inter_ranges(&[(-5, 2), (4, 4), (10, 12), (19, 30)]).unwrap();
        // both bounds survive
        assert_eq!(ModEvent::Dom, d.event);
        assert_eq!(&[(0, 2), (4, 4), (10, 12), (19, 20)], x.ranges());
        assert_eq!(9, x.size());

        let d = x.inter_ranges(&[(0, 2), (4, 4), (10, 12), (19, 20)]).unwrap();
        assert_eq!(Delta::NONE, d);

        let d = x.inter_ranges(&[(0, 0), (20, 20)]).unwrap();
        assert_eq!(ModEvent::Dom, d.event);
        assert_eq!(Err(Inconsistency), x.inter_ranges(&[(5, 9)]));
    }

    #[test]
    fn difference_with_ranges() {
        let mut x = IntVarImp::new(0, 20).unwrap();
        let d = x.minus_ranges(&[(-5, 2), (4, 4), (10, 12)]).unwrap();
        assert_eq!(ModEvent::Bnd, d.event);
        assert_eq!(Some((0, 12)), d.removed);
        assert_eq!(&[(3, 3), (5, 9), (13, 20)], x.ranges());

        let d = x.minus_ranges(&[(6, 7), (15, 16)]).unwrap();
        assert_eq!(ModEvent::Dom, d.event);
        assert_eq!(&[(3, 3), (5, 5), (8, 9), (13, 14), (17, 20)], x.ranges());

        assert_eq!(Delta::NONE, x.minus_ranges(&[(21, 40)]).unwrap());
        assert_eq!(Err(Inconsistency), x.minus_ranges(&[(0, 20)]));
    }

    #[test]
    fn each_change_bumps_the_stamp() {
        let mut x = IntVarImp::new(0, 20).unwrap();
        x.nq(3).unwrap();
        x.nq(3).unwrap();
        x.lq(10).unwrap();
        x.lq(10).unwrap();
        assert_eq!(2, x.stamp());
    }

    #[test]
    fn normalize_merges_touching_intervals() {
        let ranges = normalize(vec![(5, 6), (1, 2), (3, 3), (8, 7), (10, 12), (11, 15)]);
        assert_eq!(vec![(1, 3), (5, 6), (10, 15)], ranges);
    }
}
