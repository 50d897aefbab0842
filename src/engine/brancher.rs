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

//! This module provides the branchers. A brancher is what shapes the search
//! tree: at each node it describes how the node splits into alternatives
//! (a [`Choice`]) and it knows how to commit one of these alternatives into a
//! space.
//!
//! # Note
//! A choice never holds a reference into the space that produced it. This is
//! what makes it possible to replay a choice on any clone of that space (or
//! of one of its ancestors) during recomputation.

use std::{cmp::Reverse, sync::Arc};

use crate::{CPResult, DomainReader, DomainStore, Inconsistency, ModEvent, Relation, Space, View};

/// An identifier to a brancher of a space
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BrancherId(pub(crate) usize);

/// A branching description
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Choice {
    pub(crate) brancher: BrancherId,
    alternatives: usize,
    position: usize,
    value: i64,
}

impl Choice {
    /// Creates a choice with the given number of alternatives about the view
    /// at `position` and the given `value`.
    pub fn new(alternatives: usize, position: usize, value: i64) -> Self {
        Self {
            brancher: BrancherId::default(),
            alternatives,
            position,
            value,
        }
    }
    /// The brancher which produced this choice
    pub fn brancher(&self) -> BrancherId {
        self.brancher
    }
    pub fn alternatives(&self) -> usize {
        self.alternatives
    }
    pub fn position(&self) -> usize {
        self.position
    }
    pub fn value(&self) -> i64 {
        self.value
    }
}

/// A literal is an elementary constraint `view rel value`. Each alternative
/// of a choice can be expressed as a literal; this is what no-goods are made
/// of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Literal {
    pub view: View,
    pub rel: Relation,
    pub value: i64,
}

impl Literal {
    pub fn new(view: View, rel: Relation, value: i64) -> Self {
        Self { view, rel, value }
    }
    /// The literal which holds exactly when this one does not
    pub fn negate(self) -> Self {
        Self {
            rel: self.rel.negate(),
            ..self
        }
    }
    /// Enforces the literal
    pub fn post<D: DomainStore + ?Sized>(&self, store: &mut D) -> CPResult<ModEvent> {
        let (x, v) = (self.view, self.value);
        match self.rel {
            Relation::Eq => store.fix(x, v),
            Relation::Nq => store.remove(x, v),
            Relation::Lq => store.remove_above(x, v),
            Relation::Le => store.remove_above(x, v.saturating_sub(1)),
            Relation::Gq => store.remove_below(x, v),
            Relation::Gr => store.remove_below(x, v.saturating_add(1)),
        }
    }
    /// Returns `Some(true)` when the literal is entailed by the current
    /// domains, `Some(false)` when it is disentailed and None otherwise.
    pub fn status<D: DomainReader + ?Sized>(&self, domains: &D) -> Option<bool> {
        let (x, v) = (self.view, self.value);
        let (min, max) = (domains.min(x), domains.max(x));
        match self.rel {
            Relation::Eq => {
                if !domains.contains(x, v) {
                    Some(false)
                } else if min == max {
                    Some(true)
                } else {
                    None
                }
            }
            Relation::Lq => {
                if max <= v {
                    Some(true)
                } else if min > v {
                    Some(false)
                } else {
                    None
                }
            }
            Relation::Le => {
                if max < v {
                    Some(true)
                } else if min >= v {
                    Some(false)
                } else {
                    None
                }
            }
            Relation::Nq | Relation::Gr | Relation::Gq => {
                self.negate().status(domains).map(|entailed| !entailed)
            }
        }
    }
}

/// A brancher decides how the search tree unfolds below a node
pub trait Brancher: Send {
    /// Returns true iff the brancher still has something to decide in the
    /// given space. A brancher that returns false is never consulted again
    /// in that space.
    fn status(&mut self, space: &Space) -> bool;
    /// Describes how the given space must be split
    fn description(&self, space: &Space) -> Choice;
    /// Enforces the alternative `alt` of the given choice
    fn commit(&self, space: &mut Space, choice: &Choice, alt: usize) -> CPResult<()>;
    /// Expresses the alternative `alt` of the given choice as a literal
    fn literal(&self, _choice: &Choice, _alt: usize) -> Option<Literal> {
        None
    }
    /// Creates an independent copy of this brancher
    fn boxed_clone(&self) -> Box<dyn Brancher>;
}

impl Clone for Box<dyn Brancher> {
    fn clone(&self) -> Self {
        self.boxed_clone()
    }
}

/// A merit function ranks the views: the one with the highest merit is
/// selected first
pub type Merit = Arc<dyn Fn(&Space, View) -> i64 + Send + Sync>;
/// A value function tells the value to branch on for a given view
pub type ValueFn = Arc<dyn Fn(&Space, View) -> i64 + Send + Sync>;

/// The strategy used to pick the next view to branch on. Ties are always
/// broken in favor of the earliest view.
#[derive(Clone)]
pub enum VarSelection {
    /// The first unassigned view
    InputOrder,
    /// The view with the smallest domain
    FirstFail,
    /// The view with the largest domain
    AntiFirstFail,
    /// The view with the smallest minimum
    SmallestMin,
    /// The view with the largest maximum
    LargestMax,
    /// The view with the highest merit
    Custom(Merit),
}

impl std::fmt::Debug for VarSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VarSelection::InputOrder => write!(f, "InputOrder"),
            VarSelection::FirstFail => write!(f, "FirstFail"),
            VarSelection::AntiFirstFail => write!(f, "AntiFirstFail"),
            VarSelection::SmallestMin => write!(f, "SmallestMin"),
            VarSelection::LargestMax => write!(f, "LargestMax"),
            VarSelection::Custom(_) => write!(f, "Custom"),
        }
    }
}

impl VarSelection {
    /// Returns the position of the selected view among the unassigned views
    /// of `views[start..]`
    fn select(&self, space: &Space, views: &[View], start: usize) -> usize {
        let mut candidates = (start..views.len()).filter(|&i| !space.is_fixed(views[i]));
        let selected = match self {
            VarSelection::InputOrder => candidates.next(),
            VarSelection::FirstFail => candidates.min_by_key(|&i| space.size(views[i])),
            VarSelection::AntiFirstFail => {
                candidates.min_by_key(|&i| Reverse(space.size(views[i])))
            }
            VarSelection::SmallestMin => candidates.min_by_key(|&i| space.min(views[i])),
            VarSelection::LargestMax => candidates.min_by_key(|&i| Reverse(space.max(views[i]))),
            VarSelection::Custom(merit) => {
                candidates.min_by_key(|&i| Reverse(merit(space, views[i])))
            }
        };
        match selected {
            Some(i) => i,
            None => {
                log::warn!("{self:?} selection without any unassigned view");
                start
            }
        }
    }
}

/// How the alternatives of a choice constrain the selected view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValCommit {
    /// `x == v` then `x != v`
    EqNq,
    /// `x <= v` then `x > v`
    LqGr,
    /// `x > v` then `x <= v`
    GrLq,
}

/// The strategy used to pick the value to branch on
#[derive(Clone)]
pub enum ValSelection {
    /// `x == min(x) | x != min(x)`
    Min,
    /// `x == max(x) | x != max(x)`
    Max,
    /// `x == med(x) | x != med(x)` where med is the lower median
    Median,
    /// `x <= mid(x) | x > mid(x)`
    SplitMin,
    /// `x > mid(x) | x <= mid(x)`
    SplitMax,
    /// Any value, with the given kind of alternatives
    Custom { select: ValueFn, commit: ValCommit },
}

impl std::fmt::Debug for ValSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValSelection::Min => write!(f, "Min"),
            ValSelection::Max => write!(f, "Max"),
            ValSelection::Median => write!(f, "Median"),
            ValSelection::SplitMin => write!(f, "SplitMin"),
            ValSelection::SplitMax => write!(f, "SplitMax"),
            ValSelection::Custom { commit, .. } => write!(f, "Custom({commit:?})"),
        }
    }
}

impl ValSelection {
    fn select(&self, space: &Space, view: View) -> i64 {
        match self {
            ValSelection::Min => space.min(view),
            ValSelection::Max => space.max(view),
            ValSelection::Median => median(space, view),
            ValSelection::SplitMin | ValSelection::SplitMax => {
                (space.min(view) + space.max(view)).div_euclid(2)
            }
            ValSelection::Custom { select, .. } => select(space, view),
        }
    }
    fn commit_kind(&self) -> ValCommit {
        match self {
            ValSelection::Min | ValSelection::Max | ValSelection::Median => ValCommit::EqNq,
            ValSelection::SplitMin => ValCommit::LqGr,
            ValSelection::SplitMax => ValCommit::GrLq,
            ValSelection::Custom { commit, .. } => *commit,
        }
    }
}

/// The lower median of the domain of a view
fn median(space: &Space, view: View) -> i64 {
    let mut rank = (space.size(view) - 1) / 2;
    for (lo, hi) in space.ranges(view) {
        let width = (hi - lo) as u64 + 1;
        if rank < width {
            return lo + rank as i64;
        }
        rank -= width;
    }
    space.min(view)
}

/// The brancher which assigns a collection of views one after the other
#[derive(Debug, Clone)]
pub struct ViewBrancher {
    views: Vec<View>,
    /// All views before this position are known to be assigned
    start: usize,
    var_sel: VarSelection,
    val_sel: ValSelection,
}

impl ViewBrancher {
    pub fn new(views: Vec<View>, var_sel: VarSelection, val_sel: ValSelection) -> Self {
        Self {
            views,
            start: 0,
            var_sel,
            val_sel,
        }
    }
}

impl Brancher for ViewBrancher {
    fn status(&mut self, space: &Space) -> bool {
        while self.start < self.views.len() && space.is_fixed(self.views[self.start]) {
            self.start += 1;
        }
        self.start < self.views.len()
    }
    fn description(&self, space: &Space) -> Choice {
        let position = self.var_sel.select(space, &self.views, self.start);
        let value = self.val_sel.select(space, self.views[position]);
        Choice::new(2, position, value)
    }
    fn commit(&self, space: &mut Space, choice: &Choice, alt: usize) -> CPResult<()> {
        match self.literal(choice, alt) {
            Some(literal) => literal.post(space).map(|_| ()),
            None => Err(Inconsistency),
        }
    }
    fn literal(&self, choice: &Choice, alt: usize) -> Option<Literal> {
        let view = *self.views.get(choice.position())?;
        let first = match self.val_sel.commit_kind() {
            ValCommit::EqNq => Relation::Eq,
            ValCommit::LqGr => Relation::Lq,
            ValCommit::GrLq => Relation::Gr,
        };
        let rel = match alt {
            0 => first,
            1 => first.negate(),
            _ => return None,
        };
        Some(Literal::new(view, rel, choice.value()))
    }
    fn boxed_clone(&self) -> Box<dyn Brancher> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod test_brancher {
    use std::sync::Arc;

    use crate::prelude::*;

    fn setup(doms: &[(i64, i64)]) -> (Space, Vec<View>) {
        let mut space = Space::new();
        let xs = doms
            .iter()
            .map(|&(lo, hi)| space.int_var(lo, hi).unwrap())
            .collect();
        (space, xs)
    }

    fn first_choice(space: &mut Space) -> Choice {
        assert_eq!(SpaceStatus::Branch, space.status());
        space.choice().unwrap()
    }

    #[test]
    fn empty_branching_is_an_error() {
        let mut space = Space::new();
        let res = space.branch(&[], VarSelection::InputOrder, ValSelection::Min);
        assert_eq!(Err(ModelError::EmptyBranching), res);
    }

    #[test]
    fn input_order_skips_assigned_views() {
        let (mut space, xs) = setup(&[(1, 1), (0, 3), (0, 1)]);
        space
            .branch(&xs, VarSelection::InputOrder, ValSelection::Min)
            .unwrap();
        let choice = first_choice(&mut space);
        assert_eq!(1, choice.position());
        assert_eq!(0, choice.value());
        assert_eq!(2, choice.alternatives());
    }

    #[test]
    fn first_fail_and_friends() {
        let (mut space, xs) = setup(&[(0, 5), (2, 3), (-1, 9), (1, 4)]);
        space.branch(&xs, VarSelection::FirstFail, ValSelection::Max).unwrap();
        space.branch(&xs, VarSelection::AntiFirstFail, ValSelection::Min).unwrap();
        let choice = first_choice(&mut space);
        assert_eq!(1, choice.position());
        assert_eq!(3, choice.value());

        let (mut space, xs) = setup(&[(0, 5), (2, 3), (-1, 9), (1, 4)]);
        space.branch(&xs, VarSelection::AntiFirstFail, ValSelection::Min).unwrap();
        assert_eq!(2, first_choice(&mut space).position());

        let (mut space, xs) = setup(&[(0, 5), (2, 3), (-1, 9), (1, 4)]);
        space.branch(&xs, VarSelection::SmallestMin, ValSelection::Min).unwrap();
        assert_eq!(2, first_choice(&mut space).position());

        let (mut space, xs) = setup(&[(0, 5), (2, 3), (-1, 9), (1, 9)]);
        space.branch(&xs, VarSelection::LargestMax, ValSelection::Min).unwrap();
        assert_eq!(2, first_choice(&mut space).position());
    }

    #[test]
    fn custom_merit() {
        let (mut space, xs) = setup(&[(0, 5), (2, 3), (-1, 9)]);
        let merit: Merit = Arc::new(|s: &Space, x: View| -s.max(x));
        space.branch(&xs, VarSelection::Custom(merit), ValSelection::Min).unwrap();
        assert_eq!(1, first_choice(&mut space).position());
    }

    #[test]
    fn median_value() {
        let (mut space, xs) = setup(&[(0, 9)]);
        space.remove(xs[0], 1).unwrap();
        space.remove(xs[0], 2).unwrap();
        space.branch(&xs, VarSelection::InputOrder, ValSelection::Median).unwrap();
        // 0 3 4 5 6 7 8 9
        assert_eq!(5, first_choice(&mut space).value());
    }

    #[test]
    fn eq_nq_alternatives() {
        let (mut space, xs) = setup(&[(0, 3)]);
        space.branch(&xs, VarSelection::InputOrder, ValSelection::Min).unwrap();
        let choice = first_choice(&mut space);

        let mut left = space.clone();
        left.commit(&choice, 0).unwrap();
        assert_eq!(Some(0), left.value(xs[0]));

        let mut right = space.clone();
        right.commit(&choice, 1).unwrap();
        assert_eq!(1, right.min(xs[0]));
        assert_eq!(1, right.commits());
    }

    #[test]
    fn split_alternatives() {
        let (mut space, xs) = setup(&[(0, 7)]);
        space.branch(&xs, VarSelection::InputOrder, ValSelection::SplitMax).unwrap();
        let choice = first_choice(&mut space);
        assert_eq!(3, choice.value());

        let mut left = space.clone();
        left.commit(&choice, 0).unwrap();
        assert_eq!((4, 7), (left.min(xs[0]), left.max(xs[0])));

        let mut right = space.clone();
        right.commit(&choice, 1).unwrap();
        assert_eq!((0, 3), (right.min(xs[0]), right.max(xs[0])));
    }

    #[test]
    fn choices_can_be_replayed_on_clones() {
        let (mut space, xs) = setup(&[(0, 3), (0, 3)]);
        space.branch(&xs, VarSelection::InputOrder, ValSelection::Min).unwrap();
        let root = space.clone();
        let choice = first_choice(&mut space);
        space.commit(&choice, 1).unwrap();

        let mut replay = root.clone();
        replay.commit(&choice, 1).unwrap();
        assert_eq!(space.ranges(xs[0]), replay.ranges(xs[0]));
    }

    #[test]
    fn literals_and_their_status() {
        let (mut space, xs) = setup(&[(0, 3)]);
        space.branch(&xs, VarSelection::InputOrder, ValSelection::SplitMin).unwrap();
        let choice = first_choice(&mut space);

        let left = space.literal(&choice, 0).unwrap();
        let right = space.literal(&choice, 1).unwrap();
        assert_eq!(Literal::new(xs[0], Relation::Lq, 1), left);
        assert_eq!(left.negate(), right);
        assert_eq!(None, space.literal(&choice, 2));

        assert_eq!(None, left.status(&space));
        space.remove_above(xs[0], 1).unwrap();
        assert_eq!(Some(true), left.status(&space));
        assert_eq!(Some(false), right.status(&space));
    }

    #[test]
    fn a_space_whose_views_are_all_assigned_is_solved() {
        let (mut space, xs) = setup(&[(1, 1), (2, 2)]);
        space.branch(&xs, VarSelection::FirstFail, ValSelection::Min).unwrap();
        assert_eq!(SpaceStatus::Solved, space.status());
        assert_eq!(None, space.choice());
    }
}
