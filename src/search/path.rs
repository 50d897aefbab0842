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

//! This module provides the path of a depth first search: the stack of the
//! choices that lead from the root to the current node. Some edges also
//! hold a clone of the node where their choice was made. The other nodes
//! are recomputed from the nearest clone above them.

use log::warn;

use crate::{Choice, Literal, ResourceExhausted, Space, SpaceStatus, Statistics};

/// One level of the search path
#[derive(Debug, Clone)]
struct Edge {
    /// A clone of the node where the choice was made (if any)
    space: Option<Space>,
    choice: Choice,
    /// The alternative being explored
    alt: usize,
    /// Only the alternatives below this one belong to this path. The others
    /// have been stolen.
    limit: usize,
    /// The literal of each alternative (when the path records them)
    literals: Vec<Option<Literal>>,
}

impl Edge {
    fn rightmost(&self) -> bool {
        self.alt + 1 >= self.limit
    }
    /// True when the edge has been marked for reuse by the last alternative
    /// optimisation
    fn lao(&self) -> bool {
        self.alt >= self.limit
    }
    /// The alternative actually committed
    fn truealt(&self) -> usize {
        self.alt.min(self.limit.saturating_sub(1))
    }
    /// True when some alternative is still to be explored
    fn work(&self) -> bool {
        self.alt + 1 < self.limit
    }
    /// Gives away the last alternative of this edge
    fn steal(&mut self) -> usize {
        self.limit -= 1;
        self.limit
    }
    fn literal(&self, alt: usize) -> Option<Literal> {
        self.literals.get(alt).copied().flatten()
    }
}

/// The incumbent of a branch and bound search. The nodes stored on the path
/// at a depth below `mark` have not been constrained by `best` yet.
#[derive(Debug, Clone, Default)]
pub(crate) struct Incumbent {
    pub best: Option<Space>,
    pub mark: usize,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Path {
    edges: Vec<Edge>,
    /// The no-good depth limit. The edges below this depth are never reused
    /// by the last alternative optimisation.
    ngdl: usize,
    /// Whether the literals of the alternatives are recorded
    record: bool,
}

impl Path {
    /// Creates an empty path. When `record` is set, the literals of each
    /// choice are kept so that no-goods can be derived from the path.
    pub fn new(ngdl: usize, record: bool) -> Self {
        Self {
            edges: vec![],
            ngdl,
            record,
        }
    }
    pub fn len(&self) -> usize {
        self.edges.len()
    }
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
    pub fn set_ngdl(&mut self, ngdl: usize) {
        self.ngdl = ngdl;
    }
    pub fn reset(&mut self) {
        self.edges.clear();
    }
    /// Pushes a new edge for the choice made in `node`. An edge which was
    /// marked by the last alternative optimisation is replaced.
    pub fn push(&mut self, node: &Space, clone: Option<Space>, choice: Choice) {
        if self.edges.last().map_or(false, Edge::lao) {
            self.edges.pop();
        }
        let literals = if self.record {
            (0..choice.alternatives())
                .map(|alt| node.literal(&choice, alt))
                .collect()
        } else {
            vec![]
        };
        self.edges.push(Edge {
            space: clone,
            limit: choice.alternatives(),
            choice,
            alt: 0,
            literals,
        });
    }
    /// Moves to the next alternative, popping the exhausted edges. Returns
    /// false when the whole tree has been explored.
    pub fn next(&mut self) -> bool {
        while let Some(top) = self.edges.last_mut() {
            if top.rightmost() {
                self.edges.pop();
            } else {
                top.alt += 1;
                return true;
            }
        }
        false
    }
    /// The position of the deepest clone
    fn lc(&self) -> Option<usize> {
        self.edges.iter().rposition(|e| e.space.is_some())
    }
    /// Drops the edges from `l` (included) on
    fn unwind(&mut self, l: usize) {
        self.edges.truncate(l);
    }
    fn commit(&self, space: &mut Space, i: usize, stats: &mut Statistics) {
        let edge = &self.edges[i];
        // a failure shows when the status is computed
        let _ = space.commit(&edge.choice, edge.truealt());
        stats.commits += 1;
    }
    /// Computes the status of a node on the path
    fn status(space: &mut Space, stats: &mut Statistics) -> Result<SpaceStatus, ResourceExhausted> {
        let before = space.propagations();
        let status = space.status();
        stats.propagations += space.propagations() - before;
        match space.exhausted() {
            Some(exhausted) => Err(exhausted),
            None => Ok(status),
        }
    }

    /// Recomputes the node the path leads to. `d` is set to the distance
    /// between the returned node and the clone it was recomputed from. None
    /// means that the node turned out to be failed while recomputing: the
    /// path has been unwound and must be moved to its next alternative.
    ///
    /// In a branch and bound search, the clones used for recomputation are
    /// constrained by the incumbent when they were stored before it was
    /// found.
    pub fn recompute(
        &mut self,
        d: &mut usize,
        a_d: usize,
        stats: &mut Statistics,
        mut bab: Option<&mut Incumbent>,
    ) -> Result<Option<Space>, ResourceExhausted> {
        let n = self.edges.len();
        if n == 0 {
            return Ok(None);
        }

        // last alternative optimisation: the clone is used up
        let ngdl = self.ngdl;
        let top = &mut self.edges[n - 1];
        if top.rightmost() {
            if let Some(mut space) = top.space.take() {
                let _ = space.commit(&top.choice, top.truealt());
                stats.commits += 1;
                if let Some(inc) = bab.as_deref_mut() {
                    if inc.mark > n - 1 {
                        inc.mark = n - 1;
                        if let Some(best) = inc.best.as_ref() {
                            let _ = space.constrain(best);
                        }
                    }
                }
                if n > ngdl {
                    top.alt += 1;
                }
                *d = 0;
                return Ok(Some(space));
            }
        }

        let Some(l) = self.lc() else {
            warn!("no clone left on a path of length {n}");
            self.reset();
            return Ok(None);
        };
        *d = n - l;

        let mut space = match bab {
            Some(inc) if l < inc.mark => {
                inc.mark = l;
                let Some(stored) = self.edges[l].space.as_mut() else {
                    return Ok(None);
                };
                if let Some(best) = inc.best.as_ref() {
                    let _ = stored.constrain(best);
                }
                if Self::status(stored, stats)? == SpaceStatus::Failed {
                    stats.fails += 1;
                    self.unwind(l);
                    return Ok(None);
                }
                stats.clones += 1;
                stored.clone()
            }
            _ => match self.edges[l].space.as_ref() {
                Some(stored) => {
                    stats.clones += 1;
                    stored.clone()
                }
                None => return Ok(None),
            },
        };

        if *d < a_d {
            for i in l..n {
                self.commit(&mut space, i, stats);
            }
        } else {
            let m = l + *d / 2;
            let mut i = l;
            while i < m {
                self.commit(&mut space, i, stats);
                i += 1;
            }
            while i < n && self.edges[i].rightmost() {
                self.commit(&mut space, i, stats);
                i += 1;
            }
            // store an extra clone halfway
            if i + 1 < n {
                if Self::status(&mut space, stats)? == SpaceStatus::Failed {
                    stats.fails += 1;
                    self.unwind(i);
                    return Ok(None);
                }
                stats.clones += 1;
                self.edges[i].space = Some(space.clone());
                *d = n - i;
            }
            while i < n {
                self.commit(&mut space, i, stats);
                i += 1;
            }
        }
        Ok(Some(space))
    }

    /// Gives away the shallowest alternative that has not been explored yet.
    /// The returned node is computed from the nearest clone.
    pub fn steal(&mut self, stats: &mut Statistics) -> Option<Space> {
        let n = self.edges.iter().position(Edge::work)?;
        let l = self.edges[..=n].iter().rposition(|e| e.space.is_some())?;
        let mut space = self.edges[l].space.as_ref()?.clone();
        stats.clones += 1;
        for i in l..n {
            self.commit(&mut space, i, stats);
        }
        let edge = &mut self.edges[n];
        let alt = edge.steal();
        let _ = space.commit(&edge.choice, alt);
        stats.commits += 1;
        Some(space)
    }

    /// The no-goods describing the parts of the tree that have been explored
    /// already: for every edge (up to the no-good depth limit) and every
    /// alternative before the current one, the conjunction of the current
    /// alternatives above that edge with the alternative itself.
    pub fn nogoods(&self) -> Vec<Vec<Literal>> {
        let mut nogoods = vec![];
        let mut prefix = vec![];
        for edge in self.edges.iter().take(self.ngdl) {
            let current = edge.truealt();
            for alt in 0..current {
                if let Some(literal) = edge.literal(alt) {
                    let mut nogood = prefix.clone();
                    nogood.push(literal);
                    nogoods.push(nogood);
                }
            }
            match edge.literal(current) {
                Some(literal) => prefix.push(literal),
                None => break,
            }
        }
        nogoods
    }

    /// The conjunction of the alternatives that lead to the current node
    pub fn decisions(&self) -> Option<Vec<Literal>> {
        self.edges.iter().map(|e| e.literal(e.truealt())).collect()
    }
}

#[cfg(test)]
mod test_path {
    use crate::prelude::*;
    use crate::search::path::{Incumbent, Path};

    /// Four binary variables, no constraint
    fn root() -> (Space, Vec<View>) {
        let mut space = Space::new();
        let xs: Vec<View> = (0..4).map(|_| space.bool_var()).collect();
        space
            .branch(&xs, VarSelection::InputOrder, ValSelection::Min)
            .unwrap();
        (space, xs)
    }

    /// Walks down the leftmost branch, storing no clone but at the root
    fn dive(path: &mut Path, mut space: Space) -> Space {
        let mut first = true;
        while space.status() == SpaceStatus::Branch {
            let choice = space.choice().unwrap();
            let clone = first.then(|| space.clone());
            first = false;
            path.push(&space, clone, choice.clone());
            space.commit(&choice, 0).unwrap();
        }
        space
    }

    #[test]
    fn next_pops_the_rightmost_edges() {
        let (space, _) = root();
        let mut path = Path::new(0, false);
        dive(&mut path, space);
        assert_eq!(4, path.len());
        assert!(path.next());
        assert_eq!(4, path.len());
        assert!(path.next());
        assert_eq!(3, path.len());
    }

    #[test]
    fn recomputation_replays_the_path() {
        let (space, xs) = root();
        let mut path = Path::new(0, false);
        dive(&mut path, space);
        path.next();
        path.next();

        let mut d = 0;
        let mut stats = Statistics::default();
        let mut node = path
            .recompute(&mut d, 100, &mut stats, None)
            .unwrap()
            .unwrap();
        assert_eq!(3, d);
        assert_eq!(SpaceStatus::Branch, node.status());
        assert_eq!(Some(0), node.value(xs[0]));
        assert_eq!(Some(0), node.value(xs[1]));
        assert_eq!(Some(1), node.value(xs[2]));
        assert!(!node.is_fixed(xs[3]));
    }

    #[test]
    fn adaptive_recomputation_stores_a_clone_halfway() {
        let (space, _) = root();
        let mut path = Path::new(0, false);
        dive(&mut path, space);
        path.next();
        path.next();

        let mut d = 0;
        let mut stats = Statistics::default();
        path.recompute(&mut d, 2, &mut stats, None).unwrap().unwrap();
        assert_eq!(2, stats.clones);
        // the next recomputation starts from the middle of the path
        path.recompute(&mut d, 2, &mut stats, None).unwrap().unwrap();
        assert!(d < 3);
    }

    #[test]
    fn last_alternative_reuses_the_clone() {
        let (mut space, xs) = root();
        let mut path = Path::new(0, false);
        assert_eq!(SpaceStatus::Branch, space.status());
        let choice = space.choice().unwrap();
        path.push(&space, Some(space.clone()), choice.clone());
        path.next();

        let mut d = 5;
        let mut stats = Statistics::default();
        let mut node = path
            .recompute(&mut d, 2, &mut stats, None)
            .unwrap()
            .unwrap();
        assert_eq!(0, d);
        assert_eq!(0, stats.clones);
        assert_eq!(SpaceStatus::Branch, node.status());
        assert_eq!(Some(1), node.value(xs[0]));
        // the edge is marked for reuse: the next push replaces it
        let choice = node.choice().unwrap();
        path.push(&node, None, choice);
        assert_eq!(1, path.len());
    }

    #[test]
    fn stealing_takes_the_shallowest_alternative() {
        let (space, xs) = root();
        let mut path = Path::new(0, false);
        dive(&mut path, space);

        let mut stats = Statistics::default();
        let mut stolen = path.steal(&mut stats).unwrap();
        assert_eq!(SpaceStatus::Branch, stolen.status());
        assert_eq!(Some(1), stolen.value(xs[0]));
        // the first edge has no work left
        let mut again = path.steal(&mut stats).unwrap();
        again.status();
        assert_eq!(Some(0), again.value(xs[0]));
        assert_eq!(Some(1), again.value(xs[1]));
    }

    #[test]
    fn nogoods_describe_the_explored_alternatives() {
        let (space, xs) = root();
        let mut path = Path::new(128, true);
        dive(&mut path, space);
        // x3 = 0 has been explored, x3 = 1 is being explored
        path.next();
        let nogoods = path.nogoods();
        assert_eq!(1, nogoods.len());
        assert_eq!(
            vec![
                Literal::new(xs[0], Relation::Eq, 0),
                Literal::new(xs[1], Relation::Eq, 0),
                Literal::new(xs[2], Relation::Eq, 0),
                Literal::new(xs[3], Relation::Eq, 0),
            ],
            nogoods[0]
        );
        assert_eq!(4, path.decisions().unwrap().len());
    }

    #[test]
    fn nogoods_stop_at_the_depth_limit() {
        let (space, _) = root();
        let mut path = Path::new(2, true);
        dive(&mut path, space);
        path.next();
        assert!(path.nogoods().is_empty());
    }

    #[test]
    fn bab_recomputation_constrains_old_clones() {
        let mut space = Space::new();
        let x = space.int_var(0, 9).unwrap();
        space.minimize(x);
        space
            .branch(&[x], VarSelection::InputOrder, ValSelection::SplitMin)
            .unwrap();
        let mut path = Path::new(0, false);
        let leaf = dive(&mut path, space);
        assert_eq!(Some(0), leaf.value(x));
        path.next();

        // an incumbent found elsewhere
        let mut best = leaf.clone();
        best.remove_below(x, 0).unwrap();
        let mut inc = Incumbent {
            best: Some(best),
            mark: path.len(),
        };
        let mut d = 0;
        let mut stats = Statistics::default();
        let node = path
            .recompute(&mut d, 100, &mut stats, Some(&mut inc))
            .unwrap();
        // every node is worse than x == 0
        assert!(node.map_or(true, |mut n| n.status() == SpaceStatus::Failed));
        assert_eq!(0, inc.mark);
    }
}
