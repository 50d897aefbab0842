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

//! This module provides the sequential depth first engine. The same control
//! loop serves the plain depth first search and the branch and bound: the
//! latter merely keeps an incumbent and constrains the nodes it recomputes.

use log::{debug, trace, warn};

use crate::{
    search::path::{Incumbent, Path},
    Literal, SearchError, SearchOptions, Space, SpaceStatus, Statistics, Stop, StopReason,
};

/// What the engine did while it was asked for the next solution
#[derive(Debug)]
pub(crate) enum Step {
    Solution(Space),
    Stopped(StopReason),
    Exhausted,
    Aborted(SearchError),
}

/// What the engine did while it explored one node
#[derive(Debug)]
pub(crate) enum Progress {
    /// The node was failed or branched
    Explored,
    Solution(Space),
    Exhausted,
    Aborted(SearchError),
}

#[derive(Debug)]
pub(crate) struct Engine {
    path: Path,
    /// The node to explore next (None when it must be recomputed)
    cur: Option<Space>,
    /// The distance to the last clone
    d: usize,
    c_d: usize,
    a_d: usize,
    /// Present iff this is a branch and bound
    bab: Option<Incumbent>,
    /// Whether the decisions leading to each solution are remembered
    record: bool,
    decisions: Vec<Vec<Literal>>,
    stats: Statistics,
    aborted: Option<SearchError>,
}

impl Engine {
    /// Creates an engine exploring the tree rooted in `root`. The no-good
    /// depth limit `ngdl` is only meaningful when restarting.
    pub fn new(mut root: Space, options: &SearchOptions, bab: bool, ngdl: usize) -> Self {
        let record = options.restart.is_some();
        let mut engine = Self::idle(options, bab, ngdl, record);
        let before = root.propagations();
        let status = root.status();
        engine.stats.propagations += root.propagations() - before;
        if status == SpaceStatus::Failed {
            engine.stats.fails += 1;
            engine.aborted = root.exhausted().map(SearchError::from);
        } else {
            engine.cur = Some(root);
        }
        debug!(
            "{} engine created (c_d: {}, a_d: {})",
            if bab { "bab" } else { "dfs" },
            engine.c_d,
            engine.a_d
        );
        engine
    }
    /// Creates an engine with nothing to explore
    pub fn idle(options: &SearchOptions, bab: bool, ngdl: usize, record: bool) -> Self {
        Self {
            path: Path::new(ngdl, record),
            cur: None,
            d: 0,
            c_d: options.c_d,
            a_d: options.a_d,
            bab: bab.then(Incumbent::default),
            record,
            decisions: vec![],
            stats: Statistics::default(),
            aborted: None,
        }
    }
    pub fn statistics(&self) -> Statistics {
        self.stats
    }

    /// Explores nodes until a solution is found, the tree is exhausted or
    /// the stop object says so
    pub fn next(&mut self, stop: &mut dyn Stop) -> Step {
        loop {
            if let Some(reason) = stop.should_stop(&self.stats) {
                return Step::Stopped(reason);
            }
            match self.step() {
                Progress::Explored => {}
                Progress::Solution(space) => return Step::Solution(space),
                Progress::Exhausted => return Step::Exhausted,
                Progress::Aborted(error) => return Step::Aborted(error),
            }
        }
    }

    /// Explores exactly one node
    pub fn step(&mut self) -> Progress {
        if let Some(error) = self.aborted.take() {
            return Progress::Aborted(error);
        }
        while self.cur.is_none() {
            if self.path.is_empty() {
                return Progress::Exhausted;
            }
            match self
                .path
                .recompute(&mut self.d, self.a_d, &mut self.stats, self.bab.as_mut())
            {
                Ok(Some(space)) => self.cur = Some(space),
                Ok(None) => {
                    self.path.next();
                }
                Err(exhausted) => return Progress::Aborted(exhausted.into()),
            }
        }
        let Some(mut cur) = self.cur.take() else {
            return Progress::Exhausted;
        };

        self.stats.nodes += 1;
        let before = cur.propagations();
        let status = cur.status();
        self.stats.propagations += cur.propagations() - before;

        match status {
            SpaceStatus::Failed => {
                if let Some(exhausted) = cur.exhausted() {
                    return Progress::Aborted(exhausted.into());
                }
                trace!("failure at depth {}", self.path.len());
                self.stats.fails += 1;
                self.path.next();
                Progress::Explored
            }
            SpaceStatus::Solved => {
                trace!("solution at depth {}", self.path.len());
                if self.record {
                    if let Some(decisions) = self.path.decisions() {
                        self.decisions.push(decisions);
                    }
                }
                self.path.next();
                if let Some(inc) = self.bab.as_mut() {
                    self.stats.clones += 1;
                    inc.best = Some(cur.clone());
                    inc.mark = self.path.len();
                }
                Progress::Solution(cur)
            }
            SpaceStatus::Branch => {
                let Some(choice) = cur.choice() else {
                    warn!("a space to branch on has no choice to offer");
                    self.stats.fails += 1;
                    self.path.next();
                    return Progress::Explored;
                };
                let clone = if self.d == 0 || self.d >= self.c_d {
                    self.d = 1;
                    self.stats.clones += 1;
                    Some(cur.clone())
                } else {
                    self.d += 1;
                    None
                };
                self.path.push(&cur, clone, choice.clone());
                self.stats.depth = self.stats.depth.max(self.path.len());
                // a failure shows at the next status
                let _ = cur.commit(&choice, 0);
                self.stats.commits += 1;
                self.cur = Some(cur);
                Progress::Explored
            }
        }
    }

    /// Tells a branch and bound engine about a (better) solution found
    /// elsewhere
    pub fn better(&mut self, best: &Space) {
        let Some(inc) = self.bab.as_mut() else {
            return;
        };
        self.stats.clones += 1;
        inc.best = Some(best.clone());
        inc.mark = self.path.len();
        if let Some(cur) = self.cur.as_mut() {
            let _ = cur.constrain(best);
        }
    }

    /// Takes the node given away by another engine as the root of the tree
    /// this engine explores
    pub fn adopt(&mut self, mut space: Space) {
        self.path.reset();
        self.path.set_ngdl(0);
        self.d = 0;
        if let Some(inc) = self.bab.as_mut() {
            inc.mark = 0;
            if let Some(best) = inc.best.as_ref() {
                let _ = space.constrain(best);
            }
        }
        self.cur = Some(space);
    }

    /// Gives away some of the work of this engine
    pub fn steal(&mut self) -> Option<Space> {
        self.path.steal(&mut self.stats)
    }

    /// The no-goods describing what has been explored so far
    pub fn nogoods(&self) -> Vec<Vec<Literal>> {
        self.path.nogoods()
    }

    /// The decisions that lead to the solutions found since the last call
    pub fn take_decisions(&mut self) -> Vec<Vec<Literal>> {
        std::mem::take(&mut self.decisions)
    }
}

#[cfg(test)]
mod test_sequential {
    use crate::prelude::*;
    use crate::search::sequential::{Engine, Progress, Step};

    fn queens(n: usize) -> (Space, Vec<View>) {
        let mut space = Space::new();
        let xs = space.int_vars(n, 0, n as i64 - 1).unwrap();
        let up: Vec<View> = xs.iter().enumerate().map(|(i, x)| x.offset(i as i64)).collect();
        let down: Vec<View> = xs.iter().enumerate().map(|(i, x)| x.offset(-(i as i64))).collect();
        post_distinct(&mut space, &xs).unwrap();
        post_distinct(&mut space, &up).unwrap();
        post_distinct(&mut space, &down).unwrap();
        space
            .branch(&xs, VarSelection::FirstFail, ValSelection::Min)
            .unwrap();
        (space, xs)
    }

    fn count(engine: &mut Engine) -> usize {
        let mut stop: Box<dyn Stop> = Box::new(None::<NodeStop>);
        let mut n = 0;
        while let Step::Solution(_) = engine.next(&mut stop) {
            n += 1;
        }
        n
    }

    #[test]
    fn finds_all_the_queens() {
        let (space, _) = queens(6);
        let mut engine = Engine::new(space, &SearchOptions::default(), false, 0);
        assert_eq!(4, count(&mut engine));
        assert!(matches!(engine.step(), Progress::Exhausted));
    }

    #[test]
    fn the_number_of_solutions_does_not_depend_on_recomputation() {
        for c_d in [1, 2, 3, 8, 100] {
            for a_d in [0, 1, 2, 5] {
                let (space, _) = queens(7);
                let options = SearchOptions::default()
                    .with_commit_distance(c_d)
                    .with_adaptive_distance(a_d);
                let mut engine = Engine::new(space, &options, false, 0);
                assert_eq!(40, count(&mut engine), "c_d {c_d} a_d {a_d}");
            }
        }
    }

    #[test]
    fn a_failed_root_is_exhausted_right_away() {
        let mut space = Space::new();
        let x = space.int_var(0, 3).unwrap();
        post_rel_const(&mut space, x, Relation::Gr, 3).unwrap();
        let mut engine = Engine::new(space, &SearchOptions::default(), false, 0);
        assert_eq!(0, count(&mut engine));
        assert_eq!(1, engine.statistics().fails);
        assert_eq!(0, engine.statistics().nodes);
    }

    #[test]
    fn bab_solutions_keep_improving() {
        let (mut space, xs) = queens(6);
        // maximize the column of the first queen
        space.maximize(xs[0]);
        let mut engine = Engine::new(space, &SearchOptions::default(), true, 0);
        let mut stop: Box<dyn Stop> = Box::new(None::<NodeStop>);
        let mut last = None;
        while let Step::Solution(s) = engine.next(&mut stop) {
            let v = s.value(xs[0]).unwrap();
            if let Some(prev) = last {
                assert!(v > prev);
            }
            last = Some(v);
        }
        assert_eq!(Some(4), last);
    }

    #[test]
    fn stealing_splits_the_tree() {
        let (space, _) = queens(6);
        let options = SearchOptions::default();
        let mut victim = Engine::new(space, &options, false, 0);
        // explore a few nodes so that the victim has a path
        for _ in 0..3 {
            victim.step();
        }
        let mut thief = Engine::idle(&options, false, 0, false);
        let stolen = victim.steal().unwrap();
        thief.adopt(stolen);
        assert_eq!(4, count(&mut victim) + count(&mut thief));
    }
}
