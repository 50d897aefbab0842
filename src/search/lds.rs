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

//! This module provides the limited discrepancy search. Each iteration is a
//! probe which only explores the paths of the tree that deviate from the
//! leftmost alternative a given number of times (the discrepancies).

use log::debug;

use crate::{
    search::sequential::Step, Choice, ResourceExhausted, SearchOptions, Space, SpaceStatus,
    Statistics, Stop,
};

/// A node of the probe stack: the remaining alternatives are tried from
/// `alt` down to 0
#[derive(Debug)]
struct Node {
    space: Space,
    choice: Choice,
    alt: usize,
}

/// Explores the paths with exactly `d` discrepancies
#[derive(Debug, Default)]
struct Probe {
    ds: Vec<Node>,
    cur: Option<Space>,
    /// The discrepancies left
    d: usize,
    /// True as long as no alternative had to be left out
    exhausted: bool,
    stats: Statistics,
}

impl Probe {
    fn reset(&mut self, root: Option<Space>, d: usize) {
        self.ds.clear();
        self.cur = root;
        self.d = d;
        self.exhausted = true;
    }
    fn status(&mut self, space: &mut Space) -> Result<SpaceStatus, ResourceExhausted> {
        self.stats.nodes += 1;
        let before = space.propagations();
        let status = space.status();
        self.stats.propagations += space.propagations() - before;
        match space.exhausted() {
            Some(exhausted) => Err(exhausted),
            None => Ok(status),
        }
    }
    fn commit(&mut self, space: &mut Space, choice: &Choice, alt: usize) {
        // a failure shows at the next status
        let _ = space.commit(choice, alt);
        self.stats.commits += 1;
    }

    fn next(&mut self, stop: &mut dyn Stop) -> Result<Step, ResourceExhausted> {
        loop {
            if self.cur.is_none() {
                // backtrack
                if self.ds.is_empty() {
                    return Ok(Step::Exhausted);
                }
                if let Some(reason) = stop.should_stop(&self.stats) {
                    return Ok(Step::Stopped(reason));
                }
                let Some(top) = self.ds.last_mut() else {
                    return Ok(Step::Exhausted);
                };
                let alt = top.alt;
                let (mut space, choice) = if alt == 0 {
                    match self.ds.pop() {
                        Some(node) => (node.space, node.choice),
                        None => return Ok(Step::Exhausted),
                    }
                } else {
                    top.alt -= 1;
                    self.stats.clones += 1;
                    (top.space.clone(), top.choice.clone())
                };
                self.commit(&mut space, &choice, alt);
                self.d += 1;
                self.cur = Some(space);
            }
            let Some(mut space) = self.cur.take() else {
                continue;
            };

            if self.d == 0 {
                // no discrepancy left: leftmost descent
                let mut status = self.status(&mut space)?;
                while status == SpaceStatus::Branch {
                    if let Some(reason) = stop.should_stop(&self.stats) {
                        self.cur = Some(space);
                        return Ok(Step::Stopped(reason));
                    }
                    let Some(choice) = space.choice() else {
                        break;
                    };
                    if choice.alternatives() > 1 {
                        self.exhausted = false;
                    }
                    self.commit(&mut space, &choice, 0);
                    status = self.status(&mut space)?;
                }
                if status == SpaceStatus::Failed {
                    self.stats.fails += 1;
                    continue;
                }
                return Ok(Step::Solution(space));
            }

            match self.status(&mut space)? {
                SpaceStatus::Failed => self.stats.fails += 1,
                // found with fewer discrepancies already
                SpaceStatus::Solved => {}
                SpaceStatus::Branch => {
                    let Some(choice) = space.choice() else {
                        continue;
                    };
                    let alts = choice.alternatives();
                    if alts > 1 {
                        if self.d < alts - 1 {
                            self.exhausted = false;
                        }
                        let d_a = self.d.min(alts - 1);
                        self.stats.clones += 1;
                        self.ds.push(Node {
                            space: space.clone(),
                            choice: choice.clone(),
                            alt: d_a - 1,
                        });
                        self.stats.depth = self.stats.depth.max(self.ds.len());
                        self.commit(&mut space, &choice, d_a);
                        self.d -= d_a;
                    } else {
                        self.commit(&mut space, &choice, 0);
                    }
                    self.cur = Some(space);
                }
            }
        }
    }
}

/// The limited discrepancy search engine
#[derive(Debug)]
pub(crate) struct Lds {
    probe: Probe,
    /// A clone of the root for the next iterations
    root: Option<Space>,
    /// The discrepancies of the current iteration
    d: usize,
    d_l: usize,
}

impl Lds {
    pub fn new(mut root: Space, options: &SearchOptions) -> Self {
        let mut probe = Probe::default();
        let d_l = options.discrepancy_limit;
        let before = root.propagations();
        let status = root.status();
        probe.stats.propagations += root.propagations() - before;
        let mut lds = if status == SpaceStatus::Failed {
            probe.stats.fails += 1;
            probe.reset(None, 0);
            Self {
                probe,
                root: None,
                d: 0,
                d_l,
            }
        } else {
            let copy = (d_l > 0).then(|| root.clone());
            probe.reset(Some(root), 0);
            Self {
                probe,
                root: copy,
                d: 0,
                d_l,
            }
        };
        if lds.root.is_some() {
            lds.probe.stats.clones += 1;
        }
        debug!("lds engine created (discrepancy limit: {d_l})");
        lds
    }
    pub fn statistics(&self) -> Statistics {
        self.probe.stats
    }
    pub fn next(&mut self, stop: &mut dyn Stop) -> Step {
        loop {
            match self.probe.next(stop) {
                Err(exhausted) => return Step::Aborted(exhausted.into()),
                Ok(Step::Exhausted) => {}
                Ok(step) => return step,
            }
            self.d += 1;
            if self.d > self.d_l || self.probe.exhausted || self.root.is_none() {
                return Step::Exhausted;
            }
            debug!("lds iteration with {} discrepancies", self.d);
            let root = if self.d == self.d_l {
                self.root.take()
            } else {
                self.probe.stats.clones += 1;
                self.root.clone()
            };
            self.probe.reset(root, self.d);
        }
    }
}
