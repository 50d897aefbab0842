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

//! This module provides the restart based search. It runs a depth first (or
//! branch and bound) engine until the number of failures reaches a cutoff.
//! Then it posts the no-goods describing what has been explored in the
//! root space and starts over from a fresh copy of that root.

use log::info;
use rustc_hash::FxHashSet;

use crate::{
    post_nogood,
    search::sequential::{Engine, Step},
    Literal, SearchError, SearchOptions, SequenceGenerator, Space, SpaceStatus, Statistics, Stop,
    StopReason,
};

/// Stops the engine either when the user says so, or when the cutoff has
/// been reached
struct CutoffStop<'a> {
    user: &'a mut dyn Stop,
    /// What the previous engines did
    before: Statistics,
    limit: u64,
    reached: bool,
}

impl Stop for CutoffStop<'_> {
    fn should_stop(&mut self, stats: &Statistics) -> Option<StopReason> {
        let mut total = self.before;
        total.accumulate(stats);
        if let Some(reason) = self.user.should_stop(&total) {
            return Some(reason);
        }
        if stats.fails >= self.limit {
            self.reached = true;
            return Some(StopReason::Fail);
        }
        None
    }
}

pub(crate) struct Restart {
    /// The root space. It accumulates the no-goods.
    master: Space,
    engine: Engine,
    options: SearchOptions,
    bab: bool,
    cutoff: Box<dyn SequenceGenerator>,
    limit: u64,
    /// The incumbent of a branch and bound
    last: Option<Space>,
    /// The no-goods posted so far
    seen: FxHashSet<Vec<Literal>>,
    /// What the previous engines did
    totals: Statistics,
    /// A branch and bound restarts after each solution
    pending: bool,
}

impl Restart {
    pub fn new(master: Space, options: &SearchOptions, bab: bool) -> Result<Self, SearchError> {
        let Some(cutoff) = options.restart else {
            return Err(SearchError::InvalidOptions(
                "a restart based search needs a cutoff".to_string(),
            ));
        };
        let mut cutoff = cutoff.sequence();
        let limit = cutoff.next();
        let engine = Engine::new(master.clone(), options, bab, options.nogoods_limit);
        Ok(Self {
            master,
            engine,
            options: options.clone(),
            bab,
            cutoff,
            limit,
            last: None,
            seen: FxHashSet::default(),
            totals: Statistics {
                clones: 1,
                ..Statistics::default()
            },
            pending: false,
        })
    }

    pub fn statistics(&self) -> Statistics {
        let mut stats = self.totals;
        stats.accumulate(&self.engine.statistics());
        stats
    }

    pub fn next(&mut self, stop: &mut dyn Stop) -> Step {
        loop {
            if self.pending {
                self.pending = false;
                match self.restart() {
                    Ok(true) => {}
                    Ok(false) => return Step::Exhausted,
                    Err(error) => return Step::Aborted(error),
                }
            }
            let mut guard = CutoffStop {
                user: &mut *stop,
                before: self.totals,
                limit: self.limit,
                reached: false,
            };
            match self.engine.next(&mut guard) {
                Step::Solution(space) => {
                    if self.bab {
                        self.last = Some(space.clone());
                        self.pending = true;
                    }
                    return Step::Solution(space);
                }
                Step::Stopped(_) if guard.reached => {
                    self.limit = self.cutoff.next();
                    match self.restart() {
                        Ok(true) => {}
                        Ok(false) => return Step::Exhausted,
                        Err(error) => return Step::Aborted(error),
                    }
                }
                step => return step,
            }
        }
    }

    /// Posts the no-goods in the master and restarts from a copy of it.
    /// Returns false when the master turns out to be failed.
    fn restart(&mut self) -> Result<bool, SearchError> {
        let idle = Engine::idle(&self.options, self.bab, self.options.nogoods_limit, true);
        let mut engine = std::mem::replace(&mut self.engine, idle);
        self.totals.accumulate(&engine.statistics());
        self.totals.restarts += 1;

        let mut nogoods = engine.nogoods();
        nogoods.extend(engine.take_decisions());
        let mut posted = 0;
        for nogood in nogoods {
            if self.seen.insert(nogood.clone()) {
                post_nogood(&mut self.master, &nogood)?;
                posted += 1;
            }
        }
        self.totals.nogoods += posted;
        if let Some(best) = self.last.as_ref() {
            let _ = self.master.constrain(best);
        }
        info!(
            "restart {} with a cutoff of {} ({posted} new no-goods)",
            self.totals.restarts, self.limit
        );

        let before = self.master.propagations();
        let status = self.master.status();
        self.totals.propagations += self.master.propagations() - before;
        if status == SpaceStatus::Failed {
            return match self.master.exhausted() {
                Some(exhausted) => Err(exhausted.into()),
                None => Ok(false),
            };
        }
        self.totals.clones += 1;
        self.engine = Engine::new(
            self.master.clone(),
            &self.options,
            self.bab,
            self.options.nogoods_limit,
        );
        Ok(true)
    }
}
