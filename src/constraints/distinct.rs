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

//! This module provides the implementation of the value consistent distinct
//! (all different) constraint. The propagator does not subscribe to its
//! views: it gets an advisor per view and only looks at the views that were
//! assigned since it last ran.

use rustc_hash::FxHashMap;

use crate::prelude::*;

/// This constraint enforces that all views take pairwise different values
#[derive(Debug, Clone)]
pub struct Distinct {
    views: Vec<View>,
    /// The position of the view each live advisor watches
    advisors: FxHashMap<AdvisorId, usize>,
    /// The positions of the views assigned since the last execution
    pending: Vec<usize>,
    /// The views whose value has already been queued for removal
    seen: Vec<bool>,
}

impl Distinct {
    /// Creates a new instance of the propagator
    pub fn new(views: Vec<View>) -> Self {
        Self {
            seen: vec![false; views.len()],
            views,
            advisors: FxHashMap::default(),
            pending: vec![],
        }
    }
}

impl Propagator for Distinct {
    fn name(&self) -> &'static str {
        "distinct"
    }
    fn initialise(&mut self, ctx: &mut InitialisationContext<'_>) -> CPResult<()> {
        for (i, x) in self.views.iter().copied().enumerate() {
            if !ctx.knows(x) {
                return Ok(());
            }
            if ctx.is_fixed(x) {
                self.seen[i] = true;
                self.pending.push(i);
            } else {
                let advisor = ctx.advise(x);
                self.advisors.insert(advisor, i);
            }
        }
        Ok(())
    }
    fn advise(&mut self, _ctx: &AdviseContext<'_>, advisor: AdvisorId, delta: &Delta) -> Advice {
        if delta.event != ModEvent::Val {
            return Advice::Ignore;
        }
        match self.advisors.remove(&advisor) {
            Some(i) if !self.seen[i] => {
                self.seen[i] = true;
                self.pending.push(i);
                Advice::Retire { schedule: true }
            }
            // assigned by this very propagator
            _ => Advice::Retire { schedule: false },
        }
    }
    fn propagate(&mut self, ctx: &mut PropagationContext<'_>) -> CPResult<PropagationStatus> {
        while let Some(i) = self.pending.pop() {
            let Some(v) = ctx.value(self.views[i]) else {
                continue;
            };
            for (j, y) in self.views.iter().copied().enumerate() {
                if i == j {
                    continue;
                }
                let was_fixed = ctx.is_fixed(y);
                ctx.remove(y, v)?;
                if !was_fixed && !self.seen[j] && ctx.is_fixed(y) {
                    self.seen[j] = true;
                    self.pending.push(j);
                }
            }
        }
        if self.views.iter().all(|x| ctx.is_fixed(*x)) {
            Ok(PropagationStatus::Subsumed)
        } else {
            Ok(PropagationStatus::Fixpoint)
        }
    }
    fn boxed_clone(&self) -> Box<dyn Propagator> {
        Box::new(self.clone())
    }
}

/// Posts the constraint that all views take different values
pub fn post_distinct(space: &mut Space, views: &[View]) -> Result<(), ModelError> {
    space.post(Box::new(Distinct::new(views.to_vec())))?;
    Ok(())
}
