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

//! This module provides the search engines exploring the tree of choices
//! of a [`Space`]. All of them are driven through a [`Search`], which is an
//! iterator over the solutions of the problem.

mod cutoff;
mod lds;
mod options;
mod parallel;
mod path;
mod restart;
mod sequential;
mod statistics;
mod stop;

pub use cutoff::*;
pub use options::*;
pub use statistics::Statistics;
pub use stop::*;

use log::{info, warn};

use crate::Space;

use self::{
    lds::Lds,
    parallel::Parallel,
    restart::Restart,
    sequential::{Engine, Step},
};

/// The engine actually carrying out a search
enum Inner {
    Sequential(Engine),
    Lds(Lds),
    Restart(Restart),
    Parallel(Parallel),
}

/// A search over the solutions of some space. Each solution is yielded
/// exactly once; when the iterator is over, `outcome` tells why.
///
/// # Example
/// ```
/// use spacecp::prelude::*;
///
/// let mut space = Space::new();
/// let x = space.int_var(0, 9).unwrap();
/// let y = space.int_var(0, 9).unwrap();
/// post_linear(&mut space, &[1, 1], &[x, y], LinearRelation::Eq, 9).unwrap();
/// space.branch(&[x, y], VarSelection::InputOrder, ValSelection::Max).unwrap();
/// space.minimize(y);
///
/// let mut search = Search::bab(space, SearchOptions::default()).unwrap();
/// let best = search.by_ref().last().unwrap();
/// assert_eq!(Some(0), best.value(y));
/// assert_eq!(Some(&Outcome::Complete), search.outcome());
/// ```
pub struct Search {
    inner: Inner,
    stop: Box<dyn Stop>,
    outcome: Option<Outcome>,
}

impl Search {
    /// Enumerates all solutions of `root` in depth first order
    pub fn dfs(root: Space, options: SearchOptions) -> Result<Self, SearchError> {
        Self::create(root, options, false)
    }
    /// Enumerates better and better solutions of `root` (in the sense of
    /// its constrain hook). The last one is optimal when the search
    /// completes.
    pub fn bab(root: Space, options: SearchOptions) -> Result<Self, SearchError> {
        if !root.has_constrain() {
            warn!("branch and bound over a space without constrain hook");
        }
        Self::create(root, options, true)
    }
    /// Enumerates the solutions of `root` by increasing number of
    /// discrepancies, up to the discrepancy limit of the options
    pub fn lds(root: Space, options: SearchOptions) -> Result<Self, SearchError> {
        options.validate()?;
        if options.threads > 1 {
            return Err(SearchError::InvalidOptions(
                "limited discrepancy search is sequential".to_string(),
            ));
        }
        if options.restart.is_some() {
            return Err(SearchError::InvalidOptions(
                "limited discrepancy search cannot restart".to_string(),
            ));
        }
        Ok(Self {
            inner: Inner::Lds(Lds::new(root, &options)),
            stop: options.stop(),
            outcome: None,
        })
    }

    fn create(root: Space, options: SearchOptions, bab: bool) -> Result<Self, SearchError> {
        options.validate()?;
        let inner = if options.threads > 1 {
            Inner::Parallel(Parallel::new(root, &options, bab))
        } else if options.restart.is_some() {
            Inner::Restart(Restart::new(root, &options, bab)?)
        } else {
            Inner::Sequential(Engine::new(root, &options, bab, 0))
        };
        Ok(Self {
            inner,
            stop: options.stop(),
            outcome: None,
        })
    }

    /// What the search has done so far
    pub fn statistics(&self) -> Statistics {
        match &self.inner {
            Inner::Sequential(engine) => engine.statistics(),
            Inner::Lds(lds) => lds.statistics(),
            Inner::Restart(restart) => restart.statistics(),
            Inner::Parallel(parallel) => parallel.statistics(),
        }
    }
    /// Why the search is over (None while it goes on)
    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }
}

impl Iterator for Search {
    type Item = Space;

    fn next(&mut self) -> Option<Space> {
        if self.outcome.is_some() {
            return None;
        }
        let stop = &mut *self.stop;
        let step = match &mut self.inner {
            Inner::Sequential(engine) => engine.next(stop),
            Inner::Lds(lds) => lds.next(stop),
            Inner::Restart(restart) => restart.next(stop),
            Inner::Parallel(parallel) => parallel.next(),
        };
        let outcome = match step {
            Step::Solution(space) => return Some(space),
            Step::Exhausted => Outcome::Complete,
            Step::Stopped(reason) => Outcome::Stopped(reason),
            Step::Aborted(error) => Outcome::Aborted(error),
        };
        info!("search over: {outcome:?} ({})", self.statistics());
        self.outcome = Some(outcome);
        None
    }
}
