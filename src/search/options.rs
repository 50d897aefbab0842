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

//! This module provides the configuration of the searches along with the
//! errors and outcomes they report.

use std::{
    sync::{atomic::AtomicBool, Arc},
    time::Duration,
};

use crate::{
    Combinator, Cutoff, FailStop, Interrupt, ModelError, NodeStop, ResourceExhausted, Stop,
    StopReason, TimeStop,
};

/// The errors that prevent a search from being carried out
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum SearchError {
    #[error("invalid search options: {0}")]
    InvalidOptions(String),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    ResourceExhausted(#[from] ResourceExhausted),
    #[error("a search worker panicked")]
    WorkerPanicked,
}

/// How a search ended
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The whole search tree was explored
    Complete,
    /// Some stop condition was met
    Stopped(StopReason),
    /// The search could not go on
    Aborted(SearchError),
}

/// The parameters of a search
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Stop after that many nodes
    pub node_limit: Option<u64>,
    /// Stop after that many failures
    pub fail_limit: Option<u64>,
    /// Stop after that much time
    pub time_limit: Option<Duration>,
    /// The number of workers of a parallel search
    pub threads: usize,
    /// The commit distance: a clone is stored every `c_d` commits
    pub c_d: usize,
    /// The adaptive recomputation distance
    pub a_d: usize,
    /// The maximum number of discrepancies of a limited discrepancy search
    pub discrepancy_limit: usize,
    /// Restart the search whenever the cutoff is reached
    pub restart: Option<Cutoff>,
    /// No-goods are only extracted from that many levels of the search path
    pub nogoods_limit: usize,
    /// Raising this flag stops the search
    pub interrupt: Option<Arc<AtomicBool>>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            node_limit: None,
            fail_limit: None,
            time_limit: None,
            threads: 1,
            c_d: 8,
            a_d: 2,
            discrepancy_limit: 3,
            restart: None,
            nogoods_limit: 128,
            interrupt: None,
        }
    }
}

impl SearchOptions {
    pub fn with_node_limit(mut self, limit: u64) -> Self {
        self.node_limit = Some(limit);
        self
    }
    pub fn with_fail_limit(mut self, limit: u64) -> Self {
        self.fail_limit = Some(limit);
        self
    }
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }
    pub fn with_commit_distance(mut self, c_d: usize) -> Self {
        self.c_d = c_d;
        self
    }
    pub fn with_adaptive_distance(mut self, a_d: usize) -> Self {
        self.a_d = a_d;
        self
    }
    pub fn with_discrepancy_limit(mut self, limit: usize) -> Self {
        self.discrepancy_limit = limit;
        self
    }
    pub fn with_restart(mut self, cutoff: Cutoff) -> Self {
        self.restart = Some(cutoff);
        self
    }
    pub fn with_nogoods_limit(mut self, limit: usize) -> Self {
        self.nogoods_limit = limit;
        self
    }
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(flag);
        self
    }

    /// Checks that the options make sense together
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.threads == 0 {
            return Err(SearchError::InvalidOptions(
                "at least one thread is required".to_string(),
            ));
        }
        if self.c_d == 0 {
            return Err(SearchError::InvalidOptions(
                "the commit distance must be positive".to_string(),
            ));
        }
        if let Some(cutoff) = self.restart {
            if self.threads > 1 {
                return Err(SearchError::InvalidOptions(
                    "restarts cannot be combined with a parallel search".to_string(),
                ));
            }
            cutoff.check().map_err(SearchError::InvalidOptions)?;
        }
        Ok(())
    }

    /// Creates the stop object corresponding to the limits of these options
    pub fn stop(&self) -> Box<dyn Stop> {
        Box::new(Combinator::new(
            Combinator::new(self.node_limit.map(NodeStop::new), self.fail_limit.map(FailStop::new)),
            Combinator::new(
                self.time_limit.map(TimeStop::starting_now),
                self.interrupt.clone().map(Interrupt::new),
            ),
        ))
    }
}

#[cfg(test)]
mod test_options {
    use crate::prelude::*;

    #[test]
    fn defaults() {
        let options = SearchOptions::default();
        assert_eq!(8, options.c_d);
        assert_eq!(2, options.a_d);
        assert_eq!(1, options.threads);
        assert_eq!(128, options.nogoods_limit);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn restarts_are_sequential() {
        let options = SearchOptions::default()
            .with_threads(4)
            .with_restart(Cutoff::Luby(10));
        assert!(matches!(
            options.validate(),
            Err(SearchError::InvalidOptions(_))
        ));
    }

    #[test]
    fn zero_commit_distance_is_invalid() {
        let options = SearchOptions::default().with_commit_distance(0);
        assert!(matches!(
            options.validate(),
            Err(SearchError::InvalidOptions(_))
        ));
    }

    #[test]
    fn zero_threads_is_invalid() {
        let options = SearchOptions::default().with_threads(0);
        assert!(options.validate().is_err());
    }

    #[test]
    fn the_stop_object_follows_the_limits() {
        let mut stop = SearchOptions::default().with_node_limit(5).stop();
        let mut stats = Statistics::default();
        assert_eq!(None, stop.should_stop(&stats));
        stats.nodes = 6;
        assert_eq!(Some(StopReason::Node), stop.should_stop(&stats));

        let mut unlimited = SearchOptions::default().stop();
        assert_eq!(None, unlimited.should_stop(&stats));
    }
}
