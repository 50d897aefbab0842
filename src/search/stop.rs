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

//! A stop object is polled by the search engines at each node. It tells
//! when the search must give up, even though it has not explored the whole
//! tree.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use crate::Statistics;

/// Why a search was stopped before it could complete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// The node limit was exceeded
    Node,
    /// The fail limit was exceeded
    Fail,
    /// The time limit was exceeded
    Time,
    /// The search was interrupted from the outside
    Interrupt,
}

/// The central trait of this module: a condition which is checked between
/// two nodes of the search
pub trait Stop: Send {
    /// Returns the reason to stop when the search must stop, None otherwise
    fn should_stop(&mut self, stats: &Statistics) -> Option<StopReason>;
}

impl<T: Stop> Stop for Option<T> {
    fn should_stop(&mut self, stats: &Statistics) -> Option<StopReason> {
        self.as_mut().and_then(|stop| stop.should_stop(stats))
    }
}

impl Stop for Box<dyn Stop> {
    fn should_stop(&mut self, stats: &Statistics) -> Option<StopReason> {
        self.as_mut().should_stop(stats)
    }
}

/// Stops when more than `limit` nodes have been explored
#[derive(Debug, Clone, Copy)]
pub struct NodeStop {
    limit: u64,
}
impl NodeStop {
    pub fn new(limit: u64) -> Self {
        Self { limit }
    }
}
impl Stop for NodeStop {
    fn should_stop(&mut self, stats: &Statistics) -> Option<StopReason> {
        (stats.nodes > self.limit).then_some(StopReason::Node)
    }
}

/// Stops when more than `limit` failures have been encountered
#[derive(Debug, Clone, Copy)]
pub struct FailStop {
    limit: u64,
}
impl FailStop {
    pub fn new(limit: u64) -> Self {
        Self { limit }
    }
}
impl Stop for FailStop {
    fn should_stop(&mut self, stats: &Statistics) -> Option<StopReason> {
        (stats.fails > self.limit).then_some(StopReason::Fail)
    }
}

/// Stops when the time budget is exhausted
#[derive(Debug, Clone, Copy)]
pub struct TimeStop {
    /// The point in time from which to measure the budget
    started_at: Instant,
    budget: Duration,
}
impl TimeStop {
    /// Gives the search a time budget, starting now
    pub fn starting_now(budget: Duration) -> Self {
        Self {
            started_at: Instant::now(),
            budget,
        }
    }
}
impl Stop for TimeStop {
    fn should_stop(&mut self, _: &Statistics) -> Option<StopReason> {
        (self.started_at.elapsed() >= self.budget).then_some(StopReason::Time)
    }
}

/// Stops as soon as the flag is raised (e.g. from another thread)
#[derive(Debug, Clone)]
pub struct Interrupt {
    flag: Arc<AtomicBool>,
}
impl Interrupt {
    pub fn new(flag: Arc<AtomicBool>) -> Self {
        Self { flag }
    }
}
impl Stop for Interrupt {
    fn should_stop(&mut self, _: &Statistics) -> Option<StopReason> {
        self.flag
            .load(Ordering::Relaxed)
            .then_some(StopReason::Interrupt)
    }
}

/// Stops when one of the two given stop objects says so
#[derive(Debug, Clone, Copy)]
pub struct Combinator<A, B> {
    a: A,
    b: B,
}
impl<A, B> Combinator<A, B> {
    pub fn new(a: A, b: B) -> Self {
        Self { a, b }
    }
}
impl<A: Stop, B: Stop> Stop for Combinator<A, B> {
    fn should_stop(&mut self, stats: &Statistics) -> Option<StopReason> {
        self.a
            .should_stop(stats)
            .or_else(|| self.b.should_stop(stats))
    }
}

#[cfg(test)]
mod test_stop {
    use std::{
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
        time::Duration,
    };

    use crate::prelude::*;

    fn stats(nodes: u64, fails: u64) -> Statistics {
        Statistics {
            nodes,
            fails,
            ..Statistics::default()
        }
    }

    #[test]
    fn node_stop_triggers_beyond_the_limit() {
        let mut stop = NodeStop::new(10);
        assert_eq!(None, stop.should_stop(&stats(10, 0)));
        assert_eq!(Some(StopReason::Node), stop.should_stop(&stats(11, 0)));
    }

    #[test]
    fn fail_stop_triggers_beyond_the_limit() {
        let mut stop = FailStop::new(0);
        assert_eq!(None, stop.should_stop(&stats(10, 0)));
        assert_eq!(Some(StopReason::Fail), stop.should_stop(&stats(10, 1)));
    }

    #[test]
    fn an_empty_time_budget_is_exhausted_right_away() {
        let mut stop = TimeStop::starting_now(Duration::ZERO);
        assert_eq!(Some(StopReason::Time), stop.should_stop(&stats(0, 0)));
        let mut stop = TimeStop::starting_now(Duration::from_secs(3600));
        assert_eq!(None, stop.should_stop(&stats(0, 0)));
    }

    #[test]
    fn interrupt_follows_the_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let mut stop = Interrupt::new(flag.clone());
        assert_eq!(None, stop.should_stop(&stats(0, 0)));
        flag.store(true, Ordering::Relaxed);
        assert_eq!(Some(StopReason::Interrupt), stop.should_stop(&stats(0, 0)));
    }

    #[test]
    fn combinator_reports_the_first_reason() {
        let mut stop = Combinator::new(NodeStop::new(1), FailStop::new(1));
        assert_eq!(None, stop.should_stop(&stats(1, 1)));
        assert_eq!(Some(StopReason::Fail), stop.should_stop(&stats(0, 2)));
        assert_eq!(Some(StopReason::Node), stop.should_stop(&stats(2, 2)));
    }

    #[test]
    fn none_never_stops() {
        let mut stop: Option<NodeStop> = None;
        assert_eq!(None, stop.should_stop(&stats(u64::MAX, u64::MAX)));
    }
}
