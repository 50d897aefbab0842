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

//! The statistics gathered by the search engines

use std::sync::atomic::{AtomicU64, Ordering};

/// What a search has done so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Statistics {
    /// The number of nodes whose status has been computed
    pub nodes: u64,
    /// The number of failed nodes
    pub fails: u64,
    /// The number of propagator executions
    pub propagations: u64,
    /// The maximum length the path of the search has reached
    pub depth: usize,
    /// The number of restarts
    pub restarts: u64,
    /// The number of no-goods posted upon restarts
    pub nogoods: u64,
    /// The number of spaces cloned by the engine
    pub clones: u64,
    /// The number of alternatives committed by the engine
    pub commits: u64,
}

impl Statistics {
    /// Adds the figures of `other` to these ones. The depth is the max of
    /// both depths.
    pub fn accumulate(&mut self, other: &Statistics) {
        self.nodes += other.nodes;
        self.fails += other.fails;
        self.propagations += other.propagations;
        self.depth = self.depth.max(other.depth);
        self.restarts += other.restarts;
        self.nogoods += other.nogoods;
        self.clones += other.clones;
        self.commits += other.commits;
    }
}

impl std::fmt::Display for Statistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "nodes: {} fails: {} propagations: {} depth: {} restarts: {} nogoods: {} clones: {} commits: {}",
            self.nodes,
            self.fails,
            self.propagations,
            self.depth,
            self.restarts,
            self.nogoods,
            self.clones,
            self.commits
        )
    }
}

/// The counters the workers of a parallel search share to evaluate the stop
/// conditions
#[derive(Debug, Default)]
pub(crate) struct SharedCounters {
    nodes: AtomicU64,
    fails: AtomicU64,
}

impl SharedCounters {
    /// Adds the progress a worker made between two snapshots of its stats
    pub fn add(&self, before: &Statistics, after: &Statistics) {
        self.nodes
            .fetch_add(after.nodes - before.nodes, Ordering::Relaxed);
        self.fails
            .fetch_add(after.fails - before.fails, Ordering::Relaxed);
    }
    pub fn snapshot(&self) -> Statistics {
        Statistics {
            nodes: self.nodes.load(Ordering::Relaxed),
            fails: self.fails.load(Ordering::Relaxed),
            ..Statistics::default()
        }
    }
}
