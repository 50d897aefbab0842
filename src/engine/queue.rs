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

//! The propagation queue: one bucket per cost class, cheapest class first.

use std::collections::VecDeque;

use rand::{rngs::SmallRng, Rng};

use crate::{PropCost, PropagatorId};

#[derive(Debug, Clone, Default)]
pub struct PropagatorQueue {
    buckets: [VecDeque<PropagatorId>; PropCost::LEVELS],
    len: usize,
}

impl PropagatorQueue {
    pub fn push(&mut self, id: PropagatorId, cost: PropCost) {
        self.buckets[cost.index()].push_back(id);
        self.len += 1;
    }
    /// Pops a propagator from the cheapest non empty bucket. Within a bucket,
    /// propagators are served in fifo order unless a random generator is
    /// given.
    pub fn pop(&mut self, rng: Option<&mut SmallRng>) -> Option<PropagatorId> {
        let bucket = self.buckets.iter_mut().find(|b| !b.is_empty())?;
        let popped = match rng {
            None => bucket.pop_front(),
            Some(rng) => {
                let at = rng.gen_range(0..bucket.len());
                bucket.swap_remove_back(at)
            }
        };
        if popped.is_some() {
            self.len -= 1;
        }
        popped
    }
    pub fn len(&self) -> usize {
        self.len
    }
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
    pub fn clear(&mut self) {
        self.buckets.iter_mut().for_each(VecDeque::clear);
        self.len = 0;
    }
}

#[cfg(test)]
mod test_queue {
    use rand::{rngs::SmallRng, SeedableRng};

    use crate::prelude::*;

    fn id(index: usize) -> PropagatorId {
        PropagatorId {
            index,
            generation: 0,
        }
    }

    #[test]
    fn cheapest_first_then_fifo() {
        let mut q = PropagatorQueue::default();
        q.push(id(0), PropCost::Linear);
        q.push(id(1), PropCost::Unary);
        q.push(id(2), PropCost::Crazy);
        q.push(id(3), PropCost::Unary);
        assert_eq!(4, q.len());

        assert_eq!(Some(id(1)), q.pop(None));
        assert_eq!(Some(id(3)), q.pop(None));
        assert_eq!(Some(id(0)), q.pop(None));
        assert_eq!(Some(id(2)), q.pop(None));
        assert_eq!(None, q.pop(None));
        assert!(q.is_empty());
    }

    #[test]
    fn randomized_pop_respects_cost_classes() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut q = PropagatorQueue::default();
        for i in 0..10 {
            q.push(id(i), PropCost::Binary);
        }
        q.push(id(99), PropCost::Unary);

        assert_eq!(Some(id(99)), q.pop(Some(&mut rng)));
        let mut seen = vec![];
        while let Some(x) = q.pop(Some(&mut rng)) {
            seen.push(x.index);
        }
        seen.sort_unstable();
        assert_eq!((0..10).collect::<Vec<_>>(), seen);
    }

    #[test]
    fn clear_empties_all_buckets() {
        let mut q = PropagatorQueue::default();
        q.push(id(0), PropCost::Linear);
        q.push(id(1), PropCost::Unary);
        q.clear();
        assert!(q.is_empty());
        assert_eq!(None, q.pop(None));
    }
}
