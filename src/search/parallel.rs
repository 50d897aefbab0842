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

//! This module provides the parallel search. Each worker thread runs its own
//! sequential engine. A worker that runs out of work steals the shallowest
//! untried alternative of another worker. In a branch and bound, the workers
//! share the best solution found so far.

use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        mpsc::{channel, Receiver, Sender},
        Arc, Condvar, Mutex, MutexGuard, PoisonError,
    },
    thread::{Builder, JoinHandle},
    time::Duration,
};

use log::{debug, error, info};

use crate::{
    search::{
        sequential::{Engine, Progress, Step},
        statistics::SharedCounters,
    },
    SearchError, SearchOptions, Space, SpaceStatus, Statistics, Stop, StopReason,
};

/// How long an idle worker waits before it tries to steal again
const IDLE_WAIT: Duration = Duration::from_millis(1);

/// Why the workers have stopped
#[derive(Debug, Clone)]
enum Finish {
    Exhausted,
    Stopped(StopReason),
    Aborted(SearchError),
}

/// Locks a mutex even when some worker panicked while holding it
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// What the workers share
struct Shared {
    workers: Vec<Mutex<Engine>>,
    /// The number of workers without any work
    idle: Mutex<usize>,
    wake: Condvar,
    done: AtomicBool,
    finish: Mutex<Option<Finish>>,
    bab: bool,
    /// The incumbent of the branch and bound
    best: Mutex<Option<Space>>,
    /// Incremented each time the incumbent improves
    generation: AtomicU64,
    counters: SharedCounters,
}

impl Shared {
    fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Stops all workers. The first reason to finish wins.
    fn finish(&self, why: Finish) {
        {
            let mut finish = lock(&self.finish);
            if finish.is_none() {
                debug!("workers finishing: {why:?}");
                *finish = Some(why);
            }
        }
        self.done.store(true, Ordering::Release);
        self.wake.notify_all();
    }

    /// Makes `solution` the new incumbent and hands it over, unless it is
    /// no better than the current incumbent. The incumbent stays locked
    /// until the solution has been sent. Returns false when nobody listens
    /// anymore.
    fn improve(&self, solution: Space, solutions: &Sender<Space>) -> bool {
        let mut best = lock(&self.best);
        if let Some(incumbent) = best.as_ref() {
            let mut check = solution.clone();
            if check.constrain(incumbent).is_err() || check.status() == SpaceStatus::Failed {
                return true;
            }
        }
        *best = Some(solution.clone());
        self.generation.fetch_add(1, Ordering::AcqRel);
        solutions.send(solution).is_ok()
    }

    /// Lets worker `me` steal work from the others. Returns false when
    /// there is no work left anywhere or when the search is over.
    fn find_work(&self, me: usize) -> bool {
        let n = self.workers.len();
        let mut idle = lock(&self.idle);
        *idle += 1;
        loop {
            if self.is_done() {
                return false;
            }
            for k in 1..n {
                let victim = (me + k) % n;
                let stolen = lock(&self.workers[victim]).steal();
                if let Some(space) = stolen {
                    *idle -= 1;
                    drop(idle);
                    debug!("worker {me} stole work from worker {victim}");
                    lock(&self.workers[me]).adopt(space);
                    return true;
                }
            }
            if *idle == n {
                drop(idle);
                self.finish(Finish::Exhausted);
                return false;
            }
            idle = match self.wake.wait_timeout(idle, IDLE_WAIT) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }

    /// The main loop of worker `me`
    fn work(&self, me: usize, solutions: &Sender<Space>, mut stop: Box<dyn Stop>) {
        let mut generation = 0;
        let mut last = Statistics::default();
        while !self.is_done() {
            let mut engine = lock(&self.workers[me]);
            if self.bab {
                let current = self.generation.load(Ordering::Acquire);
                if current != generation {
                    generation = current;
                    if let Some(best) = lock(&self.best).as_ref() {
                        engine.better(best);
                    }
                }
            }
            let stats = engine.statistics();
            self.counters.add(&last, &stats);
            last = stats;
            if let Some(reason) = stop.should_stop(&self.counters.snapshot()) {
                drop(engine);
                self.finish(Finish::Stopped(reason));
                return;
            }
            match engine.step() {
                Progress::Explored => {}
                Progress::Solution(space) => {
                    drop(engine);
                    let delivered = if self.bab {
                        self.improve(space, solutions)
                    } else {
                        solutions.send(space).is_ok()
                    };
                    if !delivered {
                        self.finish(Finish::Exhausted);
                        return;
                    }
                }
                Progress::Exhausted => {
                    drop(engine);
                    if !self.find_work(me) {
                        return;
                    }
                }
                Progress::Aborted(error) => {
                    drop(engine);
                    self.finish(Finish::Aborted(error));
                    return;
                }
            }
        }
    }
}

pub(crate) struct Parallel {
    shared: Arc<Shared>,
    handles: Vec<JoinHandle<()>>,
    solutions: Receiver<Space>,
}

impl Parallel {
    pub fn new(root: Space, options: &SearchOptions, bab: bool) -> Self {
        let n = options.threads;
        let mut workers = Vec::with_capacity(n);
        workers.push(Mutex::new(Engine::new(root, options, bab, 0)));
        for _ in 1..n {
            workers.push(Mutex::new(Engine::idle(options, bab, 0, false)));
        }
        let shared = Arc::new(Shared {
            workers,
            idle: Mutex::new(0),
            wake: Condvar::new(),
            done: AtomicBool::new(false),
            finish: Mutex::new(None),
            bab,
            best: Mutex::new(None),
            generation: AtomicU64::new(0),
            counters: SharedCounters::default(),
        });

        let (tx, rx) = channel();
        let mut handles = Vec::with_capacity(n);
        for me in 0..n {
            let worker = Arc::clone(&shared);
            let solutions = tx.clone();
            let stop = options.stop();
            let spawned = Builder::new()
                .name(format!("spacecp-worker-{me}"))
                .spawn(move || {
                    let run = catch_unwind(AssertUnwindSafe(|| worker.work(me, &solutions, stop)));
                    if run.is_err() {
                        error!("worker {me} panicked");
                        worker.finish(Finish::Aborted(SearchError::WorkerPanicked));
                    }
                });
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    error!("cannot spawn worker {me}: {e}");
                    shared.finish(Finish::Aborted(SearchError::InvalidOptions(format!(
                        "cannot spawn worker {me}: {e}"
                    ))));
                    break;
                }
            }
        }
        info!("parallel {} search with {n} workers", if bab { "bab" } else { "dfs" });
        Self {
            shared,
            handles,
            solutions: rx,
        }
    }

    pub fn statistics(&self) -> Statistics {
        let mut stats = Statistics::default();
        for worker in self.shared.workers.iter() {
            stats.accumulate(&lock(worker).statistics());
        }
        stats
    }

    pub fn next(&mut self) -> Step {
        match self.solutions.recv() {
            Ok(space) => Step::Solution(space),
            Err(_) => {
                self.join();
                match lock(&self.shared.finish).clone() {
                    Some(Finish::Stopped(reason)) => Step::Stopped(reason),
                    Some(Finish::Aborted(error)) => Step::Aborted(error),
                    Some(Finish::Exhausted) | None => Step::Exhausted,
                }
            }
        }
    }

    fn join(&mut self) {
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                self.shared
                    .finish(Finish::Aborted(SearchError::WorkerPanicked));
            }
        }
    }
}

impl Drop for Parallel {
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            self.shared.finish(Finish::Stopped(StopReason::Interrupt));
            self.join();
        }
    }
}

#[cfg(test)]
mod test_parallel {
    use crate::prelude::*;
    use crate::search::parallel::Parallel;
    use crate::search::sequential::Step;

    fn queens(n: usize) -> (Space, Vec<View>) {
        let mut space = Space::new();
        let xs = space.int_vars(n, 0, n as i64 - 1).unwrap();
        let up: Vec<View> = xs.iter().enumerate().map(|(i, x)| x.offset(i as i64)).collect();
        let down: Vec<View> = xs.iter().enumerate().map(|(i, x)| x.offset(-(i as i64))).collect();
        post_distinct(&mut space, &xs).unwrap();
        post_distinct(&mut space, &up).unwrap();
        post_distinct(&mut space, &down).unwrap();
        space
            .branch(&xs, VarSelection::InputOrder, ValSelection::Min)
            .unwrap();
        (space, xs)
    }

    fn solutions(parallel: &mut Parallel, xs: &[View]) -> (Vec<Vec<i64>>, Step) {
        let mut out = vec![];
        loop {
            match parallel.next() {
                Step::Solution(s) => out.push(xs.iter().map(|x| s.value(*x).unwrap()).collect()),
                step => return (out, step),
            }
        }
    }

    #[test]
    fn four_workers_find_all_solutions_exactly_once() {
        let (space, xs) = queens(7);
        let options = SearchOptions::default().with_threads(4);
        let mut parallel = Parallel::new(space, &options, false);
        let (mut found, end) = solutions(&mut parallel, &xs);
        assert!(matches!(end, Step::Exhausted));
        assert_eq!(40, found.len());
        found.sort();
        found.dedup();
        assert_eq!(40, found.len());
    }

    #[test]
    fn workers_agree_on_the_optimum() {
        let (mut space, xs) = queens(7);
        space.maximize(xs[0]);
        let options = SearchOptions::default().with_threads(3);
        let mut parallel = Parallel::new(space, &options, true);
        let (found, end) = solutions(&mut parallel, &xs);
        assert!(matches!(end, Step::Exhausted));
        for w in found.windows(2) {
            assert!(w[0][0] < w[1][0]);
        }
        assert_eq!(Some(6), found.last().map(|s| s[0]));
    }

    #[test]
    fn many_workers_yield_strictly_improving_solutions() {
        let mut space = Space::new();
        let xs = space.int_vars(12, 0, 9).unwrap();
        let total = space.int_var(0, 108).unwrap();
        let mut views = xs.clone();
        views.push(total);
        let mut coeffs = vec![1; 12];
        coeffs.push(-1);
        post_linear(&mut space, &coeffs, &views, LinearRelation::Eq, 0).unwrap();
        space
            .branch(&xs, VarSelection::InputOrder, ValSelection::Min)
            .unwrap();
        space.maximize(total);

        let options = SearchOptions::default()
            .with_threads(8)
            .with_node_limit(3000);
        let mut parallel = Parallel::new(space, &options, true);
        let (found, _) = solutions(&mut parallel, &[total]);
        assert!(!found.is_empty());
        for w in found.windows(2) {
            assert!(w[0][0] < w[1][0], "{:?} then {:?}", w[0], w[1]);
        }
    }

    #[test]
    fn a_failed_root_leaves_nothing_to_steal() {
        let mut space = Space::new();
        let x = space.int_var(0, 3).unwrap();
        let y = space.int_var(0, 3).unwrap();
        post_rel(&mut space, x, Relation::Le, y).unwrap();
        post_rel(&mut space, y, Relation::Le, x).unwrap();
        space
            .branch(&[x, y], VarSelection::InputOrder, ValSelection::Min)
            .unwrap();
        let options = SearchOptions::default().with_threads(2);
        let mut parallel = Parallel::new(space, &options, false);
        assert!(matches!(parallel.next(), Step::Exhausted));
        assert_eq!(1, parallel.statistics().fails);
    }

    #[test]
    fn the_node_limit_is_shared_by_all_workers() {
        let (space, _) = queens(8);
        let options = SearchOptions::default().with_threads(2).with_node_limit(10);
        let mut parallel = Parallel::new(space, &options, false);
        let end = loop {
            match parallel.next() {
                Step::Solution(_) => {}
                step => break step,
            }
        };
        assert!(matches!(end, Step::Stopped(StopReason::Node)));
    }

    #[test]
    fn dropping_the_search_stops_the_workers() {
        let (space, _) = queens(10);
        let options = SearchOptions::default().with_threads(2);
        let mut parallel = Parallel::new(space, &options, false);
        assert!(matches!(parallel.next(), Step::Solution(_)));
        drop(parallel);
    }
}
