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

//! This module provides the implementation of the space: the search node.
//! A space owns everything a node of the search tree is made of (the
//! variables, the propagators with their advisors, the branchers and the
//! propagation queue). Backtracking never undoes anything in a space: the
//! search engines keep clones of the spaces they might want to come back to
//! and recompute the others by replaying choices.
//!
//! # Note
//! Propagators, advisors and variables refer to one another by index in the
//! arenas of the space. Hence cloning a space is a plain deep copy: two
//! propagators sharing a variable share the copy of that variable as well.

use std::sync::Arc;

use log::{debug, trace, warn};
use rand::{rngs::SmallRng, SeedableRng};

use crate::{
    AdviseContext, Advice, AdvisorId, AdvisorTable, Brancher, BrancherId, CPResult, Choice, Delta,
    DomainReader, DomainStore, Inconsistency, InitialisationContext, IntVarImp, Literal, ModEvent,
    ModelError, Narrowing, PropCond, PropagationContext, PropagationStatus, Propagator,
    PropagatorId, PropagatorQueue, PropagatorState, PropagatorTable, Region, ResourceExhausted,
    Subscription, ValSelection, VarSelection, Variable, View, ViewBrancher,
};

/// The status of a space once propagation has reached its fixpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpaceStatus {
    /// Some propagator failed
    Failed,
    /// No brancher has anything left to decide
    Solved,
    /// The space must be split further
    Branch,
}

/// The order in which propagators of the same cost class are executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PropagationOrder {
    /// First scheduled, first executed
    #[default]
    Fifo,
    /// Pseudo random order, reproducible for a given seed
    Randomized { seed: u64 },
}

/// The hook that constrains a space to be better than a given solution
pub type Constrain = Arc<dyn Fn(&mut Space, &Space) -> CPResult<()> + Send + Sync>;

/// A search node
#[derive(Clone)]
pub struct Space {
    /// The variables of the problem
    vars: Vec<IntVarImp>,
    /// The propagators
    props: PropagatorTable,
    /// The advisors of all propagators
    advisors: AdvisorTable,
    /// The propagators waiting to be executed
    queue: PropagatorQueue,
    /// The modifications the advisors have not been told about yet
    advice: Vec<(AdvisorId, Delta)>,
    /// The branchers in declaration order. A brancher is removed once it has
    /// nothing left to decide.
    branchers: Vec<Option<Box<dyn Brancher>>>,
    /// All branchers before this one are done
    brancher_start: usize,
    /// The branch and bound hook
    constrain: Option<Constrain>,
    failed: bool,
    /// Set when a propagator ran out of scratch memory
    pub(crate) exhausted: Option<ResourceExhausted>,
    commits: u64,
    propagations: u64,
    order: PropagationOrder,
    rng: Option<SmallRng>,
}

impl Default for Space {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Space {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Space")
            .field("variables", &self.vars.len())
            .field("propagators", &self.props.live())
            .field("advisors", &self.advisors.live())
            .field("branchers", &(self.branchers.len() - self.brancher_start))
            .field("failed", &self.failed)
            .field("commits", &self.commits)
            .field("propagations", &self.propagations)
            .finish()
    }
}

impl Space {
    /// Creates an empty space
    pub fn new() -> Self {
        Self {
            vars: vec![],
            props: PropagatorTable::default(),
            advisors: AdvisorTable::default(),
            queue: PropagatorQueue::default(),
            advice: vec![],
            branchers: vec![],
            brancher_start: 0,
            constrain: None,
            failed: false,
            exhausted: None,
            commits: 0,
            propagations: 0,
            order: PropagationOrder::Fifo,
            rng: None,
        }
    }
    /// Creates an empty space using the given propagation order
    pub fn with_order(order: PropagationOrder) -> Self {
        let mut space = Self::new();
        space.set_propagation_order(order);
        space
    }
    /// Changes the order in which propagators of equal cost are executed
    pub fn set_propagation_order(&mut self, order: PropagationOrder) {
        self.order = order;
        self.rng = match order {
            PropagationOrder::Fifo => None,
            PropagationOrder::Randomized { seed } => Some(SmallRng::seed_from_u64(seed)),
        };
    }
    pub fn propagation_order(&self) -> PropagationOrder {
        self.order
    }
    //~~~~~ VARIABLES ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
    /// Creates a new integer variable covering the min..=max range of values
    pub fn int_var(&mut self, min: i64, max: i64) -> Result<View, ModelError> {
        self.vars.push(IntVarImp::new(min, max)?);
        Ok(View::new(Variable(self.vars.len() - 1)))
    }
    /// Creates `n` integer variables covering the min..=max range of values
    pub fn int_vars(&mut self, n: usize, min: i64, max: i64) -> Result<Vec<View>, ModelError> {
        (0..n).map(|_| self.int_var(min, max)).collect()
    }
    /// Creates a new binary 0,1 variable
    pub fn bool_var(&mut self) -> View {
        self.vars.push(IntVarImp::boolean());
        View::new(Variable(self.vars.len() - 1))
    }
    /// The number of variables in this space
    pub fn variables(&self) -> usize {
        self.vars.len()
    }
    pub(crate) fn check_var(&self, var: Variable) -> Result<(), ModelError> {
        if var.index() < self.vars.len() {
            Ok(())
        } else {
            Err(ModelError::UnknownVariable(var.index()))
        }
    }
    //~~~~~ PROPAGATORS ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
    /// Posts a propagator in this space. The propagator is initialised right
    /// away and scheduled for execution. A propagator which detects an
    /// inconsistency upon initialisation fails the space (this is not an
    /// error). Posting in a failed space has no effect.
    pub fn post(&mut self, propagator: Box<dyn Propagator>) -> Result<PropagatorId, ModelError> {
        if self.failed {
            let id = self.props.allocate(propagator.cost());
            self.dispose(id);
            return Ok(id);
        }
        let name = propagator.name();
        let id = self.install(propagator)?;
        trace!("posted {name} as {id:?}");
        Ok(id)
    }
    /// Initialises the propagator and schedules it
    fn install(&mut self, mut propagator: Box<dyn Propagator>) -> Result<PropagatorId, ModelError> {
        let id = self.props.allocate(propagator.cost());
        let (outcome, error) = {
            let mut ctx = InitialisationContext {
                space: self,
                propagator: id,
                error: None,
            };
            let outcome = propagator.initialise(&mut ctx);
            (outcome, ctx.error)
        };
        if let Some(error) = error {
            self.dispose(id);
            return Err(error);
        }
        match outcome {
            Ok(()) => {
                self.props.put(id, propagator);
                self.props.set_state(id, PropagatorState::Idle);
                self.schedule(id);
            }
            Err(Inconsistency) => {
                self.dispose(id);
                self.fail();
            }
        }
        Ok(id)
    }
    pub(crate) fn subscribe(&mut self, id: PropagatorId, var: Variable, cond: PropCond) {
        if self.props.add_subscription(id, var, cond) {
            self.vars[var.index()].subscriptions.push(Subscription {
                propagator: id,
                cond,
            });
        }
    }
    pub(crate) fn create_advisor(&mut self, owner: PropagatorId, view: View) -> AdvisorId {
        let advisor = self.advisors.allocate(owner, view);
        self.props.add_advisor(owner, advisor);
        if let Some(imp) = self.vars.get_mut(view.var().index()) {
            imp.advisors.push(advisor);
        }
        advisor
    }
    /// Schedules an idle propagator
    fn schedule(&mut self, id: PropagatorId) {
        self.props.schedule(&mut self.queue, id);
    }
    /// Disposes a propagator along with its subscriptions and advisors
    fn dispose(&mut self, id: PropagatorId) {
        let Some((subscriptions, advisors)) = self.props.dispose(id) else {
            return;
        };
        for (var, _) in subscriptions {
            self.vars[var.index()]
                .subscriptions
                .retain(|s| s.propagator != id);
        }
        for advisor in advisors {
            if let Some((_, view)) = self.advisors.dispose(advisor) {
                self.vars[view.var().index()]
                    .advisors
                    .retain(|a| *a != advisor);
            }
        }
    }
    /// Disposes one single advisor
    fn retire(&mut self, advisor: AdvisorId) {
        if let Some((owner, view)) = self.advisors.dispose(advisor) {
            self.props.remove_advisor(owner, advisor);
            self.vars[view.var().index()]
                .advisors
                .retain(|a| *a != advisor);
        }
    }
    /// True iff the propagator has not been disposed
    pub fn is_alive(&self, id: PropagatorId) -> bool {
        self.props.is_alive(id)
    }
    /// The number of propagators that have not been disposed
    pub fn propagators(&self) -> usize {
        self.props.live()
    }
    /// The number of advisors that have not been disposed
    pub fn advisors(&self) -> usize {
        self.advisors.live()
    }
    //~~~~~ NARROWING ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
    /// Narrows the domain of a view on behalf of the propagator `current`
    /// (or of the modeler when `current` is None)
    pub(crate) fn narrow_from(
        &mut self,
        view: View,
        op: &Narrowing,
        current: Option<PropagatorId>,
    ) -> CPResult<ModEvent> {
        if self.failed {
            return Err(Inconsistency);
        }
        match view.narrow(&mut self.vars[view.var().index()], op) {
            Err(Inconsistency) => {
                self.fail();
                Err(Inconsistency)
            }
            Ok(delta) => {
                if delta.is_change() {
                    self.notify(view.var(), delta, current);
                }
                Ok(delta.event)
            }
        }
    }
    /// Schedules the subscribers of a modified variable and records the
    /// advice for its advisors. The propagator that caused the modification
    /// is not scheduled, but its advisors are told like any other.
    fn notify(&mut self, var: Variable, delta: Delta, current: Option<PropagatorId>) {
        let Self {
            vars,
            props,
            queue,
            advisors,
            advice,
            ..
        } = self;
        let imp = &vars[var.index()];
        for sub in imp.subscriptions.iter() {
            if Some(sub.propagator) != current && sub.cond.is_triggered_by(delta.event) {
                props.schedule(queue, sub.propagator);
            }
        }
        for advisor in imp.advisors.iter().copied() {
            if advisors.get(advisor).is_some() {
                advice.push((advisor, delta));
            }
        }
    }
    /// Marks the space as failed. A failed space is never propagated again.
    pub fn fail(&mut self) {
        self.failed = true;
        self.queue.clear();
        self.advice.clear();
        self.props.settle();
    }
    /// True iff the space is failed
    pub fn failed(&self) -> bool {
        self.failed
    }
    /// Tells whether the space failed because some propagator could not get
    /// the memory it needed. Such a failure says nothing about the problem.
    pub fn exhausted(&self) -> Option<ResourceExhausted> {
        self.exhausted
    }
    //~~~~~ PROPAGATION ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
    /// Runs the propagators until none of them is scheduled anymore or one of
    /// them fails.
    pub fn propagate(&mut self) -> CPResult<()> {
        if self.failed {
            return Err(Inconsistency);
        }
        self.deliver_advice();
        while let Some(id) = self.queue.pop(self.rng.as_mut()) {
            if self.props.state(id) != Some(PropagatorState::Enqueued) {
                continue;
            }
            let Some(mut propagator) = self.props.take(id) else {
                continue;
            };
            self.props.set_state(id, PropagatorState::Running);
            self.propagations += 1;

            let region = Region::new();
            let outcome = {
                let mut ctx = PropagationContext {
                    space: self,
                    current: id,
                    region: &region,
                };
                propagator.propagate(&mut ctx)
            };

            match outcome {
                Err(Inconsistency) => {
                    self.props.put(id, propagator);
                    self.fail();
                    return Err(Inconsistency);
                }
                Ok(PropagationStatus::Fixpoint) => {
                    self.props.put(id, propagator);
                    self.props.set_state(id, PropagatorState::Idle);
                }
                Ok(PropagationStatus::NotFixpoint) => {
                    self.props.put(id, propagator);
                    self.props.set_state(id, PropagatorState::Idle);
                    self.schedule(id);
                }
                Ok(PropagationStatus::Subsumed) => {
                    trace!("{} subsumed", propagator.name());
                    self.dispose(id);
                }
                Ok(PropagationStatus::Rewrite(replacement)) => {
                    debug!("rewriting {} as {}", propagator.name(), replacement.name());
                    self.dispose(id);
                    if let Err(error) = self.install(replacement) {
                        warn!("could not install a rewritten propagator: {error}");
                        self.fail();
                    }
                }
            }
            if self.failed {
                return Err(Inconsistency);
            }
            self.deliver_advice();
        }
        Ok(())
    }
    /// Tells the advisors about the modifications they have not seen yet
    fn deliver_advice(&mut self) {
        let pending = std::mem::take(&mut self.advice);
        for (advisor, delta) in pending {
            let Some((owner, view)) = self.advisors.get(advisor) else {
                continue;
            };
            let Some(mut propagator) = self.props.take(owner) else {
                continue;
            };
            let advice = {
                let ctx = AdviseContext { space: self };
                propagator.advise(&ctx, advisor, &view.translate(delta))
            };
            self.props.put(owner, propagator);
            match advice {
                Advice::Ignore => {}
                Advice::Schedule => self.schedule(owner),
                Advice::Retire { schedule } => {
                    self.retire(advisor);
                    if schedule {
                        self.schedule(owner);
                    }
                }
            }
        }
    }
    /// The number of propagator executions so far
    pub fn propagations(&self) -> u64 {
        self.propagations
    }
    //~~~~~ BRANCHING ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
    /// Propagates, then tells whether the space is failed, solved or must be
    /// split further.
    pub fn status(&mut self) -> SpaceStatus {
        if self.propagate().is_err() {
            return SpaceStatus::Failed;
        }
        while self.brancher_start < self.branchers.len() {
            let at = self.brancher_start;
            if let Some(mut brancher) = self.branchers[at].take() {
                if brancher.status(self) {
                    self.branchers[at] = Some(brancher);
                    return SpaceStatus::Branch;
                }
            }
            self.brancher_start += 1;
        }
        SpaceStatus::Solved
    }
    /// Returns the description of how the space must be split. This must be
    /// called right after `status()` returned `Branch`.
    pub fn choice(&self) -> Option<Choice> {
        let at = self.brancher_start;
        let brancher = self.branchers.get(at)?.as_ref()?;
        let mut choice = brancher.description(self);
        choice.brancher = BrancherId(at);
        Some(choice)
    }
    /// Commits the alternative `alt` of the given choice. The choice may have
    /// been produced by this space or by any space this one is a clone of.
    pub fn commit(&mut self, choice: &Choice, alt: usize) -> CPResult<()> {
        if self.failed {
            return Err(Inconsistency);
        }
        let at = choice.brancher().0;
        let Some(brancher) = self.branchers.get_mut(at).and_then(Option::take) else {
            warn!("no brancher {at} to commit {choice:?}");
            self.fail();
            return Err(Inconsistency);
        };
        let outcome = brancher.commit(self, choice, alt);
        self.branchers[at] = Some(brancher);
        self.commits += 1;
        if outcome.is_err() {
            self.fail();
        }
        outcome
    }
    /// Expresses the alternative `alt` of the given choice as a literal
    pub fn literal(&self, choice: &Choice, alt: usize) -> Option<Literal> {
        self.branchers
            .get(choice.brancher().0)?
            .as_ref()?
            .literal(choice, alt)
    }
    /// The number of alternatives committed in this space (and in the spaces
    /// it was cloned from)
    pub fn commits(&self) -> u64 {
        self.commits
    }
    /// Branches over the given views
    pub fn branch(
        &mut self,
        views: &[View],
        var_sel: VarSelection,
        val_sel: ValSelection,
    ) -> Result<BrancherId, ModelError> {
        if views.is_empty() {
            return Err(ModelError::EmptyBranching);
        }
        for view in views {
            self.check_var(view.var())?;
        }
        if views.iter().all(|x| self.is_fixed(*x)) {
            warn!("branching over {} views that are all assigned", views.len());
        }
        let brancher = ViewBrancher::new(views.to_vec(), var_sel, val_sel);
        Ok(self.branch_with(Box::new(brancher)))
    }
    /// Installs a custom brancher
    pub fn branch_with(&mut self, brancher: Box<dyn Brancher>) -> BrancherId {
        self.branchers.push(Some(brancher));
        BrancherId(self.branchers.len() - 1)
    }
    //~~~~~ BRANCH AND BOUND ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
    /// Installs the hook which constrains a space to be better than the
    /// incumbent solution
    pub fn set_constrain<F>(&mut self, f: F)
    where
        F: Fn(&mut Space, &Space) -> CPResult<()> + Send + Sync + 'static,
    {
        self.constrain = Some(Arc::new(f));
    }
    /// Better solutions have a smaller value for `objective`
    pub fn minimize(&mut self, objective: View) {
        self.set_constrain(move |space, best| {
            space
                .remove_above(objective, best.min(objective).saturating_sub(1))
                .map(|_| ())
        });
    }
    /// Better solutions have a greater value for `objective`
    pub fn maximize(&mut self, objective: View) {
        self.set_constrain(move |space, best| {
            space
                .remove_below(objective, best.max(objective).saturating_add(1))
                .map(|_| ())
        });
    }
    pub fn has_constrain(&self) -> bool {
        self.constrain.is_some()
    }
    /// Constrains this space to be better than `best`
    pub fn constrain(&mut self, best: &Space) -> CPResult<()> {
        let Some(hook) = self.constrain.clone() else {
            return Ok(());
        };
        let outcome = hook(self, best);
        if outcome.is_err() {
            self.fail();
        }
        outcome
    }
    //~~~~~ CLONING ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
    /// Creates an independent copy of this space
    pub fn try_clone(&self) -> Result<Space, ModelError> {
        if self.failed {
            return Err(ModelError::CloneFailedSpace);
        }
        Ok(self.clone())
    }
}

impl DomainReader for Space {
    fn imp(&self, var: Variable) -> &IntVarImp {
        &self.vars[var.index()]
    }
}

impl DomainStore for Space {
    fn narrow(&mut self, view: View, op: Narrowing) -> CPResult<ModEvent> {
        self.narrow_from(view, &op, None)
    }
}
