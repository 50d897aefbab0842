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

//! This module provides the definition of the traits and structures related
//! to the constraint propagation: the propagator protocol, the advisors and
//! the facets through which a propagator reads and narrows the domains.

use crate::{
    CPResult, Delta, Inconsistency, IntVarImp, ModEvent, Narrowing, PropCond, PropCost, Region,
    Space, Variable, View,
};

/// An identifier to a propagator posted in some space. The generation lets
/// the space detect identifiers which outlived their propagator.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropagatorId {
    pub(crate) index: usize,
    pub(crate) generation: u32,
}

/// An identifier to an advisor
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AdvisorId {
    pub(crate) index: usize,
    pub(crate) generation: u32,
}

/// What a propagator tells the space after it has been executed
pub enum PropagationStatus {
    /// The propagator is at fixpoint. It will only run again when one of its
    /// subscriptions (or advisors) asks for it.
    Fixpoint,
    /// The propagator might be able to prune more: run it again
    NotFixpoint,
    /// The propagator will never prune anything again: dispose it
    Subsumed,
    /// The propagator must be replaced by the given one
    Rewrite(Box<dyn Propagator>),
}

impl std::fmt::Debug for PropagationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropagationStatus::Fixpoint => write!(f, "Fixpoint"),
            PropagationStatus::NotFixpoint => write!(f, "NotFixpoint"),
            PropagationStatus::Subsumed => write!(f, "Subsumed"),
            PropagationStatus::Rewrite(p) => write!(f, "Rewrite({})", p.name()),
        }
    }
}

/// What an advisor decides upon being told about a domain modification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Advice {
    /// Nothing to do
    Ignore,
    /// The owner of the advisor must be scheduled
    Schedule,
    /// The advisor is no longer needed (the owner is scheduled if asked)
    Retire { schedule: bool },
}

/// The propagator is the portion of the code where the magic actually happens.
/// A propagator is called by the space during the fixpoint computation. It
/// enforces a certain level of consistency on the domain of the variables it
/// works on.
///
/// Propagators live in their space and get copied along with it, which is
/// why they must know how to clone themselves.
pub trait Propagator: Send {
    /// A short name used when logging
    fn name(&self) -> &'static str {
        "propagator"
    }
    /// The cost class of this propagator. It may change over time (e.g. when
    /// the number of unassigned views decreases).
    fn cost(&self) -> PropCost {
        PropCost::Linear
    }
    /// Runs once when the propagator is posted. This is where the propagator
    /// subscribes to its views and creates its advisors.
    fn initialise(&mut self, _ctx: &mut InitialisationContext<'_>) -> CPResult<()> {
        Ok(())
    }
    /// Actually runs the custom propagation algorithm
    fn propagate(&mut self, ctx: &mut PropagationContext<'_>) -> CPResult<PropagationStatus>;
    /// Tells the propagator that the view of one of its advisors was modified
    fn advise(&mut self, _ctx: &AdviseContext<'_>, _advisor: AdvisorId, _delta: &Delta) -> Advice {
        Advice::Schedule
    }
    /// Creates an independent copy of this propagator
    fn boxed_clone(&self) -> Box<dyn Propagator>;
}

impl Clone for Box<dyn Propagator> {
    fn clone(&self) -> Self {
        self.boxed_clone()
    }
}

/// Any closure accepting a propagation context can be a propagator. (This is
/// mere convenience, not required to get something useable). Such a
/// propagator has no subscription of its own: it runs once when posted and
/// again whenever it says it is not at fixpoint.
impl<F> Propagator for F
where
    F: FnMut(&mut PropagationContext<'_>) -> CPResult<PropagationStatus> + Clone + Send + 'static,
{
    fn name(&self) -> &'static str {
        "closure"
    }
    fn propagate(&mut self, ctx: &mut PropagationContext<'_>) -> CPResult<PropagationStatus> {
        self(ctx)
    }
    fn boxed_clone(&self) -> Box<dyn Propagator> {
        Box::new(self.clone())
    }
}

//~~~~~ DOMAIN FACETS ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~

/// A domain reader gives read access to the domain of views
pub trait DomainReader {
    /// Returns the implementation of the given variable
    fn imp(&self, var: Variable) -> &IntVarImp;

    /// Returns the minimum value of the doman of this view
    fn min(&self, view: View) -> i64 {
        view.lower(self.imp(view.var()))
    }
    /// Returns the maximum value of the doman of this view
    fn max(&self, view: View) -> i64 {
        view.upper(self.imp(view.var()))
    }
    /// Returns the size of the domain of this view
    fn size(&self, view: View) -> u64 {
        view.size(self.imp(view.var()))
    }
    /// Returns true iff the domain of the target `view` contains the specified `value`
    fn contains(&self, view: View, value: i64) -> bool {
        view.contains(self.imp(view.var()), value)
    }
    /// Returns true iff the value of the target view is fixed/imposed
    fn is_fixed(&self, view: View) -> bool {
        view.assigned(self.imp(view.var()))
    }
    /// Returns the value of the view when it is fixed
    fn value(&self, view: View) -> Option<i64> {
        view.val(self.imp(view.var()))
    }
    /// Returns the domain of the view as a list of intervals
    fn ranges(&self, view: View) -> Vec<(i64, i64)> {
        view.ranges(self.imp(view.var()))
    }
}

/// A domain store is the entity that gives a hook to propagators (and
/// branchers) for modifying the variables domains. Every operation returns
/// an Inconsistency error when the domain of the view would become empty.
pub trait DomainStore: DomainReader {
    /// Applies the given narrowing to the view
    fn narrow(&mut self, view: View, op: Narrowing) -> CPResult<ModEvent>;

    /// Forces the value of this view
    fn fix(&mut self, view: View, value: i64) -> CPResult<ModEvent> {
        self.narrow(view, Narrowing::Eq(value))
    }
    /// Removes the specified value from the domain of the target view
    fn remove(&mut self, view: View, value: i64) -> CPResult<ModEvent> {
        self.narrow(view, Narrowing::Nq(value))
    }
    /// Removes all value less than (<) the specified value from the domain
    /// of the target view
    fn remove_below(&mut self, view: View, value: i64) -> CPResult<ModEvent> {
        self.narrow(view, Narrowing::Gq(value))
    }
    /// Removes all value greater than (>) the specified value from the domain
    /// of the target view
    fn remove_above(&mut self, view: View, value: i64) -> CPResult<ModEvent> {
        self.narrow(view, Narrowing::Lq(value))
    }
    /// Keeps only the values covered by the given intervals
    fn intersect(&mut self, view: View, ranges: &[(i64, i64)]) -> CPResult<ModEvent> {
        self.narrow(view, Narrowing::Inter(ranges.to_vec()))
    }
    /// Removes all the values covered by the given intervals
    fn exclude(&mut self, view: View, ranges: &[(i64, i64)]) -> CPResult<ModEvent> {
        self.narrow(view, Narrowing::Minus(ranges.to_vec()))
    }
}

//~~~~~ CONTEXTS ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~

/// The context of a propagator execution
pub struct PropagationContext<'a> {
    pub(crate) space: &'a mut Space,
    pub(crate) current: PropagatorId,
    pub(crate) region: &'a Region,
}

impl<'a> PropagationContext<'a> {
    /// The identifier of the running propagator
    pub fn propagator(&self) -> PropagatorId {
        self.current
    }
    /// Scratch memory which is reclaimed as soon as the propagator returns
    pub fn region(&self) -> &'a Region {
        self.region
    }
    /// Allocates `n` scratch values in the region. When the memory is
    /// exhausted, the space remembers it and the propagation fails.
    pub fn scratch<T: Copy>(&mut self, n: usize, init: T) -> CPResult<&'a mut [T]> {
        let region: &'a Region = self.region;
        region.try_alloc(n, init).map_err(|exhausted| {
            self.space.exhausted = Some(exhausted);
            Inconsistency
        })
    }
}

impl DomainReader for PropagationContext<'_> {
    fn imp(&self, var: Variable) -> &IntVarImp {
        self.space.imp(var)
    }
}

impl DomainStore for PropagationContext<'_> {
    fn narrow(&mut self, view: View, op: Narrowing) -> CPResult<ModEvent> {
        self.space.narrow_from(view, &op, Some(self.current))
    }
}

/// The context in which a propagator is posted
pub struct InitialisationContext<'a> {
    pub(crate) space: &'a mut Space,
    pub(crate) propagator: PropagatorId,
    pub(crate) error: Option<crate::ModelError>,
}

impl InitialisationContext<'_> {
    /// The identifier of the propagator being posted
    pub fn propagator(&self) -> PropagatorId {
        self.propagator
    }
    /// Tells the space that the propagator must run whenever the domain of
    /// `view` is modified in a way that satisfies `cond`
    pub fn subscribe(&mut self, view: View, cond: PropCond) {
        if self.knows(view) {
            self.space.subscribe(self.propagator, view.var(), cond);
        }
    }
    /// Creates an advisor for `view`. The propagator will be told about each
    /// modification of that view through its `advise` method.
    pub fn advise(&mut self, view: View) -> AdvisorId {
        self.knows(view);
        self.space.create_advisor(self.propagator, view)
    }
    /// Returns false (and reports the error to the poster) when the view is
    /// defined over a variable that does not belong to the space. The domain
    /// of such a view must not be read.
    pub fn knows(&mut self, view: View) -> bool {
        match self.space.check_var(view.var()) {
            Ok(()) => true,
            Err(e) => {
                self.error.get_or_insert(e);
                false
            }
        }
    }
}

impl DomainReader for InitialisationContext<'_> {
    fn imp(&self, var: Variable) -> &IntVarImp {
        self.space.imp(var)
    }
}

impl DomainStore for InitialisationContext<'_> {
    fn narrow(&mut self, view: View, op: Narrowing) -> CPResult<ModEvent> {
        self.space.narrow_from(view, &op, Some(self.propagator))
    }
}

/// The context in which an advisor is run. It gives a read-only access to
/// the domains.
pub struct AdviseContext<'a> {
    pub(crate) space: &'a Space,
}

impl DomainReader for AdviseContext<'_> {
    fn imp(&self, var: Variable) -> &IntVarImp {
        self.space.imp(var)
    }
}

//~~~~~ TABLES ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~

/// The lifecycle state of a propagator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum PropagatorState {
    Idle,
    Enqueued,
    Running,
    Disposed,
}

#[derive(Clone)]
pub(crate) struct PropagatorSlot {
    generation: u32,
    state: PropagatorState,
    cost: PropCost,
    propagator: Option<Box<dyn Propagator>>,
    subscriptions: Vec<(Variable, PropCond)>,
    advisors: Vec<AdvisorId>,
}

/// The arena holding all the propagators of a space
#[derive(Clone, Default)]
pub(crate) struct PropagatorTable {
    slots: Vec<PropagatorSlot>,
    free: Vec<usize>,
}

impl PropagatorTable {
    /// Reserves a slot for a new propagator. The slot remains empty (and in
    /// the running state) until the propagator is put in it.
    pub fn allocate(&mut self, cost: PropCost) -> PropagatorId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.state = PropagatorState::Running;
            slot.cost = cost;
            PropagatorId {
                index,
                generation: slot.generation,
            }
        } else {
            self.slots.push(PropagatorSlot {
                generation: 0,
                state: PropagatorState::Running,
                cost,
                propagator: None,
                subscriptions: vec![],
                advisors: vec![],
            });
            PropagatorId {
                index: self.slots.len() - 1,
                generation: 0,
            }
        }
    }
    fn slot(&self, id: PropagatorId) -> Option<&PropagatorSlot> {
        self.slots
            .get(id.index)
            .filter(|s| s.generation == id.generation && s.state != PropagatorState::Disposed)
    }
    fn slot_mut(&mut self, id: PropagatorId) -> Option<&mut PropagatorSlot> {
        self.slots
            .get_mut(id.index)
            .filter(|s| s.generation == id.generation && s.state != PropagatorState::Disposed)
    }
    /// True iff the id designates a propagator which has not been disposed
    pub fn is_alive(&self, id: PropagatorId) -> bool {
        self.slot(id).is_some()
    }
    pub fn state(&self, id: PropagatorId) -> Option<PropagatorState> {
        self.slot(id).map(|s| s.state)
    }
    pub fn set_state(&mut self, id: PropagatorId, state: PropagatorState) {
        if let Some(slot) = self.slot_mut(id) {
            slot.state = state;
        }
    }
    /// Takes the propagator out of its slot (the slot state is unchanged)
    pub fn take(&mut self, id: PropagatorId) -> Option<Box<dyn Propagator>> {
        self.slot_mut(id).and_then(|s| s.propagator.take())
    }
    /// Puts a propagator (back) in its slot and refreshes its cost
    pub fn put(&mut self, id: PropagatorId, propagator: Box<dyn Propagator>) {
        if let Some(slot) = self.slot_mut(id) {
            slot.cost = propagator.cost();
            slot.propagator = Some(propagator);
        }
    }
    /// Moves an idle propagator to the queue
    pub fn schedule(&mut self, queue: &mut crate::PropagatorQueue, id: PropagatorId) {
        if let Some(slot) = self.slot_mut(id) {
            if slot.state == PropagatorState::Idle {
                slot.state = PropagatorState::Enqueued;
                queue.push(id, slot.cost);
            }
        }
    }
    /// Records a subscription. Returns false if it already existed.
    pub fn add_subscription(&mut self, id: PropagatorId, var: Variable, cond: PropCond) -> bool {
        match self.slot_mut(id) {
            Some(slot) if !slot.subscriptions.contains(&(var, cond)) => {
                slot.subscriptions.push((var, cond));
                true
            }
            _ => false,
        }
    }
    pub fn add_advisor(&mut self, id: PropagatorId, advisor: AdvisorId) {
        if let Some(slot) = self.slot_mut(id) {
            slot.advisors.push(advisor);
        }
    }
    pub fn remove_advisor(&mut self, id: PropagatorId, advisor: AdvisorId) {
        if let Some(slot) = self.slot_mut(id) {
            slot.advisors.retain(|a| *a != advisor);
        }
    }
    /// Disposes the propagator and returns what must be cancelled
    pub fn dispose(&mut self, id: PropagatorId) -> Option<(Vec<(Variable, PropCond)>, Vec<AdvisorId>)> {
        let slot = self.slot_mut(id)?;
        slot.state = PropagatorState::Disposed;
        slot.generation = slot.generation.wrapping_add(1);
        slot.propagator = None;
        let subscriptions = std::mem::take(&mut slot.subscriptions);
        let advisors = std::mem::take(&mut slot.advisors);
        self.free.push(id.index);
        Some((subscriptions, advisors))
    }
    /// The number of propagators which have not been disposed
    pub fn live(&self) -> usize {
        self.slots.len() - self.free.len()
    }
    /// Forgets about all pending executions
    pub fn settle(&mut self) {
        for slot in self.slots.iter_mut() {
            if slot.state == PropagatorState::Enqueued {
                slot.state = PropagatorState::Idle;
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct AdvisorSlot {
    generation: u32,
    owner: PropagatorId,
    view: View,
    live: bool,
}

/// The arena holding all the advisors of a space
#[derive(Debug, Clone, Default)]
pub(crate) struct AdvisorTable {
    slots: Vec<AdvisorSlot>,
    free: Vec<usize>,
}

impl AdvisorTable {
    pub fn allocate(&mut self, owner: PropagatorId, view: View) -> AdvisorId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.owner = owner;
            slot.view = view;
            slot.live = true;
            AdvisorId {
                index,
                generation: slot.generation,
            }
        } else {
            self.slots.push(AdvisorSlot {
                generation: 0,
                owner,
                view,
                live: true,
            });
            AdvisorId {
                index: self.slots.len() - 1,
                generation: 0,
            }
        }
    }
    /// Returns the owner and the view of a live advisor
    pub fn get(&self, id: AdvisorId) -> Option<(PropagatorId, View)> {
        self.slots
            .get(id.index)
            .filter(|s| s.live && s.generation == id.generation)
            .map(|s| (s.owner, s.view))
    }
    /// Destroys the advisor and returns its owner and view
    pub fn dispose(&mut self, id: AdvisorId) -> Option<(PropagatorId, View)> {
        let found = self.get(id)?;
        let slot = &mut self.slots[id.index];
        slot.live = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        Some(found)
    }
    pub fn live(&self) -> usize {
        self.slots.len() - self.free.len()
    }
}
