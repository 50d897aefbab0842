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

//! This module provides the implementation of the linear constraints
//! `sum(a_i * x_i) rel c`. Each term is a scaled view, so the propagator
//! itself only ever sums views.

use crate::prelude::*;

/// The relation between the linear sum and the constant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinearRelation {
    /// sum == c
    Eq,
    /// sum <= c
    Lq,
    /// sum >= c
    Gq,
}

/// This is the propagator that gets used to propagate a linear constraint.
///
/// The terms that get assigned are folded into the constant. Then, a lower
/// bound `lo` and an upper bound `hi` on the sum of the remaining terms are
/// computed and every term `t` gets narrowed to:
/// * `t <= c - (lo - min(t))`
/// * `t >= c - (hi - max(t))` (equality only)
///
/// until no bound moves anymore. When only two terms remain, the propagator
/// rewrites itself as a binary relation.
#[derive(Debug, Clone)]
pub struct Linear {
    terms: Vec<View>,
    /// Equality when true, `<=` otherwise
    eq: bool,
    c: i64,
}

impl Linear {
    /// Creates the propagator for `sum(terms) rel c`
    pub fn new(terms: Vec<View>, rel: LinearRelation, c: i64) -> Self {
        match rel {
            LinearRelation::Eq => Self { terms, eq: true, c },
            LinearRelation::Lq => Self { terms, eq: false, c },
            LinearRelation::Gq => Self {
                terms: terms.into_iter().map(View::neg).collect(),
                eq: false,
                c: c.saturating_neg(),
            },
        }
    }
    /// Moves the assigned terms to the constant
    fn fold(&mut self, ctx: &PropagationContext<'_>) {
        let mut k = 0;
        while k < self.terms.len() {
            match ctx.value(self.terms[k]) {
                Some(v) => {
                    self.c = self.c.saturating_sub(v);
                    self.terms.swap_remove(k);
                }
                None => k += 1,
            }
        }
    }
    fn relation(&self) -> Relation {
        if self.eq {
            Relation::Eq
        } else {
            Relation::Lq
        }
    }
}

impl Propagator for Linear {
    fn name(&self) -> &'static str {
        "linear"
    }
    fn cost(&self) -> PropCost {
        match self.terms.len() {
            0 | 1 => PropCost::Unary,
            2 => PropCost::Binary,
            3 => PropCost::Ternary,
            _ => PropCost::Linear,
        }
    }
    fn initialise(&mut self, ctx: &mut InitialisationContext<'_>) -> CPResult<()> {
        for t in self.terms.iter().copied() {
            ctx.subscribe(t, PropCond::Bnd);
        }
        Ok(())
    }
    fn propagate(&mut self, ctx: &mut PropagationContext<'_>) -> CPResult<PropagationStatus> {
        self.fold(ctx);
        let n = self.terms.len();
        match n {
            0 => {
                return if self.relation().holds(0, self.c) {
                    Ok(PropagationStatus::Subsumed)
                } else {
                    Err(Inconsistency)
                };
            }
            1 => {
                Literal::new(self.terms[0], self.relation(), self.c).post(ctx)?;
                return Ok(PropagationStatus::Subsumed);
            }
            2 => {
                // x + y rel c  <=>  x rel c - y
                let (x, y) = (self.terms[0], self.terms[1]);
                let rel = BinaryRel::new(x, self.relation(), y.neg().offset(self.c));
                return Ok(PropagationStatus::Rewrite(Box::new(rel)));
            }
            _ => {}
        }

        let mins = ctx.scratch(n, 0_i64)?;
        let maxs = ctx.scratch(n, 0_i64)?;
        loop {
            let (mut lo, mut hi) = (0_i64, 0_i64);
            for (k, t) in self.terms.iter().copied().enumerate() {
                mins[k] = ctx.min(t);
                maxs[k] = ctx.max(t);
                lo = lo.saturating_add(mins[k]);
                hi = hi.saturating_add(maxs[k]);
            }
            if lo > self.c || (self.eq && hi < self.c) {
                return Err(Inconsistency);
            }
            if !self.eq && hi <= self.c {
                return Ok(PropagationStatus::Subsumed);
            }

            let mut changed = false;
            for (k, t) in self.terms.iter().copied().enumerate() {
                let ub = self.c.saturating_sub(lo.saturating_sub(mins[k]));
                changed |= ctx.remove_above(t, ub)? != ModEvent::None;
                if self.eq {
                    let lb = self.c.saturating_sub(hi.saturating_sub(maxs[k]));
                    changed |= ctx.remove_below(t, lb)? != ModEvent::None;
                }
            }
            if !changed {
                return if lo == hi {
                    Ok(PropagationStatus::Subsumed)
                } else {
                    Ok(PropagationStatus::Fixpoint)
                };
            }
        }
    }
    fn boxed_clone(&self) -> Box<dyn Propagator> {
        Box::new(self.clone())
    }
}

/// Posts `sum(coeffs[i] * views[i]) rel c`. Terms with a zero coefficient
/// are dropped.
pub fn post_linear(
    space: &mut Space,
    coeffs: &[i64],
    views: &[View],
    rel: LinearRelation,
    c: i64,
) -> Result<(), ModelError> {
    if coeffs.len() != views.len() {
        return Err(ModelError::ArityMismatch {
            expected: coeffs.len(),
            found: views.len(),
        });
    }
    let mut terms = Vec::with_capacity(views.len());
    for (a, x) in coeffs.iter().copied().zip(views.iter().copied()) {
        if a != 0 {
            terms.push(x.scale(a)?);
        }
    }
    space.post(Box::new(Linear::new(terms, rel, c)))?;
    Ok(())
}
