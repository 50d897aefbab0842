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

//! This module provides the implementation of the binary relations between
//! two views (and between a view and a constant).

use crate::prelude::*;

/// This constraint enforces that `x rel y` holds. The ordering relations are
/// propagated on the bounds, the disequality waits for one of the two views
/// to be assigned.
#[derive(Debug, Clone, Copy)]
pub struct BinaryRel {
    x: View,
    rel: Relation,
    y: View,
}

impl BinaryRel {
    /// Creates the propagator. `x >= y` and `x > y` are stored as `y <= x`
    /// and `y < x`.
    pub fn new(x: View, rel: Relation, y: View) -> Self {
        match rel {
            Relation::Gq | Relation::Gr => Self {
                x: y,
                rel: rel.flip(),
                y: x,
            },
            _ => Self { x, rel, y },
        }
    }

    /// x <= y + slack
    fn bounds(&self, ctx: &mut PropagationContext<'_>, slack: i64) -> CPResult<bool> {
        let ub = ctx.max(self.y).saturating_add(slack);
        let a = ctx.remove_above(self.x, ub)?;
        let lb = ctx.min(self.x).saturating_sub(slack);
        let b = ctx.remove_below(self.y, lb)?;
        Ok(a != ModEvent::None || b != ModEvent::None)
    }

    /// Both views watch the same variable v: `a*v + b rel c*v + d` is the
    /// unary constraint `(a - c)*v rel d - b`.
    fn same_variable(&self, ctx: &mut PropagationContext<'_>) -> CPResult<PropagationStatus> {
        let (x, y) = (self.x, self.y);
        let coeff = x.coeff().saturating_sub(y.coeff());
        let rhs = y.constant().saturating_sub(x.constant());
        if coeff == 0 {
            return if self.rel.holds(0, rhs) {
                Ok(PropagationStatus::Subsumed)
            } else {
                Err(Inconsistency)
            };
        }
        let v = View::new(x.var()).scale(coeff).map_err(|_| Inconsistency)?;
        Literal::new(v, self.rel, rhs).post(ctx)?;
        Ok(PropagationStatus::Subsumed)
    }
}

impl Propagator for BinaryRel {
    fn name(&self) -> &'static str {
        "rel"
    }
    fn cost(&self) -> PropCost {
        PropCost::Binary
    }
    fn initialise(&mut self, ctx: &mut InitialisationContext<'_>) -> CPResult<()> {
        let cond = match self.rel {
            Relation::Nq => PropCond::Val,
            _ => PropCond::Bnd,
        };
        ctx.subscribe(self.x, cond);
        ctx.subscribe(self.y, cond);
        Ok(())
    }
    fn propagate(&mut self, ctx: &mut PropagationContext<'_>) -> CPResult<PropagationStatus> {
        let (x, y) = (self.x, self.y);
        if x.var() == y.var() {
            return self.same_variable(ctx);
        }
        match self.rel {
            Relation::Lq | Relation::Gq => {
                self.bounds(ctx, 0)?;
                if ctx.max(x) <= ctx.min(y) {
                    return Ok(PropagationStatus::Subsumed);
                }
            }
            Relation::Le | Relation::Gr => {
                self.bounds(ctx, -1)?;
                if ctx.max(x) < ctx.min(y) {
                    return Ok(PropagationStatus::Subsumed);
                }
            }
            Relation::Eq => {
                // both directions, until neither bound moves
                loop {
                    let a = self.bounds(ctx, 0)?;
                    let b = Self { x: y, rel: self.rel, y: x }.bounds(ctx, 0)?;
                    if !a && !b {
                        break;
                    }
                }
                if ctx.is_fixed(x) && ctx.is_fixed(y) {
                    return Ok(PropagationStatus::Subsumed);
                }
            }
            Relation::Nq => {
                if let Some(v) = ctx.value(x) {
                    ctx.remove(y, v)?;
                    return Ok(PropagationStatus::Subsumed);
                }
                if let Some(v) = ctx.value(y) {
                    ctx.remove(x, v)?;
                    return Ok(PropagationStatus::Subsumed);
                }
                if ctx.max(x) < ctx.min(y) || ctx.max(y) < ctx.min(x) {
                    return Ok(PropagationStatus::Subsumed);
                }
            }
        }
        Ok(PropagationStatus::Fixpoint)
    }
    fn boxed_clone(&self) -> Box<dyn Propagator> {
        Box::new(*self)
    }
}

/// Posts `x rel y`
pub fn post_rel(space: &mut Space, x: View, rel: Relation, y: View) -> Result<PropagatorId, ModelError> {
    space.post(Box::new(BinaryRel::new(x, rel, y)))
}

/// Posts `x rel c`. This narrows the domain of x right away and posts no
/// propagator. When the domain is wiped out, the space fails.
pub fn post_rel_const(space: &mut Space, x: View, rel: Relation, c: i64) -> Result<(), ModelError> {
    space.check_var(x.var())?;
    if space.failed() {
        return Ok(());
    }
    // a wipe out fails the space, which is the expected outcome
    let _ = Literal::new(x, rel, c).post(space);
    Ok(())
}

#[cfg(test)]
mod test_rel {
    use crate::prelude::*;

    #[test]
    fn lq_prunes_both_bounds() {
        let mut space = Space::new();
        let x = space.int_var(3, 10).unwrap();
        let y = space.int_var(0, 7).unwrap();
        post_rel(&mut space, x, Relation::Lq, y).unwrap();
        assert!(space.propagate().is_ok());
        assert_eq!((3, 7), (space.min(x), space.max(x)));
        assert_eq!((3, 7), (space.min(y), space.max(y)));
    }

    #[test]
    fn views_of_one_variable_are_decided_in_one_run() {
        let mut space = Space::new();
        let x = space.int_var(0, 1_000_000).unwrap();
        post_rel(&mut space, x, Relation::Eq, x.offset(1)).unwrap();
        assert_eq!(Err(Inconsistency), space.propagate());
        assert_eq!(1, space.propagations());

        let mut space = Space::new();
        let x = space.int_var(0, 10).unwrap();
        post_rel(&mut space, x, Relation::Lq, x.offset(1)).unwrap();
        assert!(space.propagate().is_ok());
        assert_eq!(0, space.propagators());
        assert_eq!((0, 10), (space.min(x), space.max(x)));

        // 2x = x + 3
        let mut space = Space::new();
        let x = space.int_var(0, 10).unwrap();
        post_rel(&mut space, x.scale(2).unwrap(), Relation::Eq, x.offset(3)).unwrap();
        assert!(space.propagate().is_ok());
        assert_eq!(Some(3), space.value(x));
        assert_eq!(0, space.propagators());
    }

    #[test]
    fn gr_is_le_with_swapped_views() {
        let mut space = Space::new();
        let x = space.int_var(0, 10).unwrap();
        let y = space.int_var(0, 10).unwrap();
        post_rel(&mut space, x, Relation::Gr, y).unwrap();
        assert!(space.propagate().is_ok());
        assert_eq!(1, space.min(x));
        assert_eq!(9, space.max(y));
    }

    #[test]
    fn eq_works_on_views() {
        let mut space = Space::new();
        let x = space.int_var(0, 10).unwrap();
        let y = space.int_var(0, 10).unwrap();
        // x == 2y + 1
        post_rel(&mut space, x, Relation::Eq, y.scale(2).unwrap().offset(1)).unwrap();
        assert!(space.propagate().is_ok());
        assert_eq!((1, 9), (space.min(x), space.max(x)));
        assert_eq!((0, 4), (space.min(y), space.max(y)));

        space.fix(y, 3).unwrap();
        assert!(space.propagate().is_ok());
        assert_eq!(Some(7), space.value(x));
        assert_eq!(0, space.propagators());
    }

    #[test]
    fn nq_waits_for_an_assignment() {
        let mut space = Space::new();
        let x = space.int_var(0, 10).unwrap();
        let y = space.int_var(0, 10).unwrap();
        post_rel(&mut space, x, Relation::Nq, y).unwrap();
        assert!(space.propagate().is_ok());
        assert_eq!(11, space.size(y));

        space.fix(x, 6).unwrap();
        assert!(space.propagate().is_ok());
        assert!(!space.contains(y, 6));
        assert_eq!(10, space.size(y));
    }

    #[test]
    fn nq_fails_on_equal_values() {
        let mut space = Space::new();
        let x = space.int_var(0, 10).unwrap();
        let y = space.int_var(0, 10).unwrap();
        post_rel(&mut space, x, Relation::Nq, y).unwrap();
        space.fix(x, 2).unwrap();
        space.fix(y, 2).unwrap();
        assert_eq!(Err(Inconsistency), space.propagate());
    }

    #[test]
    fn rel_const_narrows_right_away() {
        let mut space = Space::new();
        let x = space.int_var(0, 10).unwrap();
        post_rel_const(&mut space, x, Relation::Le, 4).unwrap();
        post_rel_const(&mut space, x, Relation::Nq, 0).unwrap();
        assert_eq!(0, space.propagators());
        assert_eq!(vec![(1, 3)], space.ranges(x));
    }
}
