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

//! This module provides the no-good propagator. A no-good is a conjunction
//! of literals that must not hold. The restart based search derives them
//! from the parts of the search tree that have been explored already.

use crate::prelude::*;

/// This constraint enforces that at least one of its literals is false
#[derive(Debug, Clone)]
pub struct NoGood {
    /// The literals that are not entailed yet
    literals: Vec<Literal>,
}

impl NoGood {
    /// Creates a new instance of the propagator
    pub fn new(literals: Vec<Literal>) -> Self {
        Self { literals }
    }
}

impl Propagator for NoGood {
    fn name(&self) -> &'static str {
        "nogood"
    }
    fn cost(&self) -> PropCost {
        if self.literals.len() <= 1 {
            PropCost::Unary
        } else {
            PropCost::Linear
        }
    }
    fn initialise(&mut self, ctx: &mut InitialisationContext<'_>) -> CPResult<()> {
        for l in self.literals.iter() {
            ctx.subscribe(l.view, PropCond::Dom);
        }
        Ok(())
    }
    fn propagate(&mut self, ctx: &mut PropagationContext<'_>) -> CPResult<PropagationStatus> {
        let mut i = 0;
        while i < self.literals.len() {
            match self.literals[i].status(&*ctx) {
                Some(false) => return Ok(PropagationStatus::Subsumed),
                Some(true) => {
                    self.literals.swap_remove(i);
                }
                None => i += 1,
            }
        }
        match self.literals.as_slice() {
            [] => Err(Inconsistency),
            [last] => {
                last.negate().post(ctx)?;
                Ok(PropagationStatus::Subsumed)
            }
            _ => Ok(PropagationStatus::Fixpoint),
        }
    }
    fn boxed_clone(&self) -> Box<dyn Propagator> {
        Box::new(self.clone())
    }
}

/// Posts the no-good `not(l_1 and ... and l_n)`. An empty no-good cannot be
/// satisfied: it fails the space.
pub fn post_nogood(space: &mut Space, literals: &[Literal]) -> Result<(), ModelError> {
    if literals.is_empty() {
        space.fail();
        return Ok(());
    }
    space.post(Box::new(NoGood::new(literals.to_vec())))?;
    Ok(())
}

#[cfg(test)]
mod test_nogood {
    use crate::prelude::*;

    #[test]
    fn the_last_undecided_literal_gets_negated() {
        let mut space = Space::new();
        let x = space.int_var(0, 5).unwrap();
        let y = space.int_var(0, 5).unwrap();
        let nogood = [
            Literal::new(x, Relation::Eq, 2),
            Literal::new(y, Relation::Lq, 3),
        ];
        post_nogood(&mut space, &nogood).unwrap();
        assert!(space.propagate().is_ok());
        assert_eq!(6, space.size(y));

        space.fix(x, 2).unwrap();
        assert!(space.propagate().is_ok());
        assert_eq!(4, space.min(y));
        assert_eq!(0, space.propagators());
    }

    #[test]
    fn a_disentailed_literal_subsumes() {
        let mut space = Space::new();
        let x = space.int_var(0, 5).unwrap();
        let y = space.int_var(0, 5).unwrap();
        let nogood = [
            Literal::new(x, Relation::Eq, 2),
            Literal::new(y, Relation::Lq, 3),
        ];
        post_nogood(&mut space, &nogood).unwrap();
        space.remove(x, 2).unwrap();
        assert!(space.propagate().is_ok());
        assert_eq!(0, space.propagators());
        assert_eq!(6, space.size(y));
    }

    #[test]
    fn entailed_nogoods_fail() {
        let mut space = Space::new();
        let x = space.int_var(0, 5).unwrap();
        space.fix(x, 1).unwrap();
        post_nogood(&mut space, &[Literal::new(x, Relation::Nq, 3)]).unwrap();
        assert_eq!(Err(Inconsistency), space.propagate());
    }

    #[test]
    fn empty_nogoods_fail() {
        let mut space = Space::new();
        post_nogood(&mut space, &[]).unwrap();
        assert!(space.failed());
    }
}
