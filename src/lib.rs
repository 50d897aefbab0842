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

//! # spacecp
//! A constraint propagation and search kernel based on copying and
//! recomputation.
//!
//! The problem to solve is modeled in a [`Space`]: a set of finite domain
//! integer variables and a set of propagators narrowing the domains of these
//! variables. The search engines of the [`search`] module explore the tree
//! of choices produced by the branchers of the space. Instead of undoing
//! the modifications upon backtracking, the engines keep clones of some
//! nodes and recompute the others by replaying the choices that lead to
//! them.
//!
//! # Example
//! ```
//! use spacecp::prelude::*;
//!
//! let mut space = Space::new();
//! let xs = space.int_vars(3, 0, 2).unwrap();
//! post_distinct(&mut space, &xs).unwrap();
//! post_linear(&mut space, &[1, 1, 1], &xs, LinearRelation::Eq, 3).unwrap();
//! space.branch(&xs, VarSelection::InputOrder, ValSelection::Min).unwrap();
//!
//! let search = Search::dfs(space, SearchOptions::default()).unwrap();
//! assert_eq!(6, search.count());
//! ```

mod constraints;
mod engine;
mod memory;
pub mod search;

pub use constraints::*;
pub use engine::*;
pub use memory::*;
pub use search::*;

pub(crate) use engine::{
    ceil_div, floor_div, normalize, AdvisorTable, PropagatorState, PropagatorTable,
};

/// A convenient module to import everything one needs to model and solve a
/// problem
pub mod prelude {
    pub use crate::*;
}
