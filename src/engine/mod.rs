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

//! The engine module comprises everything a search node is made of: the
//! variables and their views, the propagators with their advisors, the
//! propagation queue, the branchers and the space which owns them all.

mod brancher;
mod core;
mod domain;
mod propagator;
mod queue;
mod space;
mod view;

pub use self::brancher::*;
pub use self::core::*;
pub use self::domain::*;
pub use self::propagator::*;
pub use self::queue::*;
pub use self::space::*;
pub use self::view::*;

pub(crate) use self::core::{ceil_div, floor_div};
pub(crate) use self::domain::normalize;
pub(crate) use self::propagator::{AdvisorTable, PropagatorState, PropagatorTable};
