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

//! This module provides the implementation of a handful of constraints.
//! These are plain clients of the propagator protocol: the relations between
//! two views, the linear constraints, the distinct constraint (driven by
//! advisors) and the no-goods posted by the restart based search.

mod distinct;
mod linear;
mod nogood;
mod rel;

pub use distinct::*;
pub use linear::*;
pub use nogood::*;
pub use rel::*;
