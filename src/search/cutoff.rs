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

//! The cutoff sequences which tell a restart based search how many failures
//! it may encounter before it restarts.

/// An infinite sequence of cutoff values
pub trait SequenceGenerator: Send {
    /// Returns the next value of the sequence
    fn next(&mut self) -> u64;
}

/// The kinds of cutoff sequences
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cutoff {
    /// s, s, s, ...
    Constant(u64),
    /// s, 2s, 3s, ...
    Linear(u64),
    /// s times the Luby sequence: s, s, 2s, s, s, 2s, 4s, ...
    Luby(u64),
    /// base, base * factor, base * factor^2, ...
    Geometric { base: u64, factor: f64 },
}

impl Cutoff {
    /// Creates a generator for this sequence
    pub fn sequence(&self) -> Box<dyn SequenceGenerator> {
        match *self {
            Cutoff::Constant(scale) => Box::new(ConstantSequence { scale }),
            Cutoff::Linear(scale) => Box::new(LinearSequence { scale, n: 0 }),
            Cutoff::Luby(scale) => Box::new(LubySequence::new(scale)),
            Cutoff::Geometric { base, factor } => Box::new(GeometricSequence {
                current: base as f64,
                factor,
            }),
        }
    }
    /// Tells why the sequence is not usable (a null cutoff would restart
    /// forever)
    pub fn check(&self) -> Result<(), String> {
        match *self {
            Cutoff::Constant(0) | Cutoff::Linear(0) | Cutoff::Luby(0) => {
                Err(format!("{self:?}: the scale of a cutoff must be positive"))
            }
            Cutoff::Geometric { base, factor } if base == 0 || !(factor >= 1.0) => Err(format!(
                "{self:?}: a geometric cutoff needs a positive base and a factor >= 1"
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ConstantSequence {
    scale: u64,
}
impl SequenceGenerator for ConstantSequence {
    fn next(&mut self) -> u64 {
        self.scale
    }
}

#[derive(Debug, Clone, Copy)]
struct LinearSequence {
    scale: u64,
    n: u64,
}
impl SequenceGenerator for LinearSequence {
    fn next(&mut self) -> u64 {
        self.n += 1;
        self.scale.saturating_mul(self.n)
    }
}

/// Next values are computed in constant time with Knuth's 'reluctant
/// doubling' formula
#[derive(Debug, Clone, Copy)]
struct LubySequence {
    u: u64,
    v: u64,
    scale: u64,
}
impl LubySequence {
    fn new(scale: u64) -> Self {
        Self { u: 1, v: 1, scale }
    }
}
impl SequenceGenerator for LubySequence {
    fn next(&mut self) -> u64 {
        let next = self.v;
        if self.u & self.u.wrapping_neg() == self.v {
            self.u += 1;
            self.v = 1;
        } else {
            self.v *= 2;
        }
        next.saturating_mul(self.scale)
    }
}

#[derive(Debug, Clone, Copy)]
struct GeometricSequence {
    current: f64,
    factor: f64,
}
impl SequenceGenerator for GeometricSequence {
    fn next(&mut self) -> u64 {
        let next = self.current;
        self.current *= self.factor;
        // the cast saturates
        next.round() as u64
    }
}

#[cfg(test)]
mod test_cutoff {
    use crate::prelude::*;

    fn first(cutoff: Cutoff, n: usize) -> Vec<u64> {
        let mut seq = cutoff.sequence();
        (0..n).map(|_| seq.next()).collect()
    }

    fn luby_recursively(i: u64) -> u64 {
        let k = (i + 1).ilog2();
        if (i + 1).is_power_of_two() {
            1 << (k - 1)
        } else {
            luby_recursively(i + 1 - (1 << k))
        }
    }

    #[test]
    fn luby_base_1() {
        assert_eq!(
            vec![1, 1, 2, 1, 1, 2, 4, 1, 1, 2, 1, 1, 2, 4, 8, 1, 1, 2],
            first(Cutoff::Luby(1), 18)
        );
    }

    #[test]
    fn luby_base_50_long() {
        let mut seq = Cutoff::Luby(50).sequence();
        for i in 1..10_000 {
            assert_eq!(50 * luby_recursively(i), seq.next());
        }
    }

    #[test]
    fn constant_and_linear() {
        assert_eq!(vec![7, 7, 7], first(Cutoff::Constant(7), 3));
        assert_eq!(vec![5, 10, 15, 20], first(Cutoff::Linear(5), 4));
    }

    #[test]
    fn geometric() {
        assert_eq!(
            vec![10, 15, 23, 34],
            first(
                Cutoff::Geometric {
                    base: 10,
                    factor: 1.5
                },
                4
            )
        );
    }

    #[test]
    fn null_cutoffs_are_rejected() {
        assert!(Cutoff::Luby(0).check().is_err());
        assert!(Cutoff::Geometric {
            base: 10,
            factor: 0.5
        }
        .check()
        .is_err());
        assert!(Cutoff::Geometric {
            base: 10,
            factor: f64::NAN
        }
        .check()
        .is_err());
        assert!(Cutoff::Linear(1).check().is_ok());
    }
}
