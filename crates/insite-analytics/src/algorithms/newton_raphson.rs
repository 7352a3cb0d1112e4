// ABOUTME: Newton-Raphson scalar root finder with degenerate-derivative and iteration guards
// ABOUTME: Returns None instead of failing when the iteration cannot make progress
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Serialize};

use insite_core::constants::solver::{DEFAULT_TOLERANCE, MAX_ITERATIONS};

/// Solver settings
///
/// Iterates `x[n+1] = x[n] - f(x[n]) / f'(x[n])` until two successive
/// estimates differ by at most `tolerance`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NewtonRaphson {
    /// Convergence threshold, also the smallest usable `|f'(x)|`
    pub tolerance: f64,
    /// Upper bound on iterations
    pub max_iterations: usize,
}

impl Default for NewtonRaphson {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: MAX_ITERATIONS,
        }
    }
}

/// A converged root
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    /// Root estimate
    pub root: f64,
    /// Iterations used
    pub iterations: usize,
}

impl NewtonRaphson {
    /// Solver with a custom tolerance and the default iteration bound
    #[must_use]
    pub const fn with_tolerance(tolerance: f64) -> Self {
        Self {
            tolerance,
            max_iterations: MAX_ITERATIONS,
        }
    }

    /// Find a root of `f` starting from `x0`.
    ///
    /// Returns `None` when `|f'(x)| <= tolerance` at any step, when a value
    /// becomes non-finite, or when the iteration bound is reached.
    pub fn solve<F, D>(&self, x0: f64, f: F, df: D) -> Option<Solution>
    where
        F: Fn(f64) -> f64,
        D: Fn(f64) -> f64,
    {
        let mut x = x0;
        for iteration in 1..=self.max_iterations {
            let fx = f(x);
            let slope = df(x);
            if !fx.is_finite() || !slope.is_finite() || slope.abs() <= self.tolerance {
                return None;
            }
            let next = x - fx / slope;
            if !next.is_finite() {
                return None;
            }
            if (next - x).abs() <= self.tolerance {
                return Some(Solution {
                    root: next,
                    iterations: iteration,
                });
            }
            x = next;
        }
        None
    }
}

/// Solve with the default iteration bound and the given tolerance
pub fn solve<F, D>(x0: f64, f: F, df: D, tolerance: f64) -> Option<f64>
where
    F: Fn(f64) -> f64,
    D: Fn(f64) -> f64,
{
    NewtonRaphson::with_tolerance(tolerance)
        .solve(x0, f, df)
        .map(|solution| solution.root)
}
