// ABOUTME: Numeric algorithms used by the glucose analytics
// ABOUTME: Newton-Raphson root finding and the glucose trajectory model
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Expected glucose curves toward a target
pub mod glucose_model;
/// Scalar root finding
pub mod newton_raphson;

pub use glucose_model::GlucoseTrajectory;
pub use newton_raphson::{solve, NewtonRaphson, Solution};
