// ABOUTME: Physiological glucose trajectory curves toward a target value
// ABOUTME: Exponential decay above target, logistic-power recovery below, flat at target
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Serialize};

use insite_core::constants::glucose::{
    DECAY_AMPLITUDE, DECAY_RATE, RECOVERY_MIDPOINT, RECOVERY_POWER, RECOVERY_STEEPNESS,
};

/// Expected glucose curve, selected by comparing the starting value to the target.
///
/// `t` is a model time in minutes. It is not wall-clock time: callers anchor a
/// reading on the curve by solving `f(t0) = start`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "regime", rename_all = "snake_case")]
pub enum GlucoseTrajectory {
    /// Above target, decaying toward it
    ///
    /// Formula: `f(t) = 385.96 * e^(-0.017 t) + target`
    Decay {
        /// Target BG (mg/dL)
        target_bg: f64,
    },

    /// Below target, recovering toward it
    ///
    /// Formula: `f(t) = target / (1 + e^(-0.2 (t - 43.5)^0.8))`
    ///
    /// Undefined for `t < 43.5`, where the fractional power has no real value.
    Recovery {
        /// Target BG (mg/dL)
        target_bg: f64,
    },

    /// Already at target
    ///
    /// Formula: `f(t) = target`
    Flat {
        /// Target BG (mg/dL)
        target_bg: f64,
    },
}

impl GlucoseTrajectory {
    /// Pick the regime for a reading of `start_bg` against `target_bg`
    #[must_use]
    pub fn for_levels(start_bg: f64, target_bg: f64) -> Self {
        if start_bg > target_bg {
            Self::Decay { target_bg }
        } else if start_bg < target_bg {
            Self::Recovery { target_bg }
        } else {
            Self::Flat { target_bg }
        }
    }

    /// Target the curve converges to
    #[must_use]
    pub const fn target_bg(&self) -> f64 {
        match *self {
            Self::Decay { target_bg } | Self::Recovery { target_bg } | Self::Flat { target_bg } => {
                target_bg
            }
        }
    }

    /// Expected glucose at model time `t`
    #[must_use]
    pub fn value(&self, t: f64) -> f64 {
        match *self {
            Self::Decay { target_bg } => DECAY_AMPLITUDE.mul_add((-DECAY_RATE * t).exp(), target_bg),
            Self::Recovery { target_bg } => target_bg / (1.0 + recovery_exponential(t)),
            Self::Flat { target_bg } => target_bg,
        }
    }

    /// Slope of the curve at model time `t`
    #[must_use]
    pub fn derivative(&self, t: f64) -> f64 {
        match *self {
            Self::Decay { .. } => -DECAY_RATE * DECAY_AMPLITUDE * (-DECAY_RATE * t).exp(),
            Self::Recovery { target_bg } => {
                let e = recovery_exponential(t);
                let shifted = t - RECOVERY_MIDPOINT;
                let inner =
                    -RECOVERY_STEEPNESS * RECOVERY_POWER * shifted.powf(RECOVERY_POWER - 1.0);
                -target_bg * e * inner / (1.0 + e).powi(2)
            }
            Self::Flat { .. } => 0.0,
        }
    }
}

fn recovery_exponential(t: f64) -> f64 {
    (-RECOVERY_STEEPNESS * (t - RECOVERY_MIDPOINT).powf(RECOVERY_POWER)).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regime_selection() {
        assert!(matches!(
            GlucoseTrajectory::for_levels(180.0, 110.0),
            GlucoseTrajectory::Decay { .. }
        ));
        assert!(matches!(
            GlucoseTrajectory::for_levels(70.0, 110.0),
            GlucoseTrajectory::Recovery { .. }
        ));
        assert!(matches!(
            GlucoseTrajectory::for_levels(110.0, 110.0),
            GlucoseTrajectory::Flat { .. }
        ));
    }

    #[test]
    fn test_decay_starts_above_target_and_falls() {
        let curve = GlucoseTrajectory::for_levels(200.0, 110.0);
        assert!((curve.value(0.0) - 495.96).abs() < 1e-9);
        assert!(curve.value(60.0) < curve.value(30.0));
        assert!(curve.value(10_000.0) - 110.0 < 1e-6);
        assert!(curve.derivative(0.0) < 0.0);
    }

    #[test]
    fn test_decay_derivative_matches_finite_difference() {
        let curve = GlucoseTrajectory::for_levels(200.0, 110.0);
        let h = 1e-5;
        let numeric = (curve.value(50.0 + h) - curve.value(50.0 - h)) / (2.0 * h);
        assert!((numeric - curve.derivative(50.0)).abs() < 1e-6);
    }

    #[test]
    fn test_recovery_derivative_matches_finite_difference() {
        let curve = GlucoseTrajectory::for_levels(70.0, 110.0);
        let t = 60.0;
        let h = 1e-5;
        let numeric = (curve.value(t + h) - curve.value(t - h)) / (2.0 * h);
        assert!(curve.derivative(t) > 0.0);
        assert!((numeric - curve.derivative(t)).abs() < 1e-6);
    }

    #[test]
    fn test_recovery_undefined_before_midpoint() {
        let curve = GlucoseTrajectory::for_levels(70.0, 110.0);
        assert!(curve.value(0.0).is_nan());
        assert!((curve.value(RECOVERY_MIDPOINT) - 55.0).abs() < 1e-9);
    }

    #[test]
    fn test_flat_is_constant() {
        let curve = GlucoseTrajectory::for_levels(110.0, 110.0);
        assert!((curve.value(-5.0) - 110.0).abs() < f64::EPSILON);
        assert!(curve.derivative(42.0).abs() < f64::EPSILON);
        assert!((curve.target_bg() - 110.0).abs() < f64::EPSILON);
    }
}
