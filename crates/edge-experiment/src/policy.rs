//! Random assignment of first-time visitors.

use rand::rngs::{StdRng, ThreadRng};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::variant::Variant;

/// Default probability that a first-time visitor lands in variant A.
pub const DEFAULT_PROBABILITY_A: f64 = 0.75;

/// Source of uniform draws in `[0, 1)`.
pub trait RandomSource {
    /// Next uniform draw in `[0, 1)`.
    fn next_unit(&mut self) -> f64;
}

impl RandomSource for ThreadRng {
    fn next_unit(&mut self) -> f64 {
        self.gen::<f64>()
    }
}

impl RandomSource for StdRng {
    fn next_unit(&mut self) -> f64 {
        self.gen::<f64>()
    }
}

/// A constant draw, for pinning an assignment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedDraw(f64);

impl FixedDraw {
    /// Create a fixed draw, clamped into `[0, 1)`. NaN becomes 0.
    pub fn new(value: f64) -> Self {
        let value = if value.is_nan() || value < 0.0 {
            0.0
        } else if value >= 1.0 {
            // largest f64 below 1.0
            f64::from_bits(1.0f64.to_bits() - 1)
        } else {
            value
        };
        Self(value)
    }

    /// The clamped value.
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl RandomSource for FixedDraw {
    fn next_unit(&mut self) -> f64 {
        self.0
    }
}

/// Result of a fresh assignment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assignment {
    /// Chosen variant.
    pub variant: Variant,
    /// The draw that chose it.
    pub draw: f64,
}

/// Assignment policy for clients without a recognized experiment cookie.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssignmentPolicy {
    /// Probability in `[0, 1]` of assigning variant A.
    pub probability_a: f64,
}

impl Default for AssignmentPolicy {
    fn default() -> Self {
        Self {
            probability_a: DEFAULT_PROBABILITY_A,
        }
    }
}

impl AssignmentPolicy {
    /// Create a policy with the given probability of variant A.
    pub fn new(probability_a: f64) -> Self {
        Self { probability_a }
    }

    /// Draw once and pick a variant: A iff `draw < probability_a`.
    pub fn assign(&self, rng: &mut dyn RandomSource) -> Assignment {
        let draw = rng.next_unit();
        let variant = if draw < self.probability_a {
            Variant::A
        } else {
            Variant::B
        };
        Assignment { variant, draw }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn test_default_probability() {
        assert_eq!(AssignmentPolicy::default().probability_a, 0.75);
    }

    #[test]
    fn test_threshold_is_strict() {
        let policy = AssignmentPolicy::default();
        assert_eq!(policy.assign(&mut FixedDraw::new(0.7499)).variant, Variant::A);
        assert_eq!(policy.assign(&mut FixedDraw::new(0.75)).variant, Variant::B);
        assert_eq!(policy.assign(&mut FixedDraw::new(0.0)).variant, Variant::A);
    }

    #[test]
    fn test_extreme_probabilities() {
        let always_a = AssignmentPolicy::new(1.0);
        let never_a = AssignmentPolicy::new(0.0);
        assert_eq!(always_a.assign(&mut FixedDraw::new(0.9999)).variant, Variant::A);
        assert_eq!(never_a.assign(&mut FixedDraw::new(0.0)).variant, Variant::B);
    }

    #[test]
    fn test_assignment_reports_draw() {
        let assignment = AssignmentPolicy::default().assign(&mut FixedDraw::new(0.9));
        assert_eq!(assignment.draw, 0.9);
        assert_eq!(assignment.variant, Variant::B);
    }

    #[test]
    fn test_fixed_draw_clamps() {
        assert_eq!(FixedDraw::new(-1.0).value(), 0.0);
        assert_eq!(FixedDraw::new(f64::NAN).value(), 0.0);
        assert!(FixedDraw::new(1.0).value() < 1.0);
        assert!(FixedDraw::new(7.0).value() > 0.999);
    }

    #[test]
    fn test_std_rng_draws_in_unit_interval() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1_000 {
            let r = rng.next_unit();
            assert!((0.0..1.0).contains(&r));
        }
    }
}
