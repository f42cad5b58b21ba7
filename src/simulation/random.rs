//! Random value generation for simulated sensor readings
//!
//! Two strategies are supported: a uniform draw over `[min, max)` floored at zero, and a
//! Gaussian draw (Box–Muller transform) clamped to `[min, max]`. Each publisher owns its own
//! [`ValueGenerator`], so no synchronization is needed around the entropy source.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

/// Distribution used to produce a reading value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Distribution {
    /// Uniform over `[min, max)`, negative results floored at 0
    Uniform { min: f64, max: f64 },
    /// Normal(mean, std_dev²), clamped to `[min, max]`
    Gaussian {
        mean: f64,
        std_dev: f64,
        min: f64,
        max: f64,
    },
}

/// Per-publisher random value generator
#[derive(Debug, Clone)]
pub struct ValueGenerator {
    rng: StdRng,
}

impl ValueGenerator {
    /// Create a generator seeded from OS entropy
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Create a deterministic generator, used for reproducible runs and tests
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Draw one value from the given distribution
    pub fn sample(&mut self, distribution: &Distribution) -> f64 {
        match *distribution {
            Distribution::Uniform { min, max } => self.uniform(min, max),
            Distribution::Gaussian {
                mean,
                std_dev,
                min,
                max,
            } => self.gaussian(mean, std_dev, min, max),
        }
    }

    /// Uniform value in `[min, max)`, floored at 0 if negative.
    ///
    /// When `min == max` the constant is returned (floored at 0). Callers guarantee `min <= max`.
    /// Infinite bounds have no uniform distribution; the result is then `max(min, 0)` capped at
    /// `max`.
    pub fn uniform(&mut self, min: f64, max: f64) -> f64 {
        if min >= max {
            return min.max(0.0);
        }
        if !min.is_finite() || !max.is_finite() {
            return min.max(0.0).min(max);
        }

        loop {
            let r: f64 = self.rng.gen(); // [0, 1)
            let value = Self::lerp(min, max, r);
            if value.is_nan() {
                return min.max(0.0);
            }
            // Rounding can land exactly on `max` for very narrow spans
            if value < max {
                return value.max(0.0);
            }
        }
    }

    /// Gaussian value with the given mean and standard deviation, clamped to `[min, max]`
    pub fn gaussian(&mut self, mean: f64, std_dev: f64, min: f64, max: f64) -> f64 {
        if min == max {
            return min;
        }

        // 1 - [0, 1) gives (0, 1], keeping ln(u1) finite
        let u1 = 1.0 - self.rng.gen::<f64>();
        let u2 = 1.0 - self.rng.gen::<f64>();

        let std_normal = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).sin();
        let value = mean + std_dev * std_normal;

        clamp(value, min, max)
    }

    /// `min + r * (max - min)` without overflowing when the span exceeds `f64::MAX`
    fn lerp(min: f64, max: f64, r: f64) -> f64 {
        let span = max - min;
        if span.is_finite() {
            min + r * span
        } else {
            let half = max * 0.5 - min * 0.5;
            min + r * half + r * half
        }
    }
}

impl Default for ValueGenerator {
    fn default() -> Self {
        Self::from_entropy()
    }
}

/// Clamp that never panics: NaN collapses to `min`, an inverted range yields `max`
fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_within_bounds() {
        let mut generator = ValueGenerator::with_seed(7);
        for _ in 0..10_000 {
            let v = generator.uniform(2.0, 5.0);
            assert!((2.0..5.0).contains(&v), "value {v} escaped [2, 5)");
        }
    }

    #[test]
    fn test_uniform_floors_negative_values() {
        let mut generator = ValueGenerator::with_seed(11);
        for _ in 0..10_000 {
            let v = generator.uniform(-10.0, 1.0);
            assert!((0.0..1.0).contains(&v), "value {v} escaped [0, 1)");
        }
    }

    #[test]
    fn test_uniform_degenerate_range_returns_constant() {
        let mut generator = ValueGenerator::with_seed(1);
        assert_eq!(generator.uniform(3.0, 3.0), 3.0);
        assert_eq!(generator.uniform(-3.0, -3.0), 0.0);
    }

    #[test]
    fn test_uniform_full_range_stays_finite() {
        let mut generator = ValueGenerator::with_seed(3);
        for _ in 0..1_000 {
            let v = generator.uniform(-f64::MAX, f64::MAX);
            assert!(v.is_finite());
            assert!(v >= 0.0);
        }
    }

    #[test]
    fn test_uniform_infinite_bounds_return() {
        let mut generator = ValueGenerator::with_seed(1);

        assert_eq!(generator.uniform(f64::NEG_INFINITY, 3.0), 0.0);
        assert_eq!(generator.uniform(2.0, f64::INFINITY), 2.0);
        assert_eq!(generator.uniform(f64::NEG_INFINITY, -1.0), -1.0);
        assert_eq!(
            generator.sample(&Distribution::Uniform {
                min: f64::NEG_INFINITY,
                max: f64::INFINITY
            }),
            0.0
        );
    }

    #[test]
    fn test_gaussian_clamped() {
        let mut generator = ValueGenerator::with_seed(42);
        for _ in 0..10_000 {
            let v = generator.gaussian(10.0, 10.0, 0.0, 15.0);
            assert!((0.0..=15.0).contains(&v), "value {v} escaped [0, 15]");
        }
    }

    #[test]
    fn test_gaussian_degenerate_range_returns_constant() {
        let mut generator = ValueGenerator::with_seed(5);
        assert_eq!(generator.gaussian(100.0, 50.0, 4.0, 4.0), 4.0);
    }

    #[test]
    fn test_gaussian_zero_std_dev_returns_mean() {
        let mut generator = ValueGenerator::with_seed(5);
        assert_eq!(generator.gaussian(7.5, 0.0, 0.0, f64::MAX), 7.5);
    }

    #[test]
    fn test_gaussian_sample_mean_is_near_configured_mean() {
        let mut generator = ValueGenerator::with_seed(2024);
        let n = 20_000;
        let sum: f64 = (0..n)
            .map(|_| generator.gaussian(100.0, 5.0, f64::MIN, f64::MAX))
            .sum();
        let mean = sum / n as f64;
        assert!((mean - 100.0).abs() < 0.5, "sample mean {mean} too far from 100");
    }

    #[test]
    fn test_sample_dispatches_on_distribution() {
        let mut generator = ValueGenerator::with_seed(9);
        let uniform = generator.sample(&Distribution::Uniform { min: 0.0, max: 1.0 });
        assert!((0.0..1.0).contains(&uniform));

        let gaussian = generator.sample(&Distribution::Gaussian {
            mean: 0.0,
            std_dev: 1.0,
            min: -0.5,
            max: 0.5,
        });
        assert!((-0.5..=0.5).contains(&gaussian));
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = ValueGenerator::with_seed(99);
        let mut b = ValueGenerator::with_seed(99);
        for _ in 0..100 {
            assert_eq!(a.gaussian(1.0, 2.0, -5.0, 5.0), b.gaussian(1.0, 2.0, -5.0, 5.0));
        }
    }
}
