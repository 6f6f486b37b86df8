//! Sampling distributions for Monte Carlo parameter draws.
//!
//! Each type validates its parameters on construction and exposes its
//! analytical mean and variance next to a `sample` method, so tests can
//! check the samplers against closed-form moments.
//!
//! # Supported Distributions
//!
//! | Distribution | Parameters | Mean | Variance | Sampler |
//! |---|---|---|---|---|
//! | [`Normal`] | μ, σ | μ | σ² | Box–Muller |
//! | [`Uniform`] | min, max | (a+b)/2 | (b−a)²/12 | inverse CDF |
//! | [`Beta`] | α, β | α/(α+β) | αβ/((α+β)²(α+β+1)) | gamma ratio, Marsaglia–Tsang rejection |

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{check_positive, Field, ValidationError};
use crate::random::{sample_gamma, sample_standard_normal};

// ============================================================================
// Uniform Distribution
// ============================================================================

/// Continuous uniform distribution on `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Uniform {
    min: f64,
    max: f64,
}

impl Uniform {
    /// Creates a new uniform distribution on `[min, max]`.
    ///
    /// # Errors
    /// Returns `Err` if `min >= max` or either bound is not finite.
    pub fn new(min: f64, max: f64) -> Result<Self, ValidationError> {
        if !min.is_finite() {
            return Err(ValidationError::new(
                Field::DistributionParameter,
                min,
                "uniform bounds must be finite",
            ));
        }
        if !max.is_finite() || min >= max {
            return Err(ValidationError::new(
                Field::DistributionParameter,
                max,
                "uniform requires finite min < max",
            ));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn mean(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    pub fn variance(&self) -> f64 {
        let range = self.max - self.min;
        range * range / 12.0
    }

    /// Draws `min + U·(max − min)`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.min + rng.random::<f64>() * (self.max - self.min)
    }
}

// ============================================================================
// Normal Distribution
// ============================================================================

/// Normal (Gaussian) distribution N(μ, σ²).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Normal {
    mu: f64,
    sigma: f64,
}

impl Normal {
    /// Creates a new normal distribution N(μ, σ).
    ///
    /// # Errors
    /// Returns `Err` if `sigma ≤ 0` or either parameter is not finite.
    pub fn new(mu: f64, sigma: f64) -> Result<Self, ValidationError> {
        if !mu.is_finite() {
            return Err(ValidationError::new(
                Field::DistributionParameter,
                mu,
                "normal mean must be finite",
            ));
        }
        let sigma = check_positive(Field::DistributionParameter, sigma)?;
        Ok(Self { mu, sigma })
    }

    pub fn mu(&self) -> f64 {
        self.mu
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn mean(&self) -> f64 {
        self.mu
    }

    pub fn variance(&self) -> f64 {
        self.sigma * self.sigma
    }

    /// Draws `μ + σ·Z` with `Z` from Box–Muller.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.mu + self.sigma * sample_standard_normal(rng)
    }
}

// ============================================================================
// Beta Distribution
// ============================================================================

/// Beta distribution on `[0, 1]`.
///
/// # Sampling
/// If `X ~ Gamma(α, 1)` and `Y ~ Gamma(β, 1)` independently, then
/// `X/(X+Y) ~ Beta(α, β)`. Both gamma draws come from the Marsaglia–Tsang
/// rejection sampler, which is valid for every positive shape (unlike
/// bounding-box rejection, which fails when α < 1 or β < 1 makes the
/// density unbounded).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBeta")]
pub struct Beta {
    alpha: f64,
    beta: f64,
}

/// Smallest accepted Beta shape. Below it both gamma draws underflow to
/// zero so often that rejection sampling stalls.
pub const MIN_BETA_SHAPE: f64 = 1e-3;

#[derive(Deserialize)]
struct RawBeta {
    alpha: f64,
    beta: f64,
}

impl TryFrom<RawBeta> for Beta {
    type Error = ValidationError;

    fn try_from(raw: RawBeta) -> Result<Self, Self::Error> {
        Beta::new(raw.alpha, raw.beta)
    }
}

impl Beta {
    /// Creates a new Beta(α, β) distribution.
    ///
    /// # Errors
    /// Returns `Err` if either shape is not finite or is below
    /// [`MIN_BETA_SHAPE`].
    pub fn new(alpha: f64, beta: f64) -> Result<Self, ValidationError> {
        for shape in [alpha, beta] {
            check_positive(Field::DistributionParameter, shape)?;
            if shape < MIN_BETA_SHAPE {
                return Err(ValidationError::new(
                    Field::DistributionParameter,
                    shape,
                    "beta shape must be at least 0.001",
                ));
            }
        }
        Ok(Self { alpha, beta })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn mean(&self) -> f64 {
        self.alpha / (self.alpha + self.beta)
    }

    pub fn variance(&self) -> f64 {
        let s = self.alpha + self.beta;
        self.alpha * self.beta / (s * s * (s + 1.0))
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        loop {
            let x = sample_gamma(rng, self.alpha);
            let y = sample_gamma(rng, self.beta);
            let s = x + y;
            // Both gammas can underflow to zero for very small shapes.
            if s > 0.0 {
                return x / s;
            }
        }
    }
}

// ============================================================================
// Distribution
// ============================================================================

/// Any of the sampling distributions a Monte Carlo parameter may follow.
///
/// # Examples
/// ```
/// use u_power::distributions::Distribution;
/// use u_power::random::create_rng;
///
/// let d = Distribution::uniform(0.2, 0.8).unwrap();
/// let mut rng = create_rng(1);
/// let x = d.sample(&mut rng);
/// assert!((0.2..=0.8).contains(&x));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Distribution {
    Normal(Normal),
    Uniform(Uniform),
    Beta(Beta),
}

impl Distribution {
    pub fn normal(mean: f64, sd: f64) -> Result<Self, ValidationError> {
        Normal::new(mean, sd).map(Self::Normal)
    }

    pub fn uniform(min: f64, max: f64) -> Result<Self, ValidationError> {
        Uniform::new(min, max).map(Self::Uniform)
    }

    pub fn beta(alpha: f64, beta: f64) -> Result<Self, ValidationError> {
        Beta::new(alpha, beta).map(Self::Beta)
    }

    pub fn mean(&self) -> f64 {
        match self {
            Self::Normal(d) => d.mean(),
            Self::Uniform(d) => d.mean(),
            Self::Beta(d) => d.mean(),
        }
    }

    pub fn variance(&self) -> f64 {
        match self {
            Self::Normal(d) => d.variance(),
            Self::Uniform(d) => d.variance(),
            Self::Beta(d) => d.variance(),
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            Self::Normal(d) => d.sample(rng),
            Self::Uniform(d) => d.sample(rng),
            Self::Beta(d) => d.sample(rng),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::create_rng;
    use crate::stats::WelfordAccumulator;

    fn sample_moments(d: &Distribution, n: usize, seed: u64) -> (f64, f64) {
        let mut rng = create_rng(seed);
        let mut acc = WelfordAccumulator::new();
        for _ in 0..n {
            acc.update(d.sample(&mut rng));
        }
        (acc.mean().unwrap(), acc.sample_variance().unwrap())
    }

    // --- Uniform ---

    #[test]
    fn test_uniform_basic() {
        let u = Uniform::new(0.0, 10.0).unwrap();
        assert!((u.mean() - 5.0).abs() < 1e-15);
        assert!((u.variance() - 100.0 / 12.0).abs() < 1e-10);
    }

    #[test]
    fn test_uniform_invalid() {
        assert!(Uniform::new(5.0, 5.0).is_err());
        assert!(Uniform::new(5.0, 3.0).is_err());
        assert!(Uniform::new(f64::NAN, 5.0).is_err());
        let err = Uniform::new(1.0, f64::INFINITY).unwrap_err();
        assert_eq!(err.field, Field::DistributionParameter);
    }

    #[test]
    fn test_uniform_sample_moments() {
        let d = Distribution::uniform(2.0, 8.0).unwrap();
        let (mean, var) = sample_moments(&d, 40_000, 5);
        assert!((mean - 5.0).abs() < 0.05, "mean = {mean}");
        assert!((var - 3.0).abs() < 0.1, "variance = {var}");
    }

    // --- Normal ---

    #[test]
    fn test_normal_basic() {
        let n = Normal::new(10.0, 2.0).unwrap();
        assert_eq!(n.mean(), 10.0);
        assert_eq!(n.variance(), 4.0);
    }

    #[test]
    fn test_normal_invalid() {
        assert!(Normal::new(0.0, 0.0).is_err());
        assert!(Normal::new(0.0, -1.0).is_err());
        assert!(Normal::new(f64::INFINITY, 1.0).is_err());
    }

    #[test]
    fn test_normal_sample_moments() {
        let d = Distribution::normal(0.5, 0.1).unwrap();
        let (mean, var) = sample_moments(&d, 40_000, 11);
        assert!((mean - 0.5).abs() < 0.003, "mean = {mean}");
        assert!((var - 0.01).abs() < 0.0005, "variance = {var}");
    }

    // --- Beta ---

    #[test]
    fn test_beta_moments_formula() {
        let b = Beta::new(2.0, 3.0).unwrap();
        assert!((b.mean() - 0.4).abs() < 1e-15);
        assert!((b.variance() - 0.04).abs() < 1e-15);
    }

    #[test]
    fn test_beta_invalid() {
        assert!(Beta::new(0.0, 1.0).is_err());
        assert!(Beta::new(1.0, -2.0).is_err());
        assert!(Beta::new(f64::NAN, 1.0).is_err());
        let err = Beta::new(1e-8, 1.0).unwrap_err();
        assert_eq!(err.field, Field::DistributionParameter);
        assert_eq!(err.value, 1e-8);
        assert!(serde_json::from_str::<Beta>(r#"{"alpha":1e-9,"beta":1.0}"#).is_err());
    }

    #[test]
    fn test_beta_smallest_shapes_terminate() {
        let d = Beta::new(MIN_BETA_SHAPE, MIN_BETA_SHAPE).unwrap();
        let mut rng = crate::random::create_rng(3);
        let draws: Vec<f64> = (0..2_000).map(|_| d.sample(&mut rng)).collect();
        assert!(draws.iter().all(|x| (0.0..=1.0).contains(x)));
        // U-shaped: nearly all mass sits at the ends.
        let ends = draws.iter().filter(|&&x| x < 0.01 || x > 0.99).count();
        assert!(ends > 1_900, "{ends} of 2000 near the ends");
    }

    #[test]
    fn test_beta_sample_moments() {
        for &(a, b) in &[(2.0, 5.0), (0.5, 0.5), (8.0, 2.0)] {
            let d = Distribution::beta(a, b).unwrap();
            let (mean, var) = sample_moments(&d, 40_000, 17);
            assert!(
                (mean - d.mean()).abs() < 0.01,
                "Beta({a},{b}) mean {mean} vs {}",
                d.mean()
            );
            assert!(
                (var - d.variance()).abs() < 0.01,
                "Beta({a},{b}) variance {var} vs {}",
                d.variance()
            );
        }
    }

    #[test]
    fn test_distribution_serializes_tagged() {
        let d = Distribution::beta(2.0, 3.0).unwrap();
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, r#"{"Beta":{"alpha":2.0,"beta":3.0}}"#);
    }
}
