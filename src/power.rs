//! Statistical power, required sample size and minimum detectable effect.
//!
//! Every design is reduced to a non-centrality parameter (ncp) δ: the
//! shift of a standard normal test statistic under the alternative. With
//! the critical value `z` from [`Tails::critical_z`],
//!
//! ```text
//! two tails: power = 1 − Φ(z − δ) + Φ(−z − δ)
//! one tail:  power = 1 − Φ(z − δ)
//! ```
//!
//! Sample size and minimum effect invert `δ = z_α + z_β` (the lower
//! rejection region is negligible there), with `z_β = Φ⁻¹(power)`.
//!
//! | Design | δ |
//! |---|---|
//! | [`TestDesign::TwoSampleIndependent`] | `d·√(n₁·k/(1+k))`, `n₂ = k·n₁` |
//! | [`TestDesign::OneSample`], [`TestDesign::Paired`] | `d·√n` |
//! | [`TestDesign::OneWayAnova`] | `√λ`, `λ = N·f²`, `N = groups·n` |
//! | [`TestDesign::Correlation`] | `atanh(|r|)·√(n − 3)` |
//!
//! The ANOVA row compares `λ` against the F(1, ∞) critical value
//! `z²_{1−α/2}`, so it ignores [`Tails`].
//!
//! All inputs are validated before any arithmetic; the first invalid field
//! is reported as a [`ValidationError`].

use serde::{Deserialize, Serialize};

use crate::error::{check_open_unit, check_positive, Field, ValidationError};
use crate::special::{inverse_normal_cdf, standard_normal_cdf};

/// Number of rejection regions of the test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tails {
    One,
    Two,
}

impl Tails {
    /// Critical value of the standard normal test statistic:
    /// `z_{1−α}` for one tail, `z_{1−α/2}` for two.
    ///
    /// # Examples
    /// ```
    /// use u_power::power::Tails;
    /// assert!((Tails::Two.critical_z(0.05).unwrap() - 1.959964).abs() < 1e-6);
    /// assert!((Tails::One.critical_z(0.05).unwrap() - 1.644854).abs() < 1e-6);
    /// ```
    pub fn critical_z(self, alpha: f64) -> Result<f64, ValidationError> {
        let alpha = check_open_unit(Field::Alpha, alpha)?;
        // −Φ⁻¹(α) rather than Φ⁻¹(1 − α): no cancellation for tiny α.
        let tail_probability = match self {
            Tails::One => alpha,
            Tails::Two => alpha / 2.0,
        };
        Ok(-inverse_normal_cdf(tail_probability)?)
    }
}

/// Study design whose test statistic the model approximates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestDesign {
    /// Two independent groups, Cohen's d, `sample_size` = size of group 1.
    TwoSampleIndependent,
    /// One group against a fixed value, Cohen's d.
    OneSample,
    /// Paired differences, Cohen's d of the differences.
    Paired,
    /// One-way ANOVA with Cohen's f, `sample_size` = size of each group.
    OneWayAnova { groups: u32 },
    /// Pearson correlation against zero, `effect_size` = r (sign ignored).
    Correlation,
}

/// Inputs of the power model.
///
/// Exactly one of `power`, `sample_size` and `effect_size` is the unknown;
/// the function called decides which, and that field is neither validated
/// nor read.
///
/// # Examples
/// ```
/// use u_power::power::{compute_sample_size, TestDesign, TestParameters};
/// let params = TestParameters::new(TestDesign::TwoSampleIndependent)
///     .with_alpha(0.05)
///     .with_power(0.8)
///     .with_effect_size(0.5);
/// let n = compute_sample_size(&params).unwrap();
/// assert_eq!(n.per_group, 63);
/// assert_eq!(n.total, 126);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestParameters {
    pub design: TestDesign,
    /// Type I error rate, in `(0, 1)`.
    pub alpha: f64,
    /// Target power `1 − β`, in `(0, 1)`.
    pub power: f64,
    /// Cohen's d, Cohen's f or Pearson r depending on the design.
    pub effect_size: f64,
    /// Per-group sample size (first group for unequal allocation), ≥ 2.
    pub sample_size: u64,
    pub tails: Tails,
    /// `n₂ / n₁` for the two-sample design, > 0.
    pub allocation_ratio: f64,
}

impl TestParameters {
    /// Parameters with the conventional defaults: α = 0.05, power = 0.8,
    /// effect size 0.5, n = 30, two tails, equal allocation.
    pub fn new(design: TestDesign) -> Self {
        Self {
            design,
            alpha: 0.05,
            power: 0.8,
            effect_size: 0.5,
            sample_size: 30,
            tails: Tails::Two,
            allocation_ratio: 1.0,
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_power(mut self, power: f64) -> Self {
        self.power = power;
        self
    }

    pub fn with_effect_size(mut self, effect_size: f64) -> Self {
        self.effect_size = effect_size;
        self
    }

    pub fn with_sample_size(mut self, sample_size: u64) -> Self {
        self.sample_size = sample_size;
        self
    }

    pub fn with_tails(mut self, tails: Tails) -> Self {
        self.tails = tails;
        self
    }

    pub fn with_allocation_ratio(mut self, allocation_ratio: f64) -> Self {
        self.allocation_ratio = allocation_ratio;
        self
    }

    /// Smallest sample size the design's formula is defined for.
    pub fn min_sample_size(&self) -> u64 {
        match self.design {
            TestDesign::Correlation => 4,
            _ => 2,
        }
    }

    /// Critical value, honouring the ANOVA two-sided convention.
    fn critical_z(&self) -> Result<f64, ValidationError> {
        match self.design {
            TestDesign::OneWayAnova { .. } => Tails::Two.critical_z(self.alpha),
            _ => self.tails.critical_z(self.alpha),
        }
    }

    fn validate_design(&self) -> Result<(), ValidationError> {
        match self.design {
            TestDesign::TwoSampleIndependent => {
                check_positive(Field::AllocationRatio, self.allocation_ratio)?;
            }
            TestDesign::OneWayAnova { groups } if groups < 2 => {
                return Err(ValidationError::new(
                    Field::Groups,
                    groups as f64,
                    "one-way ANOVA needs at least 2 groups",
                ));
            }
            _ => {}
        }
        Ok(())
    }

    /// Magnitude of the effect, validated for the design.
    fn validated_effect(&self) -> Result<f64, ValidationError> {
        match self.design {
            TestDesign::Correlation => {
                let r = self.effect_size.abs();
                if r.is_finite() && r > 0.0 && r < 1.0 {
                    Ok(r)
                } else {
                    Err(ValidationError::new(
                        Field::EffectSize,
                        self.effect_size,
                        "correlation must satisfy 0 < |r| < 1",
                    ))
                }
            }
            _ => check_positive(Field::EffectSize, self.effect_size),
        }
    }

    fn validated_sample_size(&self) -> Result<f64, ValidationError> {
        if self.sample_size < self.min_sample_size() {
            let reason = match self.design {
                TestDesign::Correlation => "Fisher z needs a sample size of at least 4",
                _ => "sample size must be at least 2",
            };
            return Err(ValidationError::new(
                Field::SampleSize,
                self.sample_size as f64,
                reason,
            ));
        }
        Ok(self.sample_size as f64)
    }

    /// `z_α + z_β`, floored at zero.
    ///
    /// A negative sum means the target power is reached with no data at
    /// all; the formulas then fall back to their minimum sample size and a
    /// zero minimum effect.
    fn z_sum(&self) -> Result<f64, ValidationError> {
        self.validate_design()?;
        let power = check_open_unit(Field::Power, self.power)?;
        let z_alpha = self.critical_z()?;
        let z_beta = inverse_normal_cdf(power)?;
        Ok((z_alpha + z_beta).max(0.0))
    }
}

/// Statistical power of a design.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerResult {
    /// In `[0, 1]`.
    pub power: f64,
}

/// Required sample size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleSizeResult {
    /// Size of each group (of the first group for unequal allocation).
    pub per_group: u64,
    /// Size of the whole study. For the two-sample design the second group
    /// is `total − per_group`.
    pub total: u64,
}

/// Minimum detectable effect size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectSizeResult {
    /// Cohen's d, Cohen's f or |r|, matching the design.
    pub effect_size: f64,
}

/// Fisher's z-transform `atanh(r) = ½·ln((1 + r)/(1 − r))`.
///
/// # Errors
/// [`Field::EffectSize`] unless `|r| < 1`.
///
/// # Examples
/// ```
/// use u_power::power::fisher_z;
/// assert!((fisher_z(0.5).unwrap() - 0.5493061443).abs() < 1e-9);
/// assert!(fisher_z(1.0).is_err());
/// ```
pub fn fisher_z(r: f64) -> Result<f64, ValidationError> {
    if !(r.is_finite() && r.abs() < 1.0) {
        return Err(ValidationError::new(
            Field::EffectSize,
            r,
            "correlation must satisfy |r| < 1",
        ));
    }
    Ok(0.5 * ((1.0 + r) / (1.0 - r)).ln())
}

/// Pooled standard deviation of two groups,
/// `√(((n₁−1)s₁² + (n₂−1)s₂²) / (n₁ + n₂ − 2))`.
///
/// # Errors
/// [`Field::SampleSize`] if a group has fewer than 2 observations,
/// [`Field::StandardDeviation`] if a standard deviation is negative or not
/// finite.
pub fn pooled_sd(sd1: f64, n1: u64, sd2: f64, n2: u64) -> Result<f64, ValidationError> {
    for &n in &[n1, n2] {
        if n < 2 {
            return Err(ValidationError::new(
                Field::SampleSize,
                n as f64,
                "each group needs at least 2 observations",
            ));
        }
    }
    for &sd in &[sd1, sd2] {
        if !(sd.is_finite() && sd >= 0.0) {
            return Err(ValidationError::new(
                Field::StandardDeviation,
                sd,
                "must be finite and ≥ 0",
            ));
        }
    }
    let (a, b) = ((n1 - 1) as f64, (n2 - 1) as f64);
    Ok(((a * sd1 * sd1 + b * sd2 * sd2) / (a + b)).sqrt())
}

/// Cohen's d, `(mean₁ − mean₂) / pooled_sd`. The sign is kept.
///
/// # Examples
/// ```
/// use u_power::power::cohens_d;
/// assert_eq!(cohens_d(105.0, 100.0, 10.0).unwrap(), 0.5);
/// assert!(cohens_d(1.0, 0.0, 0.0).is_err());
/// ```
pub fn cohens_d(mean1: f64, mean2: f64, pooled_sd: f64) -> Result<f64, ValidationError> {
    let sd = check_positive(Field::StandardDeviation, pooled_sd)?;
    Ok((mean1 - mean2) / sd)
}

/// Non-centrality parameter δ of a validated design.
fn noncentrality(params: &TestParameters, effect: f64, n: f64) -> f64 {
    match params.design {
        TestDesign::TwoSampleIndependent => {
            let k = params.allocation_ratio;
            effect * (n * k / (1.0 + k)).sqrt()
        }
        TestDesign::OneSample | TestDesign::Paired => effect * n.sqrt(),
        TestDesign::OneWayAnova { groups } => {
            let lambda = groups as f64 * n * effect * effect;
            lambda.sqrt()
        }
        TestDesign::Correlation => 0.5 * ((1.0 + effect) / (1.0 - effect)).ln() * (n - 3.0).sqrt(),
    }
}

/// Power of the design at the given effect size and sample size.
///
/// `params.power` is the unknown and is ignored.
///
/// # Examples
/// ```
/// use u_power::power::{compute_power, TestDesign, TestParameters};
/// let params = TestParameters::new(TestDesign::TwoSampleIndependent)
///     .with_effect_size(0.5)
///     .with_sample_size(63);
/// let p = compute_power(&params).unwrap().power;
/// assert!((p - 0.80).abs() < 0.01);
/// ```
pub fn compute_power(params: &TestParameters) -> Result<PowerResult, ValidationError> {
    params.validate_design()?;
    let z = params.critical_z()?;
    let effect = params.validated_effect()?;
    let n = params.validated_sample_size()?;

    let ncp = noncentrality(params, effect, n);
    let upper = 1.0 - standard_normal_cdf(z - ncp);
    let two_sided = match params.design {
        TestDesign::OneWayAnova { .. } => true,
        _ => params.tails == Tails::Two,
    };
    let power = if two_sided {
        upper + standard_normal_cdf(-z - ncp)
    } else {
        upper
    };
    Ok(PowerResult {
        power: power.clamp(0.0, 1.0),
    })
}

/// Smallest sample size reaching the target power, always rounded up.
///
/// `params.sample_size` is the unknown and is ignored. Results never fall
/// below [`TestParameters::min_sample_size`] per group.
///
/// # Errors
/// Besides the input checks, [`Field::EffectSize`] when the effect is so
/// small that the required size does not fit in a `u64`.
///
/// # Examples
/// ```
/// use u_power::power::{compute_sample_size, TestDesign, TestParameters};
/// let params = TestParameters::new(TestDesign::Correlation)
///     .with_effect_size(-0.3);
/// assert_eq!(compute_sample_size(&params).unwrap().total, 85);
/// ```
pub fn compute_sample_size(params: &TestParameters) -> Result<SampleSizeResult, ValidationError> {
    let z = params.z_sum()?;
    let effect = params.validated_effect()?;
    let floor = params.min_sample_size();
    let too_small = || {
        ValidationError::new(
            Field::EffectSize,
            params.effect_size,
            "effect size too small: required sample size exceeds u64",
        )
    };
    let ceil = |x: f64| -> Result<u64, ValidationError> {
        let x = x.ceil();
        // 2⁶⁴ is exact in f64; anything at or above it would saturate.
        if x.is_finite() && x < u64::MAX as f64 {
            Ok((x as u64).max(floor))
        } else {
            Err(too_small())
        }
    };

    let result = match params.design {
        TestDesign::TwoSampleIndependent => {
            let k = params.allocation_ratio;
            let n1 = (1.0 + 1.0 / k) * z * z / (effect * effect);
            let n2 = n1 * k;
            let first = ceil(n1)?;
            SampleSizeResult {
                per_group: first,
                total: first.checked_add(ceil(n2)?).ok_or_else(too_small)?,
            }
        }
        TestDesign::OneSample | TestDesign::Paired => {
            let n = ceil(z * z / (effect * effect))?;
            SampleSizeResult {
                per_group: n,
                total: n,
            }
        }
        TestDesign::OneWayAnova { groups } => {
            let total = z * z / (effect * effect);
            let per_group = ceil(total / groups as f64)?;
            SampleSizeResult {
                per_group,
                total: per_group
                    .checked_mul(groups as u64)
                    .ok_or_else(too_small)?,
            }
        }
        TestDesign::Correlation => {
            let zr = fisher_z(effect)?;
            let n = ceil((z / zr).powi(2) + 3.0)?;
            SampleSizeResult {
                per_group: n,
                total: n,
            }
        }
    };
    Ok(result)
}

/// Smallest effect size detectable with the target power at the given
/// sample size.
///
/// `params.effect_size` is the unknown and is ignored. A correlation result
/// is capped at `1 − ε`; at that cap (tiny α with n close to 4) the target
/// power is out of reach for any |r| < 1.
///
/// # Examples
/// ```
/// use u_power::power::{compute_minimum_effect, TestDesign, TestParameters};
/// let params = TestParameters::new(TestDesign::OneSample).with_sample_size(100);
/// let d = compute_minimum_effect(&params).unwrap().effect_size;
/// assert!((d - 0.2802).abs() < 1e-3);
/// ```
pub fn compute_minimum_effect(params: &TestParameters) -> Result<EffectSizeResult, ValidationError> {
    let z = params.z_sum()?;
    let n = params.validated_sample_size()?;

    let effect_size = match params.design {
        TestDesign::TwoSampleIndependent => {
            let k = params.allocation_ratio;
            z * ((1.0 + 1.0 / k) / n).sqrt()
        }
        TestDesign::OneSample | TestDesign::Paired => z / n.sqrt(),
        TestDesign::OneWayAnova { groups } => z / (groups as f64 * n).sqrt(),
        // tanh rounds to exactly 1 past ~19; keep |r| < 1 so the result
        // can be fed back into compute_power.
        TestDesign::Correlation => (z / (n - 3.0).sqrt()).tanh().min(1.0 - f64::EPSILON),
    };
    Ok(EffectSizeResult { effect_size })
}

/// Inflates a sample size so that `n` remain after the expected dropout:
/// `⌈n / (1 − rate)⌉`.
///
/// # Errors
/// [`Field::DropoutRate`] unless `rate ∈ [0, 1)`.
///
/// # Examples
/// ```
/// use u_power::power::adjust_for_dropout;
/// assert_eq!(adjust_for_dropout(63, 0.2).unwrap(), 79);
/// assert_eq!(adjust_for_dropout(63, 0.0).unwrap(), 63);
/// assert!(adjust_for_dropout(63, 1.0).is_err());
/// ```
pub fn adjust_for_dropout(n: u64, dropout_rate: f64) -> Result<u64, ValidationError> {
    if !(dropout_rate.is_finite() && (0.0..1.0).contains(&dropout_rate)) {
        return Err(ValidationError::new(
            Field::DropoutRate,
            dropout_rate,
            "must lie in [0, 1)",
        ));
    }
    let adjusted = (n as f64 / (1.0 - dropout_rate)).ceil() as u64;
    Ok(adjusted.max(n))
}
