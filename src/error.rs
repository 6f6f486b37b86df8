//! Error types.
//!
//! Every input check in this crate happens before any arithmetic and
//! reports the offending [`Field`], so a form can highlight it. Numerical
//! degeneracy (empty point sets, zero variance) is never an error; those
//! cases resolve to documented default values instead.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Input field that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    /// Probability argument of the normal quantile function.
    Probability,
    Alpha,
    Power,
    EffectSize,
    SampleSize,
    AllocationRatio,
    /// Number of groups of a one-way ANOVA design.
    Groups,
    DropoutRate,
    /// Standard deviation used to standardise a raw mean difference.
    StandardDeviation,
    /// Direction vector that cannot be normalised.
    Direction,
    /// Angular resolution of the brute-force variance search, or the
    /// step count of a sensitivity range.
    Steps,
    /// Bounds of a sensitivity range.
    Range,
    /// Parameter of a sampling distribution.
    DistributionParameter,
    Iterations,
    HistogramBins,
    Threshold,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Probability => "probability",
            Field::Alpha => "alpha",
            Field::Power => "power",
            Field::EffectSize => "effect size",
            Field::SampleSize => "sample size",
            Field::AllocationRatio => "allocation ratio",
            Field::Groups => "groups",
            Field::DropoutRate => "dropout rate",
            Field::StandardDeviation => "standard deviation",
            Field::Direction => "direction",
            Field::Steps => "steps",
            Field::Range => "range",
            Field::DistributionParameter => "distribution parameter",
            Field::Iterations => "iterations",
            Field::HistogramBins => "histogram bins",
            Field::Threshold => "threshold",
        };
        f.write_str(name)
    }
}

/// Out-of-domain input, tagged with the field that caused it.
///
/// # Examples
/// ```
/// use u_power::error::Field;
/// use u_power::special::inverse_normal_cdf;
///
/// let err = inverse_normal_cdf(1.5).unwrap_err();
/// assert_eq!(err.field, Field::Probability);
/// assert_eq!(err.to_string(), "invalid probability 1.5: must lie in (0, 1)");
/// ```
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize)]
#[error("invalid {field} {value}: {reason}")]
pub struct ValidationError {
    pub field: Field,
    pub value: f64,
    pub reason: &'static str,
}

impl ValidationError {
    pub fn new(field: Field, value: f64, reason: &'static str) -> Self {
        Self {
            field,
            value,
            reason,
        }
    }
}

/// Rejects `value` unless it lies strictly inside `(0, 1)`.
pub(crate) fn check_open_unit(field: Field, value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() && value > 0.0 && value < 1.0 {
        Ok(value)
    } else {
        Err(ValidationError::new(field, value, "must lie in (0, 1)"))
    }
}

/// Rejects `value` unless it is finite and strictly positive.
pub(crate) fn check_positive(field: Field, value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ValidationError::new(field, value, "must be finite and > 0"))
    }
}
