//! Standard normal distribution kernel.
//!
//! Every power, sample-size and minimum-effect formula in this crate is
//! expressed through Φ (the standard normal CDF) and Φ⁻¹ (its quantile
//! function). Both live here, once.

use crate::error::{check_open_unit, Field, ValidationError};

/// 1/√(2π) ≈ 0.3989422804014327
const FRAC_1_SQRT_2PI: f64 = 0.3989422804014326779399460599343818684758586311649;

/// A&S 26.2.17 polynomial coefficients b₁..b₅.
const CDF_B: [f64; 5] = [
    0.319381530,
    -0.356563782,
    1.781477937,
    -1.821255978,
    1.330274429,
];
const CDF_P: f64 = 0.2316419;

/// Beasley–Springer central-region numerator a₀..a₃.
const CENTRAL_A: [f64; 4] = [
    2.50662823884,
    -18.61500062529,
    41.39119773534,
    -25.44106049637,
];
/// Beasley–Springer central-region denominator b₀..b₃.
const CENTRAL_B: [f64; 4] = [
    -8.47351093090,
    23.08336743743,
    -21.06224101826,
    3.13082909833,
];
/// Moro tail polynomial c₀..c₈ in r = ln(−ln q).
#[allow(clippy::excessive_precision)]
const TAIL_C: [f64; 9] = [
    0.3374754822726147,
    0.9761690190917186,
    0.1607979714918209,
    0.0276438810333863,
    0.0038405729373609,
    0.0003951896511919,
    0.0000321767881768,
    0.0000002888167364,
    0.0000003960315187,
];
/// Width of the central region, |p − 0.5| < 0.42.
const CENTRAL_HALF_WIDTH: f64 = 0.42;

/// Horner evaluation of `c[0] + c[1]·x + … + c[n]·xⁿ`.
fn horner(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, &c| acc * x + c)
}

/// Approximation of the standard normal CDF Φ(x) = P(Z ≤ x) for Z ~ N(0,1).
///
/// # Algorithm
/// Abramowitz & Stegun formula 26.2.17: with `k = 1/(1 + p·|x|)`,
/// `Φ(|x|) ≈ 1 − φ(|x|)·(b₁k + b₂k² + b₃k³ + b₄k⁴ + b₅k⁵)`, then
/// `Φ(x) = 1 − Φ(−x)` for negative `x`.
///
/// Reference: Abramowitz & Stegun (1964), *Handbook of Mathematical
/// Functions*, formula 26.2.17, p. 932.
///
/// # Accuracy
/// Maximum absolute error < 7.5 × 10⁻⁸.
///
/// # Examples
/// ```
/// use u_power::special::standard_normal_cdf;
/// assert!((standard_normal_cdf(0.0) - 0.5).abs() < 1e-7);
/// assert!((standard_normal_cdf(1.96) - 0.975).abs() < 1e-4);
/// ```
pub fn standard_normal_cdf(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    if x == f64::INFINITY {
        return 1.0;
    }
    if x == f64::NEG_INFINITY {
        return 0.0;
    }

    let abs_x = x.abs();
    let k = 1.0 / (1.0 + CDF_P * abs_x);
    let upper_tail = standard_normal_pdf(abs_x) * k * horner(&CDF_B, k);

    if x >= 0.0 {
        1.0 - upper_tail
    } else {
        upper_tail
    }
}

/// Standard normal PDF φ(x) = (1/√(2π)) exp(−x²/2).
///
/// # Examples
/// ```
/// use u_power::special::standard_normal_pdf;
/// let peak = standard_normal_pdf(0.0);
/// assert!((peak - 0.3989422804014327).abs() < 1e-15);
/// ```
pub fn standard_normal_pdf(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    FRAC_1_SQRT_2PI * (-0.5 * x * x).exp()
}

/// Inverse of the standard normal CDF (quantile function).
///
/// Given `p ∈ (0, 1)`, returns `z` such that `Φ(z) = p`.
///
/// # Algorithm
/// Beasley–Springer–Moro, two branches:
/// - `|p − 0.5| < 0.42`: `z = y·A(r)/B(r)` with `y = p − 0.5`,
///   `r = y²`, `A` of degree 3 and `B` of degree 4.
/// - tails: `r = ln(−ln q)` with `q = min(p, 1 − p)`, `z = C(r)` with
///   `C` of degree 8, negated for `p < 0.5`.
///
/// Reference: Moro (1995), "The Full Monte", *Risk* 8(2), pp. 57–58.
///
/// # Accuracy
/// Maximum absolute error ≈ 3 × 10⁻⁹ for `p ∈ [1e-10, 1 − 1e-10]`.
///
/// # Errors
/// Returns a [`ValidationError`] tagged [`Field::Probability`] if `p` is
/// NaN or outside the open interval `(0, 1)`. Out-of-range input is never
/// clamped.
///
/// # Examples
/// ```
/// use u_power::special::inverse_normal_cdf;
/// assert!(inverse_normal_cdf(0.5).unwrap().abs() < 1e-12);
/// assert!((inverse_normal_cdf(0.975).unwrap() - 1.959963985).abs() < 1e-7);
/// assert!(inverse_normal_cdf(0.0).is_err());
/// ```
pub fn inverse_normal_cdf(p: f64) -> Result<f64, ValidationError> {
    let p = check_open_unit(Field::Probability, p)?;
    let y = p - 0.5;

    if y.abs() < CENTRAL_HALF_WIDTH {
        let r = y * y;
        let numerator = horner(&CENTRAL_A, r);
        let denominator = 1.0 + r * horner(&CENTRAL_B, r);
        return Ok(y * numerator / denominator);
    }

    let q = if y > 0.0 { 1.0 - p } else { p };
    let r = (-q.ln()).ln();
    let z = horner(&TAIL_C, r);
    Ok(if y < 0.0 { -z } else { z })
}
