//! Direction of maximum variance: exact and brute-force.
//!
//! The exact answer is the dominant eigenvector of the covariance matrix.
//! The brute-force search scans a grid of angles and keeps the best one; it
//! exists so a teaching view can show the scan converging on the
//! closed-form answer as the grid gets finer.
//!
//! Variance along a direction is π-periodic (a direction and its negation
//! give the same projections up to sign), so every angle reported here is
//! normalised into `[0, π)`.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use super::covariance::{covariance, Point2D};
use super::eigen::UnitVector2D;
use crate::error::{Field, ValidationError};

/// Variance of the centred points projected onto one direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionalVariance {
    pub variance: f64,
    /// Signed projection of each centred point, in input order.
    pub projections: Vec<f64>,
}

/// Exact direction of maximum variance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaxVarianceDirection {
    /// Axis angle in `[0, π)`.
    pub angle: f64,
    /// Largest eigenvalue of the covariance matrix.
    pub variance: f64,
    /// `(cos angle, sin angle)`.
    pub vector: UnitVector2D,
}

/// Best direction found by scanning a grid of angles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BruteForceDirection {
    /// Axis angle in `[0, π)`.
    pub angle: f64,
    pub variance: f64,
}

/// Maps any angle onto the equivalent axis angle in `[0, π)`.
pub fn normalize_axis_angle(angle: f64) -> f64 {
    let a = angle.rem_euclid(PI);
    // rem_euclid can round up to exactly π for tiny negative inputs.
    if a >= PI {
        0.0
    } else {
        a
    }
}

/// Distance between two axis angles modulo π, in `[0, π/2]`.
///
/// # Examples
/// ```
/// use u_power::pca::angular_distance;
/// use std::f64::consts::PI;
/// assert!(angular_distance(0.1, PI - 0.1) < 0.2 + 1e-12);
/// assert!((angular_distance(0.0, PI / 2.0) - PI / 2.0).abs() < 1e-12);
/// ```
pub fn angular_distance(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(PI);
    d.min(PI - d)
}

/// Projects the centred points onto `(cos θ, sin θ)`.
///
/// The variance is the mean of the squared projections (population
/// divisor, matching [`covariance`]). An empty slice has variance 0.
///
/// # Examples
/// ```
/// use u_power::pca::{variance_along_direction, Point2D};
/// let pts = [Point2D::new(-2.0, 0.0), Point2D::new(2.0, 0.0)];
/// let along_x = variance_along_direction(&pts, 0.0);
/// assert_eq!(along_x.variance, 4.0);
/// assert_eq!(along_x.projections, vec![-2.0, 2.0]);
/// let along_y = variance_along_direction(&pts, std::f64::consts::FRAC_PI_2);
/// assert!(along_y.variance < 1e-20);
/// ```
pub fn variance_along_direction(points: &[Point2D], angle: f64) -> DirectionalVariance {
    if points.is_empty() {
        return DirectionalVariance {
            variance: 0.0,
            projections: Vec::new(),
        };
    }
    let dir = UnitVector2D::from_angle(angle);
    let projections: Vec<f64> = Point2D::centered(points)
        .iter()
        .map(|p| p.x * dir.x() + p.y * dir.y())
        .collect();
    let variance = projections.iter().map(|p| p * p).sum::<f64>() / projections.len() as f64;
    DirectionalVariance {
        variance,
        projections,
    }
}

/// Exact direction of maximum variance from the covariance eigenvectors.
///
/// Degenerate input (empty, a single point, or isotropic spread) has no
/// preferred direction; the standard basis makes the answer angle 0.
///
/// # Examples
/// ```
/// use u_power::pca::{find_max_variance_exact, Point2D};
/// let pts = [
///     Point2D::new(-1.0, -1.0),
///     Point2D::new(1.0, 1.0),
///     Point2D::new(-0.1, 0.1),
///     Point2D::new(0.1, -0.1),
/// ];
/// let best = find_max_variance_exact(&pts);
/// assert!((best.angle - std::f64::consts::FRAC_PI_4).abs() < 1e-12);
/// ```
pub fn find_max_variance_exact(points: &[Point2D]) -> MaxVarianceDirection {
    let eig = covariance(points).decompose();
    let angle = normalize_axis_angle(eig.v1().angle());
    MaxVarianceDirection {
        angle,
        variance: eig.lambda1(),
        vector: UnitVector2D::from_angle(angle),
    }
}

/// Scans `steps` evenly spaced angles `k·π/steps`, `k = 0..steps`, and
/// returns the one with the largest projected variance (the first one on
/// ties).
///
/// # Convergence
/// The exact angle lies within half a grid cell of some grid angle, so
/// `angular_distance(brute.angle, exact.angle) ≤ π/steps` whenever the
/// dominant eigenvalue is strictly larger than the second.
///
/// # Errors
/// [`Field::Steps`] when `steps == 0`.
pub fn find_max_variance_brute_force(
    points: &[Point2D],
    steps: usize,
) -> Result<BruteForceDirection, ValidationError> {
    if steps == 0 {
        return Err(ValidationError::new(
            Field::Steps,
            0.0,
            "brute-force search needs at least one angle",
        ));
    }

    let mut best = BruteForceDirection {
        angle: 0.0,
        variance: f64::NEG_INFINITY,
    };
    for k in 0..steps {
        let angle = k as f64 * PI / steps as f64;
        let variance = variance_along_direction(points, angle).variance;
        if variance > best.variance {
            best = BruteForceDirection { angle, variance };
        }
    }
    Ok(best)
}
