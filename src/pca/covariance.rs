//! Two-dimensional points and their population covariance.

use serde::{Deserialize, Serialize};

use super::eigen::{self, Eigendecomposition2D, EigenPair, UnitVector2D};

/// A sample observation in two dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Centroid of `points`, or the origin for an empty slice.
    pub fn centroid(points: &[Point2D]) -> Point2D {
        if points.is_empty() {
            return Point2D::new(0.0, 0.0);
        }
        let n = points.len() as f64;
        let (sx, sy) = points
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        Point2D::new(sx / n, sy / n)
    }

    /// `points` shifted so their centroid sits at the origin.
    pub fn centered(points: &[Point2D]) -> Vec<Point2D> {
        let c = Point2D::centroid(points);
        points
            .iter()
            .map(|p| Point2D::new(p.x - c.x, p.y - c.y))
            .collect()
    }
}

/// Symmetric 2×2 population covariance matrix `[[xx, xy], [xy, yy]]`.
///
/// Built by [`covariance`], it satisfies `xx ≥ 0`, `yy ≥ 0` and
/// `xy² ≤ xx·yy` up to rounding.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CovarianceMatrix2D {
    pub xx: f64,
    pub yy: f64,
    pub xy: f64,
}

impl CovarianceMatrix2D {
    pub const fn new(xx: f64, yy: f64, xy: f64) -> Self {
        Self { xx, yy, xy }
    }

    /// Total variance `xx + yy`.
    pub fn trace(&self) -> f64 {
        self.xx + self.yy
    }

    pub fn determinant(&self) -> f64 {
        self.xx * self.yy - self.xy * self.xy
    }

    /// Closed-form eigendecomposition.
    ///
    /// A near-isotropic matrix (`xy ≈ 0` and `xx ≈ yy`) has a repeated
    /// eigenvalue and every unit vector is an eigenvector; the standard
    /// basis is returned directly in that case. Otherwise both eigenvalues
    /// come from [`eigen::eigenvalues`] and each eigenvector from
    /// [`eigen::eigenvector`].
    ///
    /// # Examples
    /// ```
    /// use u_power::pca::CovarianceMatrix2D;
    /// let eig = CovarianceMatrix2D::new(4.0, 1.0, 0.0).decompose();
    /// assert_eq!(eig.lambda1(), 4.0);
    /// assert_eq!(eig.lambda2(), 1.0);
    /// assert_eq!(eig.v1().x().abs(), 1.0);
    /// ```
    pub fn decompose(&self) -> Eigendecomposition2D {
        let (a, b, d) = (self.xx, self.xy, self.yy);
        let tol = eigen::tolerance(a, b, b, d);

        if b.abs() <= tol && (a - d).abs() <= tol {
            let lambda = (a + d) / 2.0;
            return Eigendecomposition2D::new(
                EigenPair::new(lambda, UnitVector2D::E1),
                EigenPair::new(lambda, UnitVector2D::E2),
            );
        }

        let (lambda1, lambda2) = eigen::eigenvalues(a, b, b, d);
        let v1 = eigen::eigenvector(a, b, b, d, lambda1);
        let mut v2 = eigen::eigenvector(a, b, b, d, lambda2);
        if v1.dot(&v2).abs() > eigen::ORTHOGONALITY_TOL {
            // Repeated root from a clamped discriminant: both solves found
            // the same direction.
            v2 = v1.perpendicular();
        }
        Eigendecomposition2D::new(EigenPair::new(lambda1, v1), EigenPair::new(lambda2, v2))
    }
}

/// Population covariance (divisor `n`) of `points`.
///
/// An empty slice yields the zero matrix.
///
/// # Examples
/// ```
/// use u_power::pca::{covariance, Point2D};
/// let pts = [
///     Point2D::new(1.0, 0.0),
///     Point2D::new(0.0, 1.0),
///     Point2D::new(-1.0, 0.0),
///     Point2D::new(0.0, -1.0),
/// ];
/// let cov = covariance(&pts);
/// assert_eq!((cov.xx, cov.yy, cov.xy), (0.5, 0.5, 0.0));
/// ```
pub fn covariance(points: &[Point2D]) -> CovarianceMatrix2D {
    if points.is_empty() {
        return CovarianceMatrix2D::default();
    }
    let n = points.len() as f64;
    let c = Point2D::centroid(points);
    let (sxx, syy, sxy) = points.iter().fold((0.0, 0.0, 0.0), |(sxx, syy, sxy), p| {
        let dx = p.x - c.x;
        let dy = p.y - c.y;
        (sxx + dx * dx, syy + dy * dy, sxy + dx * dy)
    });
    CovarianceMatrix2D::new(sxx / n, syy / n, sxy / n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_zero_matrix() {
        assert_eq!(covariance(&[]), CovarianceMatrix2D::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn test_single_point_has_zero_variance() {
        let cov = covariance(&[Point2D::new(3.0, -2.0)]);
        assert_eq!(cov, CovarianceMatrix2D::default());
    }

    #[test]
    fn test_population_divisor() {
        // x = [0, 2] → mean 1, deviations ±1, population variance 1.
        let cov = covariance(&[Point2D::new(0.0, 0.0), Point2D::new(2.0, 4.0)]);
        assert!((cov.xx - 1.0).abs() < 1e-15);
        assert!((cov.yy - 4.0).abs() < 1e-15);
        assert!((cov.xy - 2.0).abs() < 1e-15);
    }

    #[test]
    fn test_translation_invariant() {
        let pts = [
            Point2D::new(1.0, 2.0),
            Point2D::new(3.0, 1.0),
            Point2D::new(-2.0, 0.5),
        ];
        let shifted: Vec<Point2D> = pts
            .iter()
            .map(|p| Point2D::new(p.x + 100.0, p.y - 50.0))
            .collect();
        let a = covariance(&pts);
        let b = covariance(&shifted);
        assert!((a.xx - b.xx).abs() < 1e-10);
        assert!((a.yy - b.yy).abs() < 1e-10);
        assert!((a.xy - b.xy).abs() < 1e-10);
    }

    #[test]
    fn test_centered_has_zero_centroid() {
        let pts = [Point2D::new(1.0, 5.0), Point2D::new(3.0, 9.0)];
        let c = Point2D::centroid(&Point2D::centered(&pts));
        assert_eq!(c, Point2D::new(0.0, 0.0));
    }

    #[test]
    fn test_isotropic_four_points() {
        let pts = [
            Point2D::new(1.0, 0.0),
            Point2D::new(0.0, 1.0),
            Point2D::new(-1.0, 0.0),
            Point2D::new(0.0, -1.0),
        ];
        let eig = covariance(&pts).decompose();
        assert_eq!(eig.lambda1(), 0.5);
        assert_eq!(eig.lambda2(), 0.5);
        assert!(eig.v1().dot(&eig.v2()).abs() < 1e-15);
    }

    #[test]
    fn test_zero_matrix_decomposes_to_standard_basis() {
        let eig = CovarianceMatrix2D::default().decompose();
        assert_eq!(eig.lambda1(), 0.0);
        assert_eq!(eig.v1(), UnitVector2D::E1);
        assert_eq!(eig.v2(), UnitVector2D::E2);
    }
}
