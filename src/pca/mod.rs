//! Two-dimensional principal component analysis.
//!
//! The teaching core of PCA: build the 2×2 population covariance of a point
//! cloud, decompose it in closed form, and report the direction of maximum
//! variance both exactly and by brute-force angular search.
//!
//! # Degenerate input
//!
//! Empty point sets, single points and zero-variance data never fail. They
//! resolve to the zero covariance matrix and the standard basis.

mod covariance;
mod direction;
mod eigen;

pub use covariance::{covariance, CovarianceMatrix2D, Point2D};
pub use direction::{
    angular_distance, find_max_variance_brute_force, find_max_variance_exact,
    normalize_axis_angle, variance_along_direction, BruteForceDirection, DirectionalVariance,
    MaxVarianceDirection,
};
pub use eigen::{eigenvalues, eigenvector, EigenPair, Eigendecomposition2D, UnitVector2D};
