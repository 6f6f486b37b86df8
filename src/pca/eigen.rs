//! Closed-form eigendecomposition of 2×2 matrices.
//!
//! For `M = [[a, b], [c, d]]` the characteristic polynomial is
//! `λ² − tr(M)·λ + det(M)`, so both eigenvalues follow from the quadratic
//! formula and each eigenvector from one row of `(M − λI)v = 0`.
//!
//! "≈ 0" below means "within [`tolerance`] of zero", a bound relative to
//! the magnitude of the matrix entries so that the same decisions are made
//! for a matrix and any positive multiple of it.

use serde::{Deserialize, Serialize};

use crate::error::{Field, ValidationError};

/// Relative tolerance used for the "≈ 0" decisions.
const RELATIVE_TOL: f64 = 1e-12;

/// Eigenvectors whose dot product exceeds this are treated as parallel.
pub(crate) const ORTHOGONALITY_TOL: f64 = 1e-10;

/// Absolute tolerance for a matrix with the given entries.
pub(crate) fn tolerance(a: f64, b: f64, c: f64, d: f64) -> f64 {
    let scale = a.abs() + b.abs() + c.abs() + d.abs();
    (RELATIVE_TOL * scale).max(f64::MIN_POSITIVE)
}

/// Unit-length 2-D direction.
///
/// Only constructed through [`UnitVector2D::new`] (which normalises),
/// the basis constants, or [`UnitVector2D::from_angle`], so the length is
/// always 1 up to rounding. Deserialisation goes through the same
/// normalisation and rejects the zero vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawVector2D")]
pub struct UnitVector2D {
    x: f64,
    y: f64,
}

impl UnitVector2D {
    /// `(1, 0)`
    pub const E1: UnitVector2D = UnitVector2D { x: 1.0, y: 0.0 };
    /// `(0, 1)`
    pub const E2: UnitVector2D = UnitVector2D { x: 0.0, y: 1.0 };

    /// Normalises `(x, y)`; `None` when its length is zero or not finite.
    pub fn new(x: f64, y: f64) -> Option<Self> {
        let norm = x.hypot(y);
        if norm.is_finite() && norm > 0.0 {
            Some(Self {
                x: x / norm,
                y: y / norm,
            })
        } else {
            None
        }
    }

    /// `(cos θ, sin θ)`
    pub fn from_angle(angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self { x: cos, y: sin }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn dot(&self, other: &UnitVector2D) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// The vector rotated by +90°.
    pub fn perpendicular(&self) -> Self {
        Self {
            x: -self.y,
            y: self.x,
        }
    }

    /// `atan2(y, x)`, in `(−π, π]`.
    pub fn angle(&self) -> f64 {
        self.y.atan2(self.x)
    }
}

#[derive(Deserialize)]
struct RawVector2D {
    x: f64,
    y: f64,
}

impl TryFrom<RawVector2D> for UnitVector2D {
    type Error = ValidationError;

    fn try_from(raw: RawVector2D) -> Result<Self, Self::Error> {
        UnitVector2D::new(raw.x, raw.y).ok_or_else(|| {
            ValidationError::new(
                Field::Direction,
                raw.x.hypot(raw.y),
                "vector length must be finite and > 0",
            )
        })
    }
}

/// An eigenvalue with its unit eigenvector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EigenPair {
    pub value: f64,
    pub vector: UnitVector2D,
}

impl EigenPair {
    pub fn new(value: f64, vector: UnitVector2D) -> Self {
        Self { value, vector }
    }
}

/// Eigendecomposition of a symmetric 2×2 matrix, dominant pair first.
///
/// Invariants: `lambda1 ≥ lambda2`, `v1 ⊥ v2`, `λ1 + λ2 = trace` and
/// `λ1·λ2 = det` to rounding. Deserialised pairs are re-ordered so the
/// first invariant holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawEigendecomposition2D")]
pub struct Eigendecomposition2D {
    first: EigenPair,
    second: EigenPair,
}

#[derive(Deserialize)]
struct RawEigendecomposition2D {
    first: EigenPair,
    second: EigenPair,
}

impl From<RawEigendecomposition2D> for Eigendecomposition2D {
    fn from(raw: RawEigendecomposition2D) -> Self {
        Eigendecomposition2D::new(raw.first, raw.second)
    }
}

impl Eigendecomposition2D {
    /// Orders the two pairs so the larger eigenvalue comes first.
    pub(crate) fn new(a: EigenPair, b: EigenPair) -> Self {
        if a.value >= b.value {
            Self {
                first: a,
                second: b,
            }
        } else {
            Self {
                first: b,
                second: a,
            }
        }
    }

    pub fn lambda1(&self) -> f64 {
        self.first.value
    }

    pub fn lambda2(&self) -> f64 {
        self.second.value
    }

    pub fn v1(&self) -> UnitVector2D {
        self.first.vector
    }

    pub fn v2(&self) -> UnitVector2D {
        self.second.vector
    }

    pub fn first(&self) -> EigenPair {
        self.first
    }

    pub fn second(&self) -> EigenPair {
        self.second
    }

    /// Share of the total variance carried by the first component,
    /// `λ1 / (λ1 + λ2)`; `None` when the total is zero.
    pub fn explained_variance_ratio(&self) -> Option<f64> {
        let total = self.first.value + self.second.value;
        (total > 0.0).then(|| self.first.value / total)
    }
}

/// Eigenvalues of `[[a, b], [c, d]]`, larger first.
///
/// The discriminant `trace² − 4·det` is evaluated as `(a − d)² + 4·b·c`,
/// which is the same polynomial without the cancellation that wipes out
/// the spread of nearly isotropic matrices. It is negative only for
/// non-symmetric input (complex pair); it is then clamped to zero, which
/// yields the repeated root `trace/2`.
///
/// # Examples
/// ```
/// use u_power::pca::eigenvalues;
/// assert_eq!(eigenvalues(2.0, 1.0, 1.0, 2.0), (3.0, 1.0));
/// // Rotation matrix: complex pair, clamped to the real part.
/// assert_eq!(eigenvalues(0.0, -1.0, 1.0, 0.0), (0.0, 0.0));
/// ```
pub fn eigenvalues(a: f64, b: f64, c: f64, d: f64) -> (f64, f64) {
    let trace = a + d;
    let spread = a - d;
    let disc = spread * spread + 4.0 * b * c;
    if disc < 0.0 {
        let root = trace / 2.0;
        return (root, root);
    }
    let sqrt_disc = disc.sqrt();
    ((trace + sqrt_disc) / 2.0, (trace - sqrt_disc) / 2.0)
}

/// Unit eigenvector of `[[a, b], [c, d]]` for eigenvalue `lambda`.
///
/// - Diagonal matrix (both off-diagonals ≈ 0): the basis vector whose
///   diagonal entry is closer to `lambda`.
/// - Otherwise solve the row of `M − λI` with the larger coefficients:
///   `(a−λ)x + b·y = 0` gives `(b, λ−a)`, `c·x + (d−λ)y = 0` gives
///   `(λ−d, c)`.
/// - A solution of length ≈ 0 falls back to `(1, 0)`.
///
/// # Examples
/// ```
/// use u_power::pca::eigenvector;
/// let v = eigenvector(2.0, 1.0, 1.0, 2.0, 3.0);
/// assert!((v.x() - v.y()).abs() < 1e-15);
/// assert!((v.x() - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-15);
/// ```
pub fn eigenvector(a: f64, b: f64, c: f64, d: f64, lambda: f64) -> UnitVector2D {
    let tol = tolerance(a, b, c, d);

    if b.abs() <= tol && c.abs() <= tol {
        return if (a - lambda).abs() <= (d - lambda).abs() {
            UnitVector2D::E1
        } else {
            UnitVector2D::E2
        };
    }

    let row1 = (a - lambda).hypot(b);
    let row2 = c.hypot(d - lambda);
    let (x, y) = if row1 >= row2 {
        (b, lambda - a)
    } else {
        (lambda - d, c)
    };

    if x.hypot(y) <= tol {
        return UnitVector2D::E1;
    }
    UnitVector2D::new(x, y).unwrap_or(UnitVector2D::E1)
}
