//! # u-power
//!
//! Numerical kernel for statistical power analysis and 2-D PCA teaching
//! views.
//!
//! This crate holds the math that the panels of a study-design tool share.
//! It knows nothing about forms, charts, export formats or HTTP; callers
//! pass parameters in and render the immutable results that come back.
//!
//! ## Modules
//!
//! - [`special`]: Standard normal CDF, PDF and quantile approximations
//! - [`power`]: Power, sample size and minimum detectable effect
//! - [`pca`]: 2×2 covariance eigendecomposition and the direction of
//!   maximum variance
//! - [`sensitivity`]: One-way, two-way and Monte Carlo sensitivity of power
//! - [`distributions`]: Normal, uniform and beta sampling distributions
//! - [`random`]: Seeded generators and primitive samplers
//! - [`stats`]: Kahan/Welford accumulation, percentiles, histograms
//! - [`error`]: Field-tagged validation errors
//!
//! ## Design Philosophy
//!
//! - **Validate before computing**: out-of-domain input is reported with
//!   the offending field, never turned into a NaN
//! - **Injected randomness**: no global generator; equal seeds give equal
//!   results
//! - **Property-based testing**: Mathematical invariants verified via proptest
//!
//! ## Example
//!
//! ```
//! use u_power::power::{compute_power, compute_sample_size, TestDesign, TestParameters};
//!
//! let params = TestParameters::new(TestDesign::TwoSampleIndependent)
//!     .with_alpha(0.05)
//!     .with_power(0.8)
//!     .with_effect_size(0.5);
//! let n = compute_sample_size(&params).unwrap();
//! assert_eq!(n.per_group, 63);
//!
//! let achieved = compute_power(&params.with_sample_size(n.per_group)).unwrap();
//! assert!(achieved.power >= 0.8);
//! ```

pub mod distributions;
pub mod error;
pub mod pca;
pub mod power;
pub mod random;
pub mod sensitivity;
pub mod special;
pub mod stats;

pub use error::{Field, ValidationError};
