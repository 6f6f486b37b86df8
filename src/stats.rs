//! Summary statistics for sweep outcomes.
//!
//! Monte Carlo runs reduce thousands of power values to a handful of
//! numbers. The reductions here are numerically stable and allocation-free
//! except where sorting is unavoidable.
//!
//! # Algorithms
//!
//! - **Mean**: Kahan compensated summation.
//! - **Variance/StdDev**: Welford's online algorithm.
//!   Reference: Welford (1962), "Note on a Method for Calculating
//!   Corrected Sums of Squares and Products", *Technometrics* 4(3).
//! - **Percentiles**: R-7 linear interpolation (default in R, NumPy, Excel).
//!   Reference: Hyndman & Fan (1996), "Sample Quantiles in Statistical
//!   Packages", *The American Statistician* 50(4).

use serde::{Deserialize, Serialize};

/// Kahan compensated sum.
///
/// # Examples
/// ```
/// use u_power::stats::kahan_sum;
/// let v = vec![0.1; 10];
/// assert!((kahan_sum(&v) - 1.0).abs() < 1e-15);
/// ```
pub fn kahan_sum(data: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut compensation = 0.0;
    for &x in data {
        let y = x - compensation;
        let t = sum + y;
        compensation = (t - sum) - y;
        sum = t;
    }
    sum
}

/// Arithmetic mean via [`kahan_sum`].
///
/// # Returns
/// - `None` if `data` is empty or contains NaN/Inf.
pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() || !data.iter().all(|x| x.is_finite()) {
        return None;
    }
    Some(kahan_sum(data) / data.len() as f64)
}

/// Computes the `p`-th quantile of **pre-sorted** data (R-7 method).
///
/// The caller guarantees `sorted_data` is sorted in non-decreasing order.
///
/// # Returns
/// - `None` if `sorted_data` is empty or `p` is outside `[0, 1]`.
///
/// # Examples
/// ```
/// use u_power::stats::quantile_sorted;
/// let data = [1.0, 2.0, 3.0, 4.0, 5.0];
/// assert_eq!(quantile_sorted(&data, 0.0), Some(1.0));
/// assert_eq!(quantile_sorted(&data, 0.5), Some(3.0));
/// assert_eq!(quantile_sorted(&data, 0.25), Some(2.0));
/// ```
pub fn quantile_sorted(sorted_data: &[f64], p: f64) -> Option<f64> {
    let n = sorted_data.len();
    if n == 0 || !(0.0..=1.0).contains(&p) {
        return None;
    }
    if n == 1 {
        return Some(sorted_data[0]);
    }

    let h = (n - 1) as f64 * p;
    let j = h.floor() as usize;
    let g = h - h.floor();

    if j + 1 >= n {
        Some(sorted_data[n - 1])
    } else {
        Some((1.0 - g) * sorted_data[j] + g * sorted_data[j + 1])
    }
}

/// Sorts a copy of `data`, dropping NaN values.
pub(crate) fn sorted_finite(data: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = data.iter().copied().filter(|x| !x.is_nan()).collect();
    sorted.sort_unstable_by(f64::total_cmp);
    sorted
}

/// Streaming mean and variance (Welford).
///
/// # Examples
/// ```
/// use u_power::stats::WelfordAccumulator;
/// let mut acc = WelfordAccumulator::new();
/// for &x in &[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
///     acc.update(x);
/// }
/// assert!((acc.mean().unwrap() - 5.0).abs() < 1e-15);
/// assert!((acc.sample_variance().unwrap() - 4.571428571428571).abs() < 1e-10);
/// ```
#[derive(Debug, Clone, Default)]
pub struct WelfordAccumulator {
    count: u64,
    mean_acc: f64,
    m2: f64,
}

impl WelfordAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean_acc;
        self.mean_acc += delta / self.count as f64;
        self.m2 += delta * (value - self.mean_acc);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean_acc)
    }

    /// Sample variance (n − 1 denominator); `None` below two samples.
    pub fn sample_variance(&self) -> Option<f64> {
        (self.count >= 2).then(|| self.m2 / (self.count - 1) as f64)
    }

    /// Population variance (n denominator); `None` when empty.
    pub fn population_variance(&self) -> Option<f64> {
        (self.count > 0).then(|| self.m2 / self.count as f64)
    }

    pub fn sample_std_dev(&self) -> Option<f64> {
        self.sample_variance().map(f64::sqrt)
    }
}

// ============================================================================
// Histogram
// ============================================================================

/// Fixed-bin-count histogram over a closed interval `[lo, hi]`.
///
/// Bins are equal width; the last bin includes `hi`. Values outside the
/// interval are counted in [`Histogram::out_of_range`], not in a bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    /// `bins + 1` ascending bin edges.
    pub edges: Vec<f64>,
    pub counts: Vec<u64>,
    pub out_of_range: u64,
}

impl Histogram {
    /// Builds an empty histogram.
    ///
    /// # Returns
    /// - `None` if `bins == 0`, `lo >= hi`, or a bound is not finite.
    ///
    /// # Examples
    /// ```
    /// use u_power::stats::Histogram;
    /// let mut h = Histogram::new(0.0, 1.0, 4).unwrap();
    /// for &x in &[0.1, 0.3, 0.3, 1.0] {
    ///     h.add(x);
    /// }
    /// assert_eq!(h.counts, vec![1, 2, 0, 1]);
    /// ```
    pub fn new(lo: f64, hi: f64, bins: usize) -> Option<Self> {
        if bins == 0 || !lo.is_finite() || !hi.is_finite() || lo >= hi {
            return None;
        }
        let width = (hi - lo) / bins as f64;
        let mut edges: Vec<f64> = (0..bins).map(|i| lo + i as f64 * width).collect();
        edges.push(hi);
        Some(Self {
            edges,
            counts: vec![0; bins],
            out_of_range: 0,
        })
    }

    pub fn add(&mut self, value: f64) {
        let bins = self.counts.len();
        let lo = self.edges[0];
        let hi = self.edges[bins];
        if !(lo..=hi).contains(&value) {
            self.out_of_range += 1;
            return;
        }
        let idx = (((value - lo) / (hi - lo)) * bins as f64) as usize;
        self.counts[idx.min(bins - 1)] += 1;
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum::<u64>() + self.out_of_range
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_basic() {
        assert_eq!(mean(&[1.0, 2.0, 3.0, 4.0]), Some(2.5));
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, f64::NAN]), None);
    }

    #[test]
    fn test_kahan_beats_naive() {
        let data: Vec<f64> = std::iter::once(1.0)
            .chain(std::iter::repeat(1e-16).take(10_000))
            .collect();
        let compensated = kahan_sum(&data);
        assert!((compensated - (1.0 + 1e-12)).abs() < 1e-15);
    }

    #[test]
    fn test_quantile_sorted_interpolates() {
        let data = [10.0, 20.0, 30.0, 40.0];
        // h = 3 * 0.5 = 1.5 → halfway between 20 and 30
        assert_eq!(quantile_sorted(&data, 0.5), Some(25.0));
        assert_eq!(quantile_sorted(&data, 1.0), Some(40.0));
        assert_eq!(quantile_sorted(&data, 1.5), None);
        assert_eq!(quantile_sorted(&[], 0.5), None);
        assert_eq!(quantile_sorted(&[7.0], 0.9), Some(7.0));
    }

    #[test]
    fn test_sorted_finite_drops_nan() {
        let sorted = sorted_finite(&[3.0, f64::NAN, 1.0, 2.0]);
        assert_eq!(sorted, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_welford_small_counts() {
        let mut acc = WelfordAccumulator::new();
        assert_eq!(acc.mean(), None);
        acc.update(3.0);
        assert_eq!(acc.mean(), Some(3.0));
        assert_eq!(acc.sample_variance(), None);
        assert_eq!(acc.population_variance(), Some(0.0));
        acc.update(5.0);
        assert_eq!(acc.count(), 2);
        assert!((acc.sample_variance().unwrap() - 2.0).abs() < 1e-15);
    }

    #[test]
    fn test_histogram_edges() {
        let h = Histogram::new(0.0, 1.0, 5).unwrap();
        assert_eq!(h.edges.len(), 6);
        assert!((h.edges[1] - 0.2).abs() < 1e-15);
        assert_eq!(h.edges[5], 1.0);
    }

    #[test]
    fn test_histogram_out_of_range() {
        let mut h = Histogram::new(0.0, 1.0, 2).unwrap();
        h.add(-0.5);
        h.add(1.5);
        h.add(0.5);
        assert_eq!(h.counts, vec![0, 1]);
        assert_eq!(h.out_of_range, 2);
        assert_eq!(h.total(), 3);
    }

    #[test]
    fn test_histogram_invalid() {
        assert!(Histogram::new(0.0, 1.0, 0).is_none());
        assert!(Histogram::new(1.0, 1.0, 3).is_none());
        assert!(Histogram::new(f64::NAN, 1.0, 3).is_none());
    }
}
