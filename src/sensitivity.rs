//! Sensitivity analysis of statistical power.
//!
//! Three ways to ask "how fragile is this design?":
//!
//! - [`one_way`]: sweep each parameter over a grid with the others held at
//!   the base value. Sorted by impact, the result is a tornado diagram.
//! - [`two_way`]: a grid over two parameters at once (a heat map).
//! - [`monte_carlo`]: draw uncertain parameters from distributions and
//!   summarise the resulting power distribution.
//!
//! The outcome is always [`compute_power`]. Every evaluated point goes
//! through the power model's validation, so an out-of-domain grid value is
//! reported with the offending field rather than producing a NaN.
//!
//! # Reproducibility
//!
//! Monte Carlo never touches a global generator. The caller injects the RNG;
//! draws happen in [`Parameter`] order (the distributions live in a
//! `BTreeMap`), so the same seed yields the same result regardless of how
//! the run is chunked.

use std::collections::BTreeMap;
use std::ops::ControlFlow;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::distributions::Distribution;
use crate::error::{Field, ValidationError};
use crate::power::{compute_power, TestDesign, TestParameters};
use crate::random::create_rng;
use crate::stats::{quantile_sorted, sorted_finite, Histogram, WelfordAccumulator};

/// Distance kept from an open domain boundary when clamping random draws.
const DOMAIN_MARGIN: f64 = 1e-6;

/// Largest grid a single range may request.
pub const MAX_RANGE_STEPS: usize = 1_000_000;

/// Largest Monte Carlo run; outcomes are kept in memory for percentiles.
pub const MAX_ITERATIONS: usize = 100_000_000;

// ============================================================================
// Parameters and ranges
// ============================================================================

/// Input of the power model that a sweep can vary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Parameter {
    Alpha,
    EffectSize,
    /// Rounded to the nearest integer before evaluation.
    SampleSize,
    AllocationRatio,
}

impl Parameter {
    /// Current value of this parameter in `params`.
    pub fn value_in(self, params: &TestParameters) -> f64 {
        match self {
            Parameter::Alpha => params.alpha,
            Parameter::EffectSize => params.effect_size,
            Parameter::SampleSize => params.sample_size as f64,
            Parameter::AllocationRatio => params.allocation_ratio,
        }
    }

    /// Copy of `base` with this parameter set to `value`.
    ///
    /// # Examples
    /// ```
    /// use u_power::power::{TestDesign, TestParameters};
    /// use u_power::sensitivity::Parameter;
    /// let base = TestParameters::new(TestDesign::OneSample);
    /// assert_eq!(Parameter::SampleSize.apply(&base, 41.6).sample_size, 42);
    /// ```
    pub fn apply(self, base: &TestParameters, value: f64) -> TestParameters {
        match self {
            Parameter::Alpha => base.with_alpha(value),
            Parameter::EffectSize => base.with_effect_size(value),
            // Negative values saturate to 0, which the power model rejects.
            Parameter::SampleSize => base.with_sample_size(value.round() as u64),
            Parameter::AllocationRatio => base.with_allocation_ratio(value),
        }
    }

    /// Pulls a random draw into the domain the power model accepts.
    fn clamp_into_domain(self, base: &TestParameters, value: f64) -> f64 {
        match self {
            Parameter::Alpha => value.clamp(DOMAIN_MARGIN, 1.0 - DOMAIN_MARGIN),
            Parameter::EffectSize => match base.design {
                TestDesign::Correlation => {
                    let r = value.clamp(-(1.0 - DOMAIN_MARGIN), 1.0 - DOMAIN_MARGIN);
                    if r.abs() < DOMAIN_MARGIN {
                        DOMAIN_MARGIN
                    } else {
                        r
                    }
                }
                _ => value.max(DOMAIN_MARGIN),
            },
            Parameter::SampleSize => value.max(base.min_sample_size() as f64),
            Parameter::AllocationRatio => value.max(DOMAIN_MARGIN),
        }
    }
}

/// Grid over one parameter: `steps + 1` evenly spaced values from `min` to
/// `max` inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensitivityRange {
    pub parameter: Parameter,
    pub min: f64,
    pub max: f64,
    pub steps: usize,
    /// Ranges with `vary == false` are kept at the base value and skipped.
    pub vary: bool,
}

impl SensitivityRange {
    /// A varying range.
    pub fn new(parameter: Parameter, min: f64, max: f64, steps: usize) -> Self {
        Self {
            parameter,
            min,
            max,
            steps,
            vary: true,
        }
    }

    /// Same range, excluded from sweeps.
    pub fn fixed(self) -> Self {
        Self {
            vary: false,
            ..self
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for &bound in &[self.min, self.max] {
            if !bound.is_finite() {
                return Err(ValidationError::new(
                    Field::Range,
                    bound,
                    "range bounds must be finite",
                ));
            }
        }
        if self.min > self.max {
            return Err(ValidationError::new(
                Field::Range,
                self.min,
                "range minimum exceeds maximum",
            ));
        }
        if self.steps == 0 {
            return Err(ValidationError::new(
                Field::Steps,
                0.0,
                "a range needs at least one step",
            ));
        }
        if self.steps > MAX_RANGE_STEPS {
            return Err(ValidationError::new(
                Field::Steps,
                self.steps as f64,
                "a range may have at most 1,000,000 steps",
            ));
        }
        Ok(())
    }

    /// Grid values, unvalidated. The last value is exactly `max`.
    pub fn grid(&self) -> Vec<f64> {
        let width = (self.max - self.min) / self.steps as f64;
        let mut values: Vec<f64> = (0..self.steps)
            .map(|i| self.min + i as f64 * width)
            .collect();
        values.push(self.max);
        values
    }
}

// ============================================================================
// One-way and two-way sweeps
// ============================================================================

/// Power along one parameter's grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityResult {
    pub parameter: Parameter,
    /// Values actually evaluated (rounded for [`Parameter::SampleSize`]).
    pub values: Vec<f64>,
    /// Power at each value.
    pub outcomes: Vec<f64>,
    /// `max(outcomes) − min(outcomes)`.
    pub impact: f64,
}

/// Power over the grid of two parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwoWayResult {
    pub row_parameter: Parameter,
    pub column_parameter: Parameter,
    pub row_values: Vec<f64>,
    pub column_values: Vec<f64>,
    /// `outcomes[i][j]` is the power at `row_values[i]`, `column_values[j]`.
    pub outcomes: Vec<Vec<f64>>,
}

fn power_at(params: &TestParameters) -> Result<f64, ValidationError> {
    compute_power(params).map(|r| r.power)
}

/// Sweeps `range` with everything else at `base`.
fn sweep(
    base: &TestParameters,
    range: &SensitivityRange,
) -> Result<SensitivityResult, ValidationError> {
    range.validate()?;
    let mut values = Vec::with_capacity(range.steps + 1);
    let mut outcomes = Vec::with_capacity(range.steps + 1);
    for value in range.grid() {
        let params = range.parameter.apply(base, value);
        outcomes.push(power_at(&params)?);
        values.push(range.parameter.value_in(&params));
    }
    let (lo, hi) = outcomes
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &o| (lo.min(o), hi.max(o)));
    trace!(parameter = ?range.parameter, impact = hi - lo, "swept parameter");
    Ok(SensitivityResult {
        parameter: range.parameter,
        values,
        outcomes,
        impact: hi - lo,
    })
}

/// One-way sensitivity: each varying range swept on its own.
///
/// Results are sorted by impact, largest first. The sort is stable, so
/// ranges with equal impact keep their input order. Ranges with
/// `vary == false` are skipped entirely.
///
/// # Errors
/// The first invalid range ([`Field::Range`], [`Field::Steps`]) or the
/// first grid point the power model rejects.
///
/// # Examples
/// ```
/// use u_power::power::{TestDesign, TestParameters};
/// use u_power::sensitivity::{one_way, Parameter, SensitivityRange};
///
/// let base = TestParameters::new(TestDesign::TwoSampleIndependent).with_sample_size(64);
/// let results = one_way(&base, &[
///     SensitivityRange::new(Parameter::Alpha, 0.04, 0.06, 4),
///     SensitivityRange::new(Parameter::EffectSize, 0.2, 0.8, 6),
/// ]).unwrap();
/// assert_eq!(results[0].parameter, Parameter::EffectSize);
/// assert_eq!(results[0].values.len(), 7);
/// ```
pub fn one_way(
    base: &TestParameters,
    ranges: &[SensitivityRange],
) -> Result<Vec<SensitivityResult>, ValidationError> {
    debug!(ranges = ranges.len(), "one-way sensitivity sweep");
    let mut results = ranges
        .iter()
        .filter(|r| r.vary)
        .map(|r| sweep(base, r))
        .collect::<Result<Vec<_>, _>>()?;
    results.sort_by(|a, b| b.impact.total_cmp(&a.impact));
    debug!(results = results.len(), "one-way sensitivity sweep finished");
    Ok(results)
}

/// Two-way sensitivity over the first two varying ranges.
///
/// Returns `Ok(None)` when fewer than two ranges vary.
pub fn two_way(
    base: &TestParameters,
    ranges: &[SensitivityRange],
) -> Result<Option<TwoWayResult>, ValidationError> {
    let mut varying = ranges.iter().filter(|r| r.vary);
    let (rows, columns) = match (varying.next(), varying.next()) {
        (Some(rows), Some(columns)) => (rows, columns),
        _ => return Ok(None),
    };
    rows.validate()?;
    columns.validate()?;
    debug!(
        rows = ?rows.parameter,
        columns = ?columns.parameter,
        "two-way sensitivity sweep"
    );

    let row_grid = rows.grid();
    let column_grid = columns.grid();
    let mut row_values = Vec::with_capacity(row_grid.len());
    let mut column_values = Vec::with_capacity(column_grid.len());
    let mut outcomes = Vec::with_capacity(row_grid.len());

    for (i, &row) in row_grid.iter().enumerate() {
        let row_base = rows.parameter.apply(base, row);
        row_values.push(rows.parameter.value_in(&row_base));
        let mut line = Vec::with_capacity(column_grid.len());
        for &column in &column_grid {
            let params = columns.parameter.apply(&row_base, column);
            if i == 0 {
                column_values.push(columns.parameter.value_in(&params));
            }
            line.push(power_at(&params)?);
        }
        trace!(row = i, value = row_values[i], "two-way row evaluated");
        outcomes.push(line);
    }

    Ok(Some(TwoWayResult {
        row_parameter: rows.parameter,
        column_parameter: columns.parameter,
        row_values,
        column_values,
        outcomes,
    }))
}

// ============================================================================
// Monte Carlo
// ============================================================================

/// Errors of a Monte Carlo run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SensitivityError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("monte carlo run cancelled after {completed} iterations")]
    Cancelled { completed: usize },
}

/// Monte Carlo settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloConfig {
    /// Number of draws. Default: 10,000.
    pub iterations: usize,
    /// Bins of the power histogram over `[0, 1]`. Default: 20.
    pub histogram_bins: usize,
    /// Power level whose exceedance probability is reported. Default: 0.8.
    pub threshold: f64,
    /// Iterations between progress callbacks. Default: 1,000.
    pub chunk_size: usize,
    /// Seed for [`monte_carlo_seeded`]. `None` picks a random seed.
    pub seed: Option<u64>,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            iterations: 10_000,
            histogram_bins: 20,
            threshold: 0.8,
            chunk_size: 1_000,
            seed: None,
        }
    }
}

impl MonteCarloConfig {
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.iterations == 0 {
            return Err(ValidationError::new(
                Field::Iterations,
                0.0,
                "monte carlo needs at least one iteration",
            ));
        }
        if self.iterations > MAX_ITERATIONS {
            return Err(ValidationError::new(
                Field::Iterations,
                self.iterations as f64,
                "monte carlo may run at most 100,000,000 iterations",
            ));
        }
        if self.chunk_size == 0 {
            return Err(ValidationError::new(
                Field::Iterations,
                0.0,
                "chunk size must be at least 1",
            ));
        }
        if self.histogram_bins == 0 {
            return Err(ValidationError::new(
                Field::HistogramBins,
                0.0,
                "histogram needs at least one bin",
            ));
        }
        if !(self.threshold.is_finite() && (0.0..=1.0).contains(&self.threshold)) {
            return Err(ValidationError::new(
                Field::Threshold,
                self.threshold,
                "must lie in [0, 1]",
            ));
        }
        Ok(())
    }
}

/// R-7 percentiles of the simulated power.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Percentiles {
    pub p5: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p95: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub mean: f64,
    /// Sample standard deviation; 0 for a single iteration.
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub percentiles: Percentiles,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloResult {
    pub iterations: usize,
    pub summary: SummaryStatistics,
    pub histogram: Histogram,
    pub threshold: f64,
    /// Share of iterations with power ≥ `threshold`.
    pub probability_above_threshold: f64,
    /// Draws that fell outside the power model's domain and were clamped.
    pub clamped_draws: u64,
}

/// Progress report passed to the callback of [`monte_carlo_with_progress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

/// Monte Carlo sensitivity: draws every parameter in `distributions`
/// independently, evaluates power, and summarises.
///
/// Parameters absent from the map stay at `base`. Draws outside the power
/// model's domain (a negative effect size from a normal, say) are clamped
/// to the nearest valid value and counted in
/// [`MonteCarloResult::clamped_draws`].
///
/// # Examples
/// ```
/// use std::collections::BTreeMap;
/// use u_power::distributions::Distribution;
/// use u_power::power::{TestDesign, TestParameters};
/// use u_power::random::create_rng;
/// use u_power::sensitivity::{monte_carlo, MonteCarloConfig, Parameter};
///
/// let base = TestParameters::new(TestDesign::TwoSampleIndependent).with_sample_size(64);
/// let mut dists = BTreeMap::new();
/// dists.insert(Parameter::EffectSize, Distribution::normal(0.5, 0.1).unwrap());
/// let config = MonteCarloConfig::default().with_iterations(2_000);
///
/// let result = monte_carlo(&base, &dists, &config, &mut create_rng(42)).unwrap();
/// assert_eq!(result.histogram.total(), 2_000);
/// assert!((result.summary.percentiles.p50 - 0.8).abs() < 0.05);
/// ```
pub fn monte_carlo<R: Rng + ?Sized>(
    base: &TestParameters,
    distributions: &BTreeMap<Parameter, Distribution>,
    config: &MonteCarloConfig,
    rng: &mut R,
) -> Result<MonteCarloResult, SensitivityError> {
    monte_carlo_with_progress(base, distributions, config, rng, |_| ControlFlow::Continue(()))
}

/// [`monte_carlo`] with a generator built from [`MonteCarloConfig::seed`].
///
/// Without a seed a fresh one is drawn and logged at debug level, so a run
/// can still be replayed.
pub fn monte_carlo_seeded(
    base: &TestParameters,
    distributions: &BTreeMap<Parameter, Distribution>,
    config: &MonteCarloConfig,
) -> Result<MonteCarloResult, SensitivityError> {
    let seed = config.seed.unwrap_or_else(rand::random);
    debug!(seed, "monte carlo seed");
    let mut rng = create_rng(seed);
    monte_carlo(base, distributions, config, &mut rng)
}

/// [`monte_carlo`] in chunks of [`MonteCarloConfig::chunk_size`]
/// iterations, calling `progress` after each chunk.
///
/// Returning `ControlFlow::Break(())` before the last chunk stops the run
/// with [`SensitivityError::Cancelled`]. Chunking does not change the draw
/// sequence: an uncancelled run equals [`monte_carlo`] with the same
/// generator state.
pub fn monte_carlo_with_progress<R, F>(
    base: &TestParameters,
    distributions: &BTreeMap<Parameter, Distribution>,
    config: &MonteCarloConfig,
    rng: &mut R,
    mut progress: F,
) -> Result<MonteCarloResult, SensitivityError>
where
    R: Rng + ?Sized,
    F: FnMut(Progress) -> ControlFlow<()>,
{
    config.validate()?;
    let mut histogram = Histogram::new(0.0, 1.0, config.histogram_bins).ok_or_else(|| {
        ValidationError::new(
            Field::HistogramBins,
            config.histogram_bins as f64,
            "histogram needs at least one bin",
        )
    })?;
    debug!(
        iterations = config.iterations,
        parameters = distributions.len(),
        "monte carlo sensitivity run"
    );

    let mut outcomes = Vec::with_capacity(config.iterations);
    let mut acc = WelfordAccumulator::new();
    let mut clamped_draws = 0_u64;
    let mut above = 0_usize;

    while outcomes.len() < config.iterations {
        let chunk_end = (outcomes.len() + config.chunk_size).min(config.iterations);
        while outcomes.len() < chunk_end {
            let mut params = *base;
            for (&parameter, distribution) in distributions {
                let raw = distribution.sample(rng);
                let value = parameter.clamp_into_domain(base, raw);
                if value != raw {
                    clamped_draws += 1;
                }
                params = parameter.apply(&params, value);
            }
            let power = power_at(&params)?;
            acc.update(power);
            histogram.add(power);
            if power >= config.threshold {
                above += 1;
            }
            outcomes.push(power);
        }

        let completed = outcomes.len();
        trace!(completed, total = config.iterations, "monte carlo chunk done");
        let flow = progress(Progress {
            completed,
            total: config.iterations,
        });
        if flow.is_break() && completed < config.iterations {
            debug!(completed, "monte carlo run cancelled");
            return Err(SensitivityError::Cancelled { completed });
        }
    }

    if clamped_draws > 0 {
        warn!(clamped_draws, "monte carlo draws clamped into the valid domain");
    }

    let sorted = sorted_finite(&outcomes);
    let pct = |p: f64| quantile_sorted(&sorted, p).unwrap_or(f64::NAN);
    let summary = SummaryStatistics {
        mean: acc.mean().unwrap_or(f64::NAN),
        std_dev: acc.sample_std_dev().unwrap_or(0.0),
        min: sorted.first().copied().unwrap_or(f64::NAN),
        max: sorted.last().copied().unwrap_or(f64::NAN),
        percentiles: Percentiles {
            p5: pct(0.05),
            p25: pct(0.25),
            p50: pct(0.50),
            p75: pct(0.75),
            p95: pct(0.95),
        },
    };
    debug!(mean = summary.mean, std_dev = summary.std_dev, "monte carlo run finished");

    Ok(MonteCarloResult {
        iterations: config.iterations,
        summary,
        histogram,
        threshold: config.threshold,
        probability_above_threshold: above as f64 / config.iterations as f64,
        clamped_draws,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::power::Tails;

    fn base() -> TestParameters {
        TestParameters::new(TestDesign::TwoSampleIndependent).with_sample_size(64)
    }

    fn effect_uncertainty() -> BTreeMap<Parameter, Distribution> {
        let mut dists = BTreeMap::new();
        dists.insert(Parameter::EffectSize, Distribution::normal(0.5, 0.15).unwrap());
        dists.insert(Parameter::SampleSize, Distribution::uniform(50.0, 80.0).unwrap());
        dists
    }

    // --- ranges ---

    #[test]
    fn test_grid_endpoints() {
        let r = SensitivityRange::new(Parameter::Alpha, 0.01, 0.1, 3);
        let g = r.grid();
        assert_eq!(g.len(), 4);
        assert_eq!(g[0], 0.01);
        assert_eq!(g[3], 0.1);
        assert!((g[1] - 0.04).abs() < 1e-15);
    }

    #[test]
    fn test_range_validation() {
        let err = SensitivityRange::new(Parameter::Alpha, 0.1, 0.01, 3)
            .validate()
            .unwrap_err();
        assert_eq!(err.field, Field::Range);
        let err = SensitivityRange::new(Parameter::Alpha, 0.01, 0.1, 0)
            .validate()
            .unwrap_err();
        assert_eq!(err.field, Field::Steps);
        let err = SensitivityRange::new(Parameter::Alpha, 0.01, 0.1, usize::MAX)
            .validate()
            .unwrap_err();
        assert_eq!(err.field, Field::Steps);
        assert!(SensitivityRange::new(Parameter::Alpha, 0.01, 0.1, MAX_RANGE_STEPS)
            .validate()
            .is_ok());
        let err = SensitivityRange::new(Parameter::Alpha, f64::NAN, 0.1, 2)
            .validate()
            .unwrap_err();
        assert_eq!(err.field, Field::Range);
        assert!(SensitivityRange::new(Parameter::Alpha, 0.05, 0.05, 1)
            .validate()
            .is_ok());
    }

    // --- one_way ---

    #[test]
    fn test_one_way_sorted_by_impact() {
        let ranges = [
            SensitivityRange::new(Parameter::Alpha, 0.04, 0.06, 2),
            SensitivityRange::new(Parameter::EffectSize, 0.2, 0.8, 6),
            SensitivityRange::new(Parameter::SampleSize, 20.0, 100.0, 4),
            SensitivityRange::new(Parameter::AllocationRatio, 0.5, 2.0, 3).fixed(),
        ];
        let results = one_way(&base(), &ranges).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].parameter, Parameter::EffectSize);
        assert_eq!(results[2].parameter, Parameter::Alpha);
        for pair in results.windows(2) {
            assert!(pair[0].impact >= pair[1].impact);
        }
        for r in &results {
            assert_eq!(r.values.len(), r.outcomes.len());
            let hi = r.outcomes.iter().cloned().fold(f64::MIN, f64::max);
            let lo = r.outcomes.iter().cloned().fold(f64::MAX, f64::min);
            assert_eq!(r.impact, hi - lo);
        }
    }

    #[test]
    fn test_one_way_holds_others_at_base() {
        let results = one_way(
            &base(),
            &[SensitivityRange::new(Parameter::EffectSize, 0.5, 0.5, 1)],
        )
        .unwrap();
        let expected = compute_power(&base()).unwrap().power;
        assert_eq!(results[0].outcomes, vec![expected, expected]);
        assert_eq!(results[0].impact, 0.0);
    }

    #[test]
    fn test_one_way_ties_keep_input_order() {
        let ranges = [
            SensitivityRange::new(Parameter::AllocationRatio, 1.0, 1.0, 2),
            SensitivityRange::new(Parameter::Alpha, 0.05, 0.05, 2),
        ];
        let results = one_way(&base(), &ranges).unwrap();
        assert_eq!(results[0].parameter, Parameter::AllocationRatio);
        assert_eq!(results[1].parameter, Parameter::Alpha);
    }

    #[test]
    fn test_one_way_rounds_sample_size() {
        let results = one_way(
            &base(),
            &[SensitivityRange::new(Parameter::SampleSize, 10.4, 12.4, 2)],
        )
        .unwrap();
        assert_eq!(results[0].values, vec![10.0, 11.0, 12.0]);
    }

    #[test]
    fn test_one_way_rejects_invalid_point() {
        let err = one_way(
            &base(),
            &[SensitivityRange::new(Parameter::Alpha, 0.5, 1.0, 2)],
        )
        .unwrap_err();
        assert_eq!(err.field, Field::Alpha);
    }

    #[test]
    fn test_one_way_empty() {
        assert!(one_way(&base(), &[]).unwrap().is_empty());
    }

    #[test]
    fn test_oversized_grid_rejected_before_allocation() {
        let huge = SensitivityRange::new(Parameter::EffectSize, 0.2, 0.8, usize::MAX);
        assert_eq!(one_way(&base(), &[huge]).unwrap_err().field, Field::Steps);
        let other = SensitivityRange::new(Parameter::Alpha, 0.01, 0.1, 2);
        assert_eq!(
            two_way(&base(), &[other, huge]).unwrap_err().field,
            Field::Steps
        );
    }

    // --- two_way ---

    #[test]
    fn test_two_way_needs_two_ranges() {
        let ranges = [
            SensitivityRange::new(Parameter::Alpha, 0.01, 0.1, 2),
            SensitivityRange::new(Parameter::EffectSize, 0.2, 0.8, 2).fixed(),
        ];
        assert_eq!(two_way(&base(), &ranges).unwrap(), None);
    }

    #[test]
    fn test_two_way_grid() {
        let ranges = [
            SensitivityRange::new(Parameter::EffectSize, 0.2, 0.8, 3),
            SensitivityRange::new(Parameter::SampleSize, 20.0, 100.0, 4),
            SensitivityRange::new(Parameter::Alpha, 0.01, 0.1, 2),
        ];
        let grid = two_way(&base(), &ranges).unwrap().unwrap();
        assert_eq!(grid.row_parameter, Parameter::EffectSize);
        assert_eq!(grid.column_parameter, Parameter::SampleSize);
        assert_eq!(grid.outcomes.len(), 4);
        assert!(grid.outcomes.iter().all(|row| row.len() == 5));
        assert_eq!(grid.column_values, vec![20.0, 40.0, 60.0, 80.0, 100.0]);

        let params = base().with_effect_size(grid.row_values[2]).with_sample_size(60);
        assert_eq!(grid.outcomes[2][2], compute_power(&params).unwrap().power);

        // Power grows along both axes.
        for i in 1..4 {
            for j in 1..5 {
                assert!(grid.outcomes[i][j] >= grid.outcomes[i - 1][j]);
                assert!(grid.outcomes[i][j] >= grid.outcomes[i][j - 1]);
            }
        }
    }

    // --- monte_carlo ---

    #[test]
    fn test_monte_carlo_reproducible() {
        let config = MonteCarloConfig::default().with_iterations(1_500);
        let a = monte_carlo(&base(), &effect_uncertainty(), &config, &mut create_rng(7)).unwrap();
        let b = monte_carlo(&base(), &effect_uncertainty(), &config, &mut create_rng(7)).unwrap();
        assert_eq!(a, b);
        let c = monte_carlo(&base(), &effect_uncertainty(), &config, &mut create_rng(8)).unwrap();
        assert_ne!(a.summary, c.summary);
    }

    #[test]
    fn test_monte_carlo_seeded_uses_config_seed() {
        let config = MonteCarloConfig::default().with_iterations(500).with_seed(99);
        let a = monte_carlo_seeded(&base(), &effect_uncertainty(), &config).unwrap();
        let b = monte_carlo(&base(), &effect_uncertainty(), &config, &mut create_rng(99)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_monte_carlo_without_distributions_is_constant() {
        let config = MonteCarloConfig::default().with_iterations(100);
        let result = monte_carlo(&base(), &BTreeMap::new(), &config, &mut create_rng(1)).unwrap();
        let expected = compute_power(&base()).unwrap().power;
        assert!((result.summary.mean - expected).abs() < 1e-12);
        assert!(result.summary.std_dev < 1e-12);
        assert_eq!(result.summary.min, expected);
        assert_eq!(result.summary.max, expected);
        assert_eq!(result.summary.percentiles.p5, expected);
        assert_eq!(result.summary.percentiles.p95, expected);
        assert_eq!(result.clamped_draws, 0);
        assert_eq!(result.probability_above_threshold, 1.0);
    }

    #[test]
    fn test_monte_carlo_summary_consistent() {
        let config = MonteCarloConfig::default().with_iterations(3_000);
        let r = monte_carlo(&base(), &effect_uncertainty(), &config, &mut create_rng(3)).unwrap();
        let s = r.summary;
        assert!(s.min <= s.percentiles.p5);
        assert!(s.percentiles.p5 <= s.percentiles.p25);
        assert!(s.percentiles.p25 <= s.percentiles.p50);
        assert!(s.percentiles.p50 <= s.percentiles.p75);
        assert!(s.percentiles.p75 <= s.percentiles.p95);
        assert!(s.percentiles.p95 <= s.max);
        assert!(s.std_dev > 0.0);
        assert_eq!(r.histogram.total(), 3_000);
        assert_eq!(r.histogram.out_of_range, 0);
        assert_eq!(r.histogram.counts.len(), 20);
        assert!((0.0..=1.0).contains(&r.probability_above_threshold));
    }

    #[test]
    fn test_monte_carlo_clamps_out_of_domain_draws() {
        let mut dists = BTreeMap::new();
        dists.insert(Parameter::EffectSize, Distribution::normal(0.0, 0.2).unwrap());
        dists.insert(Parameter::Alpha, Distribution::uniform(-0.5, 0.1).unwrap());
        let config = MonteCarloConfig::default().with_iterations(400);
        let r = monte_carlo(&base(), &dists, &config, &mut create_rng(11)).unwrap();
        assert!(r.clamped_draws > 0);
        assert!(r.summary.min >= 0.0 && r.summary.max <= 1.0);
    }

    #[test]
    fn test_monte_carlo_correlation_domain() {
        let base = TestParameters::new(TestDesign::Correlation)
            .with_effect_size(0.3)
            .with_sample_size(85)
            .with_tails(Tails::Two);
        let mut dists = BTreeMap::new();
        dists.insert(Parameter::EffectSize, Distribution::normal(0.3, 0.8).unwrap());
        dists.insert(Parameter::SampleSize, Distribution::normal(10.0, 10.0).unwrap());
        let config = MonteCarloConfig::default().with_iterations(500);
        let r = monte_carlo(&base, &dists, &config, &mut create_rng(5)).unwrap();
        assert!(r.clamped_draws > 0);
    }

    #[test]
    fn test_monte_carlo_beta_alpha() {
        let mut dists = BTreeMap::new();
        dists.insert(Parameter::Alpha, Distribution::beta(2.0, 38.0).unwrap());
        let config = MonteCarloConfig::default().with_iterations(1_000);
        let r = monte_carlo(&base(), &dists, &config, &mut create_rng(21)).unwrap();
        assert_eq!(r.clamped_draws, 0);
        assert!((r.summary.mean - 0.8).abs() < 0.1);
    }

    #[test]
    fn test_monte_carlo_config_validation() {
        let cases = [
            (MonteCarloConfig::default().with_iterations(0), Field::Iterations),
            (
                MonteCarloConfig {
                    chunk_size: 0,
                    ..MonteCarloConfig::default()
                },
                Field::Iterations,
            ),
            (
                MonteCarloConfig {
                    histogram_bins: 0,
                    ..MonteCarloConfig::default()
                },
                Field::HistogramBins,
            ),
            (MonteCarloConfig::default().with_threshold(1.5), Field::Threshold),
            (
                MonteCarloConfig::default().with_iterations(usize::MAX),
                Field::Iterations,
            ),
        ];
        for (config, field) in cases {
            let err = monte_carlo(&base(), &BTreeMap::new(), &config, &mut create_rng(0)).unwrap_err();
            match err {
                SensitivityError::Validation(e) => assert_eq!(e.field, field),
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn test_monte_carlo_invalid_base() {
        let config = MonteCarloConfig::default().with_iterations(10);
        let err = monte_carlo(
            &base().with_alpha(2.0),
            &BTreeMap::new(),
            &config,
            &mut create_rng(0),
        )
        .unwrap_err();
        assert!(matches!(err, SensitivityError::Validation(e) if e.field == Field::Alpha));
    }

    // --- progress and cancellation ---

    #[test]
    fn test_progress_reports_every_chunk() {
        let config = MonteCarloConfig {
            iterations: 2_500,
            ..MonteCarloConfig::default()
        };
        let mut seen = Vec::new();
        let with_progress = monte_carlo_with_progress(
            &base(),
            &effect_uncertainty(),
            &config,
            &mut create_rng(4),
            |p| {
                seen.push(p.completed);
                ControlFlow::Continue(())
            },
        )
        .unwrap();
        assert_eq!(seen, vec![1_000, 2_000, 2_500]);

        let plain = monte_carlo(&base(), &effect_uncertainty(), &config, &mut create_rng(4)).unwrap();
        assert_eq!(with_progress, plain);
    }

    #[test]
    fn test_cancellation() {
        let config = MonteCarloConfig::default();
        let err = monte_carlo_with_progress(
            &base(),
            &effect_uncertainty(),
            &config,
            &mut create_rng(4),
            |_| ControlFlow::Break(()),
        )
        .unwrap_err();
        assert_eq!(err, SensitivityError::Cancelled { completed: 1_000 });
        assert_eq!(
            err.to_string(),
            "monte carlo run cancelled after 1000 iterations"
        );
    }

    #[test]
    fn test_break_after_last_chunk_completes() {
        let config = MonteCarloConfig::default().with_iterations(1_000);
        let result = monte_carlo_with_progress(
            &base(),
            &BTreeMap::new(),
            &config,
            &mut create_rng(4),
            |_| ControlFlow::Break(()),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_config_serde() {
        let config = MonteCarloConfig::default().with_seed(3);
        let json = serde_json::to_string(&config).unwrap();
        let back: MonteCarloConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn range_strategy() -> impl Strategy<Value = SensitivityRange> {
        prop_oneof![
            (0.001_f64..0.1, 0.0_f64..0.1).prop_map(|(lo, w)| (Parameter::Alpha, lo, lo + w)),
            (0.05_f64..1.0, 0.0_f64..1.0).prop_map(|(lo, w)| (Parameter::EffectSize, lo, lo + w)),
            (2.0_f64..100.0, 0.0_f64..200.0).prop_map(|(lo, w)| (Parameter::SampleSize, lo, lo + w)),
            (0.2_f64..2.0, 0.0_f64..2.0).prop_map(|(lo, w)| (Parameter::AllocationRatio, lo, lo + w)),
        ]
        .prop_flat_map(|(parameter, min, max)| {
            (1_usize..12).prop_map(move |steps| SensitivityRange::new(parameter, min, max, steps))
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn one_way_results_sorted_and_bounded(
            ranges in proptest::collection::vec(range_strategy(), 0..5),
        ) {
            let base = TestParameters::new(TestDesign::TwoSampleIndependent);
            let results = one_way(&base, &ranges).unwrap();
            prop_assert_eq!(results.len(), ranges.len());
            for pair in results.windows(2) {
                prop_assert!(pair[0].impact >= pair[1].impact);
            }
            for r in &results {
                prop_assert!(r.impact >= 0.0);
                prop_assert!(r.outcomes.iter().all(|o| (0.0..=1.0).contains(o)));
            }
        }

        #[test]
        fn monte_carlo_same_seed_same_result(seed in any::<u64>()) {
            let base = TestParameters::new(TestDesign::OneSample);
            let mut dists = BTreeMap::new();
            dists.insert(Parameter::EffectSize, Distribution::uniform(0.1, 0.9).unwrap());
            let config = MonteCarloConfig::default().with_iterations(50);
            let a = monte_carlo(&base, &dists, &config, &mut create_rng(seed)).unwrap();
            let b = monte_carlo(&base, &dists, &config, &mut create_rng(seed)).unwrap();
            prop_assert_eq!(a, b);
        }
    }
}
